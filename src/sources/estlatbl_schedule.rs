//! Static-HTML adapter for the Estonian-Latvian league's server-rendered
//! schedule listing. Fixed cell layout: the date cell carries the venue in
//! a trailing span, team cells hold full names.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::info;

use crate::normalize::clean_opt;
use crate::sources::{EventKind, FetchConfig, HttpFetcher, RawEvent, SourceAdapter, Sport};

pub const SOURCE: &str = "estlatbl_schedule";

#[derive(Debug, Clone)]
pub struct EstlatblScheduleConfig {
    pub page_url: String,
    pub league: String,
    pub fetch: FetchConfig,
}

impl Default for EstlatblScheduleConfig {
    fn default() -> Self {
        Self {
            page_url: "https://www.estlatbl.com/et/ajakava".to_string(),
            league: "Optibet Eesti–Läti Korvpalliliiga".to_string(),
            fetch: FetchConfig::default(),
        }
    }
}

pub struct EstlatblScheduleAdapter {
    cfg: EstlatblScheduleConfig,
    fetcher: HttpFetcher,
}

impl EstlatblScheduleAdapter {
    pub fn new(cfg: EstlatblScheduleConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(cfg.fetch.clone())?;
        Ok(Self { cfg, fetcher })
    }
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

pub(crate) fn parse_schedule(html: &str, league: &str) -> Vec<RawEvent> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse("tr.flex").unwrap();
    let date_sel = Selector::parse("td.dateAndTimeTd").unwrap();
    let venue_sel = Selector::parse("td.dateAndTimeTd span").unwrap();
    let home_sel = Selector::parse("td.homeTeam").unwrap();
    let away_sel = Selector::parse("td.awayTeam").unwrap();

    let mut events = Vec::new();
    for row in doc.select(&row_sel) {
        let date_text = match row.select(&date_sel).next().map(cell_text) {
            Some(t) => t,
            None => continue,
        };
        let home = row.select(&home_sel).next().map(cell_text).and_then(|t| clean_opt(&t));
        let away = row.select(&away_sel).next().map(cell_text).and_then(|t| clean_opt(&t));

        // The venue sits in the last span under the date cell.
        let venue = row
            .select(&venue_sel)
            .last()
            .map(cell_text)
            .and_then(|t| clean_opt(&t));

        let mut ev = RawEvent::new(Sport::Basketball, SOURCE, EventKind::Match, date_text.clone());
        ev.league = Some(league.to_string());
        ev.home = home.clone();
        ev.away = away.clone();
        ev.venue = venue.clone();
        ev.payload = json!({
            "dateText": date_text,
            "homeTeam": home,
            "awayTeam": away,
            "venue": venue,
        });
        events.push(ev);
    }
    events
}

#[async_trait]
impl SourceAdapter for EstlatblScheduleAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn sport(&self) -> Sport {
        Sport::Basketball
    }

    async fn collect(&self) -> Result<Vec<RawEvent>> {
        let html = self.fetcher.get_text(&self.cfg.page_url).await?;
        let events = parse_schedule(&html, &self.cfg.league);
        info!(rows = events.len(), "schedule rows parsed");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <table><tbody>
          <tr class="flex">
            <td class="dateAndTimeTd">14.12.2025, 17:00 <span>Riia, Arena Riga</span></td>
            <td class="homeTeam">VEF Riga</td>
            <td class="awayTeam">BC Kalev/Cramo</td>
          </tr>
          <tr class="flex">
            <td class="dateAndTimeTd">15.12.2025</td>
            <td class="homeTeam">Tartu Ülikool</td>
            <td class="awayTeam">Pärnu Sadam</td>
          </tr>
        </tbody></table>
    "#;

    #[test]
    fn parses_rows_with_and_without_venue() {
        let events = parse_schedule(FIXTURE, "Liiga");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].home.as_deref(), Some("VEF Riga"));
        assert_eq!(events[0].away.as_deref(), Some("BC Kalev/Cramo"));
        assert_eq!(events[0].venue.as_deref(), Some("Riia, Arena Riga"));
        assert_eq!(events[1].venue, None);
        assert_eq!(events[1].home.as_deref(), Some("Tartu Ülikool"));
    }

    #[test]
    fn empty_document_yields_no_rows() {
        assert!(parse_schedule("<html><body></body></html>", "Liiga").is_empty());
    }
}
