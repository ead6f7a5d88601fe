//! Static-HTML adapter for the skating union's season calendar. One table,
//! multi-day competitions with hyphenated date ranges instead of fixtures.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::identity::competition_external_id;
use crate::normalize::normalize_whitespace;
use crate::sources::{EventKind, FetchConfig, HttpFetcher, RawEvent, SourceAdapter, Sport};

pub const SOURCE: &str = "uisuliit_eul_skating";
const FEDERATION_NAME: &str = "EUL";
const FEDERATION_LINK: &str = "https://www.uisuliit.ee/";

#[derive(Debug, Clone)]
pub struct SkatingConfig {
    pub page_url: String,
    pub league: String,
    pub fetch: FetchConfig,
}

impl Default for SkatingConfig {
    fn default() -> Self {
        Self {
            page_url:
                "https://www.uisuliit.ee/iluuisutamine/voistlused/eul-kalenderplaan-2025-2026"
                    .to_string(),
            league: "EUL kalenderplaan".to_string(),
            fetch: FetchConfig {
                accept: Some("text/html,application/xhtml+xml".to_string()),
                ..FetchConfig::default()
            },
        }
    }
}

pub struct SkatingAdapter {
    cfg: SkatingConfig,
    fetcher: HttpFetcher,
}

impl SkatingAdapter {
    pub fn new(cfg: SkatingConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(cfg.fetch.clone())?;
        Ok(Self { cfg, fetcher })
    }
}

fn cell_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn opt_text(el: Option<&ElementRef<'_>>) -> Option<String> {
    let t = cell_text(*el?);
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

pub(crate) fn parse_calendar_table(html: &str, page_url: &str, league: &str) -> Vec<RawEvent> {
    let doc = Html::parse_document(html);
    let preferred_sel = Selector::parse(".table-holder table").unwrap();
    let any_table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let link_sel = Selector::parse("a").unwrap();

    let Some(table) = doc
        .select(&preferred_sel)
        .next()
        .or_else(|| doc.select(&any_table_sel).next())
    else {
        warn!("no calendar table in document");
        return Vec::new();
    };

    let base = Url::parse(page_url).ok();
    let mut events = Vec::new();

    for row in table.select(&row_sel) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        if cells.len() < 3 {
            continue;
        }

        let date_text = cell_text(cells[0]);
        // header rows carry labels, never digits
        if !date_text.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }

        let title_cell = cells[1];
        let title_link = title_cell.select(&link_sel).next();
        let title = title_link
            .map(cell_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| cell_text(title_cell));
        if title.is_empty() {
            warn!(%date_text, "skipping row without a title");
            continue;
        }

        let detail_link = title_link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| match &base {
                Some(b) => b.join(href).ok().map(|u| u.to_string()),
                None => None,
            });

        let venue = opt_text(cells.get(2));
        let organizer = opt_text(cells.get(3));
        let subtitle = opt_text(cells.get(4));

        let external_id = competition_external_id(
            SOURCE,
            detail_link.as_deref(),
            &date_text,
            &title,
            venue.as_deref(),
            organizer.as_deref(),
            subtitle.as_deref(),
        );

        let mut ev = RawEvent::new(Sport::Skating, SOURCE, EventKind::Competition, date_text.clone());
        ev.external_id = Some(external_id);
        ev.league = Some(league.to_string());
        ev.title = Some(title.clone());
        ev.subtitle = subtitle.clone();
        ev.venue = venue.clone();
        ev.organizer = organizer.clone();
        ev.federation_name = Some(FEDERATION_NAME.to_string());
        ev.federation_link = Some(FEDERATION_LINK.to_string());
        ev.payload = json!({
            "dateText": date_text,
            "title": title,
            "detailLink": detail_link,
            "rawVenue": venue,
            "organizer": organizer,
            "subtitle": subtitle,
        });
        events.push(ev);
    }
    events
}

#[async_trait]
impl SourceAdapter for SkatingAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn sport(&self) -> Sport {
        Sport::Skating
    }

    async fn collect(&self) -> Result<Vec<RawEvent>> {
        let html = self.fetcher.get_text(&self.cfg.page_url).await?;
        let events = parse_calendar_table(&html, &self.cfg.page_url, &self.cfg.league);
        info!(rows = events.len(), "calendar rows parsed");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
      <div class="table-holder">
        <table>
          <tr><td>Kuupäev</td><td>Võistlus</td><td>Toimumiskoht</td></tr>
          <tr>
            <td>14.12.2025</td>
            <td><a href="/voistlus/joulusoit">Jõulusõit 2025</a></td>
            <td>Tondiraba Jäähall</td>
            <td>MTÜ Uisuklubi</td>
            <td>Üksiksõit</td>
          </tr>
          <tr>
            <td>31.01.-01.02.2026</td>
            <td>Eesti Meistrivõistlused</td>
            <td>Tartu</td>
          </tr>
          <tr><td colspan="3">&nbsp;</td></tr>
        </table>
      </div>
    "#;

    #[test]
    fn parses_rows_and_skips_header() {
        let events = parse_calendar_table(FIXTURE, "https://www.uisuliit.ee/kava", "EUL kalenderplaan");
        assert_eq!(events.len(), 2);

        let ev = &events[0];
        assert_eq!(ev.title.as_deref(), Some("Jõulusõit 2025"));
        assert_eq!(ev.venue.as_deref(), Some("Tondiraba Jäähall"));
        assert_eq!(ev.organizer.as_deref(), Some("MTÜ Uisuklubi"));
        assert_eq!(ev.subtitle.as_deref(), Some("Üksiksõit"));
        assert_eq!(ev.kind, EventKind::Competition);
        // link-based identity
        assert_eq!(
            ev.external_id,
            Some(competition_external_id(
                SOURCE,
                Some("https://www.uisuliit.ee/voistlus/joulusoit"),
                "14.12.2025",
                "Jõulusõit 2025",
                Some("Tondiraba Jäähall"),
                Some("MTÜ Uisuklubi"),
                Some("Üksiksõit"),
            ))
        );
    }

    #[test]
    fn range_rows_keep_raw_range_text() {
        let events = parse_calendar_table(FIXTURE, "https://www.uisuliit.ee/kava", "EUL");
        assert_eq!(events[1].date_text, "31.01.-01.02.2026");
        assert_eq!(events[1].title.as_deref(), Some("Eesti Meistrivõistlused"));
    }

    #[test]
    fn document_without_table_is_empty() {
        assert!(parse_calendar_table("<p>hooldus</p>", "https://x", "EUL").is_empty());
    }
}
