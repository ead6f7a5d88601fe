//! Calendar-sweep adapter for the football association's day calendar.
//! One GET per calendar day over an operator-given range, with a polite
//! pause between days; a failed day is logged and skipped, never fatal for
//! the sweep.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::identity::football_external_id;
use crate::normalize::{clean_opt, normalize_whitespace, parse_clock};
use crate::sources::{EventKind, FetchConfig, HttpFetcher, RawEvent, SourceAdapter, Sport};

pub const SOURCE: &str = "jalgpallee";
const FEDERATION_NAME: &str = "Eesti Jalgpalli Liit";

#[derive(Debug, Clone)]
pub struct FootballConfig {
    pub base_url: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub fetch: FetchConfig,
}

impl FootballConfig {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            base_url: "https://jalgpall.ee".to_string(),
            from,
            to,
            fetch: FetchConfig {
                accept: Some("text/html,application/xhtml+xml".to_string()),
                ..FetchConfig::default()
            },
        }
    }
}

pub struct FootballAdapter {
    cfg: FootballConfig,
    fetcher: HttpFetcher,
}

impl FootballAdapter {
    pub fn new(cfg: FootballConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(cfg.fetch.clone())?;
        Ok(Self { cfg, fetcher })
    }

    fn day_url(&self, date_text: &str) -> String {
        format!(
            "{}/voistlused/calendar?date={}",
            self.cfg.base_url,
            urlencoding::encode(date_text)
        )
    }
}

fn abs_url(base: &Url, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(|n| normalize_whitespace(&n.text().collect::<Vec<_>>().join(" ")))
        .and_then(|t| if t.is_empty() { None } else { Some(t) })
}

/// Parse one day's calendar page. `date_text` is the queried day in
/// `DD.MM.YYYY` form and becomes every event's date.
pub(crate) fn parse_calendar(html: &str, base_url: &str, date_text: &str) -> Vec<RawEvent> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let block_sel = Selector::parse(".calendar-events .block.block-01").unwrap();
    let head_link_sel = Selector::parse(".head p a").unwrap();
    let round_sel = Selector::parse(".head .tag").unwrap();
    let event_sel = Selector::parse(".events-list .event-single").unwrap();
    let info_title_sel = Selector::parse(".info p.title").unwrap();
    let link_sel = Selector::parse("a").unwrap();
    let team_sel = Selector::parse(".teams .team").unwrap();
    let team_link_sel = Selector::parse("p a").unwrap();
    let team_p_sel = Selector::parse("p").unwrap();
    let match_link_sel = Selector::parse(".actions a.info").unwrap();
    let ticket_link_sel = Selector::parse(".actions a.ticket").unwrap();

    let mut events = Vec::new();
    for block in doc.select(&block_sel) {
        let league = first_text(block, &head_link_sel);
        let league_url = block
            .select(&head_link_sel)
            .next()
            .and_then(|a| abs_url(&base, a.value().attr("href")));
        let round = first_text(block, &round_sel);

        for event in block.select(&event_sel) {
            let titles: Vec<ElementRef<'_>> = event.select(&info_title_sel).collect();
            let first = titles.first().copied();
            let second = titles.get(1).copied();

            let first_text_val = first
                .map(|t| normalize_whitespace(&t.text().collect::<Vec<_>>().join(" ")))
                .unwrap_or_default();

            // The first info title is either the kickoff time or, for
            // fixtures without a published time, already the venue.
            let (time, venue_el) = match parse_clock(&first_text_val) {
                Some(t) => (Some(t), second),
                None => (None, first),
            };
            let mut venue = venue_el.and_then(|el| {
                el.select(&link_sel)
                    .next()
                    .map(|a| normalize_whitespace(&a.text().collect::<Vec<_>>().join(" ")))
                    .and_then(|t| if t.is_empty() { None } else { Some(t) })
                    .or_else(|| {
                        clean_opt(&el.text().collect::<Vec<_>>().join(" "))
                    })
            });
            let venue_url = venue_el.and_then(|el| {
                el.select(&link_sel)
                    .next()
                    .and_then(|a| abs_url(&base, a.value().attr("href")))
            });
            if venue.is_none() {
                venue = event.value().attr("data-field").and_then(|v| clean_opt(v));
            }

            let teams: Vec<ElementRef<'_>> = event.select(&team_sel).collect();
            let team_name = |team: Option<&ElementRef<'_>>| -> Option<String> {
                let team = team?;
                first_text(*team, &team_link_sel).or_else(|| first_text(*team, &team_p_sel))
            };
            let home = team_name(teams.first());
            let away = team_name(teams.get(1));
            if home.is_none() && away.is_none() {
                continue;
            }

            let match_url = event
                .select(&match_link_sel)
                .next()
                .and_then(|a| abs_url(&base, a.value().attr("href")));
            let ticket_url = event
                .select(&ticket_link_sel)
                .next()
                .and_then(|a| abs_url(&base, a.value().attr("href")));

            let time_text = time.map(|t| t.format("%H:%M").to_string());
            let external_id = football_external_id(
                match_url.as_deref(),
                date_text,
                time_text.as_deref(),
                league.as_deref(),
                home.as_deref(),
                away.as_deref(),
            );

            let mut ev = RawEvent::new(
                Sport::Football,
                SOURCE,
                EventKind::Match,
                date_text.to_string(),
            );
            ev.external_id = Some(external_id);
            ev.time_text = time_text.clone();
            ev.league = league.clone();
            ev.round = round.clone();
            ev.home = home.clone();
            ev.away = away.clone();
            ev.venue = venue.clone();
            ev.federation_name = Some(FEDERATION_NAME.to_string());
            ev.federation_link = league_url.clone().or_else(|| match_url.clone());
            ev.ticket_url = ticket_url.clone();
            ev.match_url = match_url.clone();
            ev.payload = json!({
                "date": date_text,
                "time": time_text,
                "league": league,
                "round": round,
                "homeTeam": home,
                "awayTeam": away,
                "venue": venue,
                "venueUrl": venue_url,
                "leagueUrl": league_url,
                "matchUrl": match_url,
                "ticketUrl": ticket_url,
            });
            events.push(ev);
        }
    }
    events
}

#[async_trait]
impl SourceAdapter for FootballAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn sport(&self) -> Sport {
        Sport::Football
    }

    async fn collect(&self) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();
        let mut day = self.cfg.from;
        let mut days = 0u32;

        while day <= self.cfg.to {
            let date_text = day.format("%d.%m.%Y").to_string();
            let url = self.day_url(&date_text);
            days += 1;

            match self.fetcher.get_text(&url).await {
                Ok(html) => {
                    let day_events = parse_calendar(&html, &self.cfg.base_url, &date_text);
                    info!(day = %date_text, events = day_events.len(), "calendar day scraped");
                    events.extend(day_events);
                }
                // one bad day must not sink the sweep
                Err(e) => warn!(day = %date_text, error = %e, "calendar day failed"),
            }

            day = day
                .checked_add_days(Days::new(1))
                .context("date range overflow")?;
            if day <= self.cfg.to {
                self.fetcher.pause().await;
            }
        }

        info!(days, total = events.len(), "calendar sweep finished");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
      <div class="calendar-events">
        <div class="block block-01">
          <div class="head"><p><a href="/voistlused/premium-liiga">Premium liiga</a></p><span class="tag">5. voor</span></div>
          <div class="events-list">
            <div class="event-single">
              <div class="info">
                <p class="title">15:00</p>
                <p class="title"><a href="/stadiums/lillekyla">Lilleküla staadion</a></p>
              </div>
              <div class="teams">
                <div class="team"><p><a href="/clubs/flora">FC Flora</a></p></div>
                <div class="team"><p><a href="/clubs/levadia">FCI Levadia</a></p></div>
              </div>
              <div class="actions">
                <a class="info" href="/voistlused/match_info/12345">Info</a>
                <a class="ticket" href="https://piletilevi.ee/x">Piletid</a>
              </div>
            </div>
            <div class="event-single" data-field="Sportland Arena">
              <div class="info">
                <p class="title">Sportland Arena</p>
              </div>
              <div class="teams">
                <div class="team"><p>Nõmme United</p></div>
                <div class="team"><p>Paide Linnameeskond</p></div>
              </div>
            </div>
          </div>
        </div>
      </div>
    "#;

    #[test]
    fn parses_timed_event_with_links() {
        let events = parse_calendar(FIXTURE, "https://jalgpall.ee", "25.01.2026");
        assert_eq!(events.len(), 2);
        let ev = &events[0];
        assert_eq!(ev.time_text.as_deref(), Some("15:00"));
        assert_eq!(ev.league.as_deref(), Some("Premium liiga"));
        assert_eq!(ev.round.as_deref(), Some("5. voor"));
        assert_eq!(ev.home.as_deref(), Some("FC Flora"));
        assert_eq!(ev.away.as_deref(), Some("FCI Levadia"));
        assert_eq!(ev.venue.as_deref(), Some("Lilleküla staadion"));
        assert_eq!(ev.external_id.as_deref(), Some("jalgpall:match_info:12345"));
        assert_eq!(
            ev.match_url.as_deref(),
            Some("https://jalgpall.ee/voistlused/match_info/12345")
        );
        assert_eq!(ev.ticket_url.as_deref(), Some("https://piletilevi.ee/x"));
        assert_eq!(
            ev.federation_link.as_deref(),
            Some("https://jalgpall.ee/voistlused/premium-liiga")
        );
    }

    #[test]
    fn untimed_event_reads_venue_from_first_title() {
        let events = parse_calendar(FIXTURE, "https://jalgpall.ee", "25.01.2026");
        let ev = &events[1];
        assert_eq!(ev.time_text, None);
        assert_eq!(ev.venue.as_deref(), Some("Sportland Arena"));
        assert_eq!(ev.home.as_deref(), Some("Nõmme United"));
        assert!(ev
            .external_id
            .as_deref()
            .unwrap()
            .starts_with("jalgpall:fallback:25.01.2026"));
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_calendar("<html></html>", "https://jalgpall.ee", "01.01.2026").is_empty());
    }
}
