//! Paged-table adapter for the national basketball federation's combined
//! schedule. One page holds several tables, one per competition; the
//! competition name is not inside the table, so it has to be inferred from
//! nearby headings. The first page's raw HTML is kept on disk for offline
//! debugging of markup changes.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::normalize::{clean_opt, normalize_whitespace};
use crate::sources::{EventKind, FetchConfig, HttpFetcher, RawEvent, SourceAdapter, Sport};

pub const SOURCE: &str = "basketee";
const FEDERATION_NAME: &str = "Eesti Korvpalliliit";

#[derive(Debug, Clone)]
pub struct BasketEeConfig {
    pub schedule_url: String,
    /// Where to keep the page-0 HTML snapshot; None disables it.
    pub snapshot_path: Option<PathBuf>,
    /// Keep only competitions matching one of these fragments
    /// (case-insensitive substring); empty keeps everything.
    pub league_allowlist: Vec<String>,
    /// `fetch.max_pages` is the inclusive upper page index; page 0 is the
    /// bare URL.
    pub fetch: FetchConfig,
}

impl Default for BasketEeConfig {
    fn default() -> Self {
        Self {
            schedule_url: "https://www.basket.ee/et/ajakava-ja-tulemused?action=schedule"
                .to_string(),
            snapshot_path: Some(PathBuf::from("basketee_schedule_snapshot.html")),
            league_allowlist: Vec::new(),
            fetch: FetchConfig {
                accept_language: Some("et-EE,et;q=0.9,en;q=0.8".to_string()),
                max_pages: 6,
                ..FetchConfig::default()
            },
        }
    }
}

/// Locates the competition a schedule table belongs to. Isolated behind a
/// trait so a source that publishes structured competition data can bypass
/// the DOM heuristics entirely.
pub trait CompetitionLocator: Send + Sync {
    fn competition_for_table(&self, table: ElementRef<'_>) -> Option<String>;
}

/// Best-effort heuristic: walk up from the table toward heading-ish
/// ancestors, rejecting boilerplate page titles and inline script
/// fragments, and accept only text that reads like a competition name.
pub struct HeadingAncestorLocator;

fn looks_like_league(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(liiga|meistriliiga|karikavõistl|koondis|eesti|läti|optibet|naiste|meeste)")
            .unwrap()
    });
    re.is_match(text)
}

fn is_boilerplate(text: &str) -> bool {
    let s = normalize_whitespace(text);
    if s.is_empty() {
        return true;
    }
    let chars = s.chars().count();
    if chars < 4 || chars > 140 {
        return true;
    }
    // the page's own "Ajakava ja tulemused" heading and script payloads
    if s.to_lowercase().contains("ajakava") {
        return true;
    }
    if s.contains("var ") || s.contains('{') || s.contains(';') {
        return true;
    }
    false
}

fn heading_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h1,h2,h3,h4,strong").unwrap())
}

fn titleish_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse("[class*='title'],[class*='header'],[class*='league'],[class*='competition']")
            .unwrap()
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

impl CompetitionLocator for HeadingAncestorLocator {
    fn competition_for_table(&self, table: ElementRef<'_>) -> Option<String> {
        // 1) parent containers often include the competition title
        for ancestor in table.ancestors().filter_map(ElementRef::wrap).take(10) {
            if let Some(h) = ancestor.select(heading_sel()).next() {
                let text = element_text(h);
                if !is_boilerplate(&text) && looks_like_league(&text) {
                    return Some(text);
                }
            }
            if let Some(t) = ancestor.select(titleish_sel()).next() {
                let text = element_text(t);
                if !is_boilerplate(&text) && looks_like_league(&text) {
                    return Some(text);
                }
            }
        }

        // 2) fallback: nearest previous heading siblings
        for sibling in table.prev_siblings().filter_map(ElementRef::wrap) {
            let name = sibling.value().name();
            if matches!(name, "h1" | "h2" | "h3" | "h4" | "strong") {
                let text = element_text(sibling);
                if !is_boilerplate(&text) && looks_like_league(&text) {
                    return Some(text);
                }
            }
        }

        None
    }
}

fn allowed_league(league: Option<&str>, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let l = league.unwrap_or("").to_lowercase();
    allowlist.iter().any(|frag| l.contains(&frag.to_lowercase()))
}

fn redirect_game_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"doRedirectGame\('([^']+)'\)").unwrap())
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

pub(crate) fn parse_page(
    html: &str,
    locator: &dyn CompetitionLocator,
    schedule_url: &str,
    allowlist: &[String],
) -> Vec<RawEvent> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tbody tr").unwrap();
    let gid_sel = Selector::parse("td.gameID").unwrap();
    let date_sel = Selector::parse("td.dateAndTimeTd .dateAndTime").unwrap();
    let arena_sel = Selector::parse("td.dateAndTimeTd .arena").unwrap();
    let home_name_sel = Selector::parse("td.homeTeam .homeTeamNameDesktop").unwrap();
    let home_code_sel = Selector::parse("td.homeTeam .homeTeamNameMobile").unwrap();
    let away_name_sel = Selector::parse("td.awayTeam .visitorTeamNameDesktop").unwrap();
    let away_code_sel = Selector::parse("td.awayTeam .visitorTeamNameMobile").unwrap();
    let competition_sel = Selector::parse("td.competition").unwrap();
    let broadcast_sel = Selector::parse("td.broadcast img").unwrap();

    let mut events = Vec::new();
    for table in doc.select(&table_sel) {
        let table_league = locator.competition_for_table(table);

        for row in table.select(&row_sel) {
            let gid_cell = row.select(&gid_sel).next();
            let game_id = gid_cell
                .and_then(|c| c.value().attr("title"))
                .and_then(clean_opt)
                .or_else(|| {
                    gid_cell
                        .map(element_text)
                        .as_deref()
                        .and_then(|t| digits_re().find(t))
                        .map(|m| m.as_str().to_string())
                });

            let date_text = row.select(&date_sel).next().map(element_text);
            let venue = row.select(&arena_sel).next().map(element_text).and_then(none_if_empty);

            let home = row.select(&home_name_sel).next().map(element_text).and_then(none_if_empty);
            let home_code = row.select(&home_code_sel).next().map(element_text).and_then(none_if_empty);
            let away = row.select(&away_name_sel).next().map(element_text).and_then(none_if_empty);
            let away_code = row.select(&away_code_sel).next().map(element_text).and_then(none_if_empty);

            let league = row
                .select(&competition_sel)
                .next()
                .map(element_text)
                .and_then(none_if_empty)
                .or_else(|| table_league.clone());

            let broadcast = row
                .select(&broadcast_sel)
                .next()
                .and_then(|img| img.value().attr("title"))
                .and_then(clean_opt);

            let game_link = gid_cell
                .and_then(|c| c.value().attr("onclick"))
                .and_then(|onclick| {
                    redirect_game_re()
                        .captures(onclick)
                        .map(|caps| caps[1].to_string())
                })
                .unwrap_or_else(|| schedule_url.to_string());

            if !allowed_league(league.as_deref(), allowlist) {
                continue;
            }

            let Some(date_text) = date_text else { continue };
            if home.is_none() || away.is_none() {
                warn!(?home, ?away, %date_text, "skipping row with missing team");
                continue;
            }

            let mut ev = RawEvent::new(Sport::Basketball, SOURCE, EventKind::Match, date_text.clone());
            ev.source_game_id = game_id.clone();
            ev.league = league.clone();
            ev.home = home.clone();
            ev.home_code = home_code.clone();
            ev.away = away.clone();
            ev.away_code = away_code.clone();
            ev.venue = venue.clone();
            ev.federation_name = Some(FEDERATION_NAME.to_string());
            ev.federation_link = Some(game_link.clone());
            ev.broadcast = broadcast.clone();
            ev.payload = json!({
                "gameId": game_id,
                "dateText": date_text,
                "venue": venue,
                "home": home,
                "homeCode": home_code,
                "away": away,
                "awayCode": away_code,
                "league": league,
                "broadcast": broadcast,
                "gameLink": game_link,
            });
            events.push(ev);
        }
    }
    events
}

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub struct BasketEeAdapter {
    cfg: BasketEeConfig,
    fetcher: HttpFetcher,
    locator: Box<dyn CompetitionLocator>,
}

impl BasketEeAdapter {
    pub fn new(cfg: BasketEeConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(cfg.fetch.clone())?;
        Ok(Self {
            cfg,
            fetcher,
            locator: Box::new(HeadingAncestorLocator),
        })
    }

    pub fn with_locator(mut self, locator: Box<dyn CompetitionLocator>) -> Self {
        self.locator = locator;
        self
    }

    fn page_url(&self, page: u32) -> String {
        if page == 0 {
            self.cfg.schedule_url.clone()
        } else {
            format!("{}&page={}", self.cfg.schedule_url, page)
        }
    }
}

#[async_trait]
impl SourceAdapter for BasketEeAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn sport(&self) -> Sport {
        Sport::Basketball
    }

    async fn collect(&self) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();
        for page in 0..=self.fetcher.config().max_pages {
            let url = self.page_url(page);
            let Some(html) = self.fetcher.get_page(&url).await? else {
                continue;
            };

            if page == 0 {
                if let Some(path) = &self.cfg.snapshot_path {
                    match std::fs::write(path, &html) {
                        Ok(()) => info!(path = %path.display(), "saved schedule snapshot"),
                        Err(e) => warn!(path = %path.display(), error = %e, "snapshot write failed"),
                    }
                }
            }

            let page_events = parse_page(
                &html,
                self.locator.as_ref(),
                &self.cfg.schedule_url,
                &self.cfg.league_allowlist,
            );
            info!(page, rows = page_events.len(), "schedule page parsed");
            events.extend(page_events);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
      <html><head><title>Ajakava ja tulemused</title></head><body>
        <div class="content">
          <div class="competition-block">
            <h3>Meeste Meistriliiga</h3>
            <table>
              <tbody>
                <tr>
                  <td class="gameID" title="10421" onclick="doRedirectGame('https://www.basket.ee/game/10421')">10421</td>
                  <td class="dateAndTimeTd">
                    <span class="dateAndTime">18.10.2025, 19:00</span>
                    <span class="arena">Sõbra Hall</span>
                  </td>
                  <td class="homeTeam">
                    <span class="homeTeamNameDesktop">Tartu Ülikool Maks &amp; Moorits</span>
                    <span class="homeTeamNameMobile">TYM</span>
                  </td>
                  <td class="awayTeam">
                    <span class="visitorTeamNameDesktop">BC Kalev/Cramo</span>
                    <span class="visitorTeamNameMobile">KAL</span>
                  </td>
                  <td class="competition"></td>
                  <td class="broadcast"><img title="Delfi TV"/></td>
                </tr>
                <tr>
                  <td class="gameID">no digits</td>
                  <td class="dateAndTimeTd"><span class="dateAndTime">19.10.2025</span></td>
                  <td class="homeTeam"><span class="homeTeamNameDesktop">Pärnu Sadam</span></td>
                  <td class="awayTeam"></td>
                </tr>
              </tbody>
            </table>
          </div>
        </div>
      </body></html>
    "#;

    #[test]
    fn parses_row_and_infers_league_from_heading() {
        let events = parse_page(FIXTURE, &HeadingAncestorLocator, "https://base", &[]);
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.source_game_id.as_deref(), Some("10421"));
        assert_eq!(ev.league.as_deref(), Some("Meeste Meistriliiga"));
        assert_eq!(ev.home.as_deref(), Some("Tartu Ülikool Maks & Moorits"));
        assert_eq!(ev.home_code.as_deref(), Some("TYM"));
        assert_eq!(ev.away_code.as_deref(), Some("KAL"));
        assert_eq!(ev.venue.as_deref(), Some("Sõbra Hall"));
        assert_eq!(ev.broadcast.as_deref(), Some("Delfi TV"));
        assert_eq!(
            ev.federation_link.as_deref(),
            Some("https://www.basket.ee/game/10421")
        );
    }

    #[test]
    fn allowlist_filters_leagues() {
        let events = parse_page(
            FIXTURE,
            &HeadingAncestorLocator,
            "https://base",
            &["naiste".to_string()],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn heuristic_rejects_boilerplate() {
        assert!(is_boilerplate("Ajakava ja tulemused"));
        assert!(is_boilerplate("var x = 1;"));
        assert!(is_boilerplate("abc"));
        assert!(is_boilerplate(&"x".repeat(141)));
        assert!(!is_boilerplate("Meeste Meistriliiga"));
    }

    #[test]
    fn league_pattern_matching() {
        assert!(looks_like_league("Naiste Korvpalli Meistriliiga"));
        assert!(looks_like_league("Optibet Eesti–Läti Korvpalliliiga"));
        assert!(!looks_like_league("Random page section"));
    }
}
