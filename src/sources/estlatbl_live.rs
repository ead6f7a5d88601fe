//! Scripted-browser adapter for the Estonian-Latvian basketball league's
//! schedule page. The table is rendered client-side, so a plain GET sees
//! nothing; we drive a real browser over WebDriver and read the populated
//! rows.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::sources::fetch::BROWSER_USER_AGENT;
use crate::sources::{EventKind, RawEvent, SourceAdapter, Sport};

pub const SOURCE: &str = "estlatbl_live";

const ROW_SELECTOR: &str = "table.standings.scheduleAndResults tbody tr";
const MIN_COLUMNS: usize = 6;

#[derive(Debug, Clone)]
pub struct EstlatblLiveConfig {
    /// WebDriver endpoint (chromedriver/geckodriver).
    pub webdriver_url: String,
    pub page_url: String,
    /// Bound on the wait for the schedule table to populate.
    pub wait_timeout: Duration,
    pub league: String,
}

impl Default for EstlatblLiveConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            page_url: "https://www.estlatbl.com/et/mangud".to_string(),
            wait_timeout: Duration::from_secs(60),
            league: "Optibet Eesti–Läti Korvpalliliiga".to_string(),
        }
    }
}

pub struct EstlatblLiveAdapter {
    cfg: EstlatblLiveConfig,
}

impl EstlatblLiveAdapter {
    pub fn new(cfg: EstlatblLiveConfig) -> Self {
        Self { cfg }
    }

    async fn scrape(&self, client: &Client) -> Result<Vec<RawEvent>> {
        client
            .goto(&self.cfg.page_url)
            .await
            .context("navigating to schedule page")?;

        client
            .wait()
            .at_most(self.cfg.wait_timeout)
            .for_element(Locator::Css(ROW_SELECTOR))
            .await
            .context("schedule table never populated")?;

        let rows = client.find_all(Locator::Css(ROW_SELECTOR)).await?;
        info!(rows = rows.len(), "schedule rows found");

        let mut events = Vec::new();
        for row in rows {
            let text = row.text().await?;
            let cols: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
            match parse_row(&cols, &self.cfg.league) {
                Some(ev) => events.push(ev),
                None => warn!(raw = ?cols, "skipping malformed schedule row"),
            }
        }
        Ok(events)
    }
}

/// One row's innerText split on line breaks. Layout:
/// date/time, venue, home score, home code, separator, away code[, ...].
/// Fewer than six columns means a spacer or header row.
pub(crate) fn parse_row(cols: &[String], league: &str) -> Option<RawEvent> {
    if cols.len() < MIN_COLUMNS {
        return None;
    }

    let date_text = cols[0].clone();
    let venue = cols[1].trim().to_string();
    let home_code = cols[3].trim().to_string();
    let away_code = cols[5].trim().to_string();
    if home_code.is_empty() || away_code.is_empty() {
        return None;
    }

    let mut ev = RawEvent::new(Sport::Basketball, SOURCE, EventKind::Match, date_text);
    ev.league = Some(league.to_string());
    ev.home_code = Some(home_code);
    ev.away_code = Some(away_code);
    ev.venue = if venue.is_empty() { None } else { Some(venue) };
    ev.payload = json!({ "columns": cols });
    Some(ev)
}

#[async_trait]
impl SourceAdapter for EstlatblLiveAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn sport(&self) -> Sport {
        Sport::Basketball
    }

    fn writes_canonical(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<Vec<RawEvent>> {
        let mut caps = serde_json::map::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-blink-features=AutomationControlled",
                    format!("--user-agent={BROWSER_USER_AGENT}"),
                ]
            }),
        );
        // bound navigation too, not just the selector wait
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": self.cfg.wait_timeout.as_millis() as u64 }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(&self.cfg.webdriver_url)
            .await
            .with_context(|| format!("connecting to webdriver at {}", self.cfg.webdriver_url))?;

        let result = self.scrape(&client).await;

        // Session teardown regardless of scrape outcome.
        if let Err(e) = client.close().await {
            warn!(error = %e, "failed to close webdriver session");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_full_row() {
        let ev = parse_row(
            &cols(&[
                "T 09.12.2025, 20:00",
                "Tallinn, TalTech Spordihoone",
                "",
                "TCH",
                "-",
                "OGR",
            ]),
            "Optibet Eesti–Läti Korvpalliliiga",
        )
        .unwrap();
        assert_eq!(ev.date_text, "T 09.12.2025, 20:00");
        assert_eq!(ev.venue.as_deref(), Some("Tallinn, TalTech Spordihoone"));
        assert_eq!(ev.home_code.as_deref(), Some("TCH"));
        assert_eq!(ev.away_code.as_deref(), Some("OGR"));
        assert_eq!(ev.kind, EventKind::Match);
    }

    #[test]
    fn rejects_short_rows() {
        assert!(parse_row(&cols(&["09.12.2025", "Tallinn"]), "Liiga").is_none());
    }

    #[test]
    fn rejects_rows_without_codes() {
        assert!(parse_row(&cols(&["09.12.2025", "Tallinn", "", "", "-", "OGR"]), "Liiga").is_none());
    }
}
