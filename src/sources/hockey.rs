//! JSON-API adapter for the hockey federation's schedule service. One
//! authenticated GET per division; the API key travels as a query
//! parameter. Full row objects are retained as payload for replay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::normalize::clean_opt;
use crate::sources::{EventKind, FetchConfig, HttpFetcher, RawEvent, SourceAdapter, Sport};

pub const SOURCE: &str = "ehs_hockey";
const FEDERATION_NAME: &str = "Eesti Hoki";
const FEDERATION_LINK: &str = "https://ehs.eestihoki.ee/";

#[derive(Debug, Clone)]
pub struct HockeyDivision {
    pub id: i64,
    pub league: String,
}

#[derive(Debug, Clone)]
pub struct HockeyConfig {
    pub base_url: String,
    pub api_key: String,
    pub referer: String,
    pub divisions: Vec<HockeyDivision>,
    pub fetch: FetchConfig,
}

impl HockeyConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: "https://api.hockeydata.net/data/ebel/Schedule".to_string(),
            api_key,
            referer: FEDERATION_LINK.to_string(),
            divisions: vec![
                HockeyDivision {
                    id: 18975,
                    league: "UNIBET HOKILIIGA".to_string(),
                },
                HockeyDivision {
                    id: 18979,
                    league: "NAISTE LIIGA".to_string(),
                },
            ],
            fetch: FetchConfig {
                accept: Some("application/json,text/plain,*/*".to_string()),
                referer: Some(FEDERATION_LINK.to_string()),
                ..FetchConfig::default()
            },
        }
    }
}

pub struct HockeyAdapter {
    cfg: HockeyConfig,
    fetcher: HttpFetcher,
}

impl HockeyAdapter {
    pub fn new(cfg: HockeyConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(cfg.fetch.clone())?;
        Ok(Self { cfg, fetcher })
    }

    fn division_url(&self, division_id: i64) -> String {
        format!(
            "{}?apiKey={}&lang=en&referer=ehs.eestihoki.ee&divisionId={}",
            self.cfg.base_url,
            urlencoding::encode(&self.cfg.api_key),
            division_id
        )
    }
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|x| x.as_str())
}

/// One schedule row from the API. Rows missing the game id, date, or
/// either team are unusable and skipped.
pub(crate) fn parse_game(game: &Value, league: &str) -> Option<RawEvent> {
    let id = match game.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return None,
    };
    let date_text = game
        .get("scheduledDate")
        .and_then(|d| d.get("value"))
        .and_then(|v| v.as_str())?
        .to_string();
    let home = clean_opt(str_field(game, "homeTeamLongName")?)?;
    let away = clean_opt(str_field(game, "awayTeamLongName")?)?;
    let time = str_field(game, "scheduledTime").and_then(clean_opt);
    let venue = game
        .get("location")
        .and_then(|l| l.get("longname"))
        .and_then(|v| v.as_str())
        .and_then(clean_opt);

    let mut ev = RawEvent::new(Sport::Hockey, SOURCE, EventKind::Match, date_text);
    ev.external_id = Some(id.clone());
    ev.source_game_id = Some(id);
    ev.time_text = time;
    ev.league = Some(league.to_string());
    ev.home = Some(home);
    ev.away = Some(away);
    ev.venue = venue;
    ev.federation_name = Some(FEDERATION_NAME.to_string());
    ev.federation_link = Some(FEDERATION_LINK.to_string());
    ev.payload = game.clone();
    Some(ev)
}

#[async_trait]
impl SourceAdapter for HockeyAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn sport(&self) -> Sport {
        Sport::Hockey
    }

    async fn collect(&self) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();
        for division in &self.cfg.divisions {
            let url = self.division_url(division.id);
            let payload = self
                .fetcher
                .get_json(&url)
                .await
                .with_context(|| format!("division {} ({})", division.id, division.league))?;

            let rows = payload
                .get("data")
                .and_then(|d| d.get("rows"))
                .and_then(|r| r.as_array())
                .cloned()
                .unwrap_or_default();
            info!(division = division.id, league = %division.league, rows = rows.len(), "division fetched");

            for game in &rows {
                match parse_game(game, &division.league) {
                    Some(ev) => events.push(ev),
                    None => warn!(raw = %game, "skipping schedule row with missing fields"),
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_game() -> Value {
        json!({
            "id": 50312,
            "scheduledDate": { "value": "18.10.2025" },
            "scheduledTime": "17:00",
            "homeTeamLongName": "HC Panter",
            "awayTeamLongName": "Tartu Välk 494",
            "location": { "longname": "Tondiraba Jäähall" }
        })
    }

    #[test]
    fn parses_full_game() {
        let ev = parse_game(&sample_game(), "UNIBET HOKILIIGA").unwrap();
        assert_eq!(ev.external_id.as_deref(), Some("50312"));
        assert_eq!(ev.date_text, "18.10.2025");
        assert_eq!(ev.time_text.as_deref(), Some("17:00"));
        assert_eq!(ev.home.as_deref(), Some("HC Panter"));
        assert_eq!(ev.away.as_deref(), Some("Tartu Välk 494"));
        assert_eq!(ev.venue.as_deref(), Some("Tondiraba Jäähall"));
        assert_eq!(ev.league.as_deref(), Some("UNIBET HOKILIIGA"));
    }

    #[test]
    fn missing_required_fields_yield_none() {
        let mut g = sample_game();
        g.as_object_mut().unwrap().remove("id");
        assert!(parse_game(&g, "L").is_none());

        let mut g = sample_game();
        g.as_object_mut().unwrap().remove("homeTeamLongName");
        assert!(parse_game(&g, "L").is_none());

        let mut g = sample_game();
        g.as_object_mut().unwrap().remove("scheduledDate");
        assert!(parse_game(&g, "L").is_none());
    }

    #[test]
    fn missing_optional_fields_are_tolerated() {
        let mut g = sample_game();
        g.as_object_mut().unwrap().remove("location");
        g.as_object_mut().unwrap().remove("scheduledTime");
        let ev = parse_game(&g, "L").unwrap();
        assert_eq!(ev.venue, None);
        assert_eq!(ev.time_text, None);
    }
}
