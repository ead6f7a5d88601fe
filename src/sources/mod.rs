//! Source adapters: one per federation site or API.
//!
//! Adapters share a single contract (fetch raw content, emit
//! [`RawEvent`] records) and never call each other. A malformed row is
//! the adapter's problem only insofar as it logs and skips it; field
//! normalization, identity, and persistence live downstream in the runner.

pub mod basket_ee;
pub mod estlatbl_live;
pub mod estlatbl_schedule;
pub mod fetch;
pub mod football;
pub mod hockey;
pub mod skating;

use anyhow::Result;
use async_trait::async_trait;

pub use fetch::{FetchConfig, HttpFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sport {
    Basketball,
    Hockey,
    Football,
    Skating,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Basketball => "Basketball",
            Sport::Hockey => "Hockey",
            Sport::Football => "Football",
            Sport::Skating => "Skating",
        }
    }

    /// Per-sport raw staging table.
    pub fn raw_table(&self) -> &'static str {
        match self {
            Sport::Basketball => "raw_basketball_events",
            Sport::Hockey => "raw_hockey_events",
            Sport::Football => "raw_football_events",
            Sport::Skating => "raw_skating_events",
        }
    }
}

/// Shape of the record: a two-team fixture or a multi-day competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Match,
    Competition,
}

/// One event as an adapter saw it: raw text fields plus the original
/// payload kept verbatim for forensic replay. Ephemeral; the runner turns
/// this into store rows.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub sport: Sport,
    pub source: &'static str,
    pub kind: EventKind,
    /// Source-native or structured identity, when the source has one.
    /// None means the runner computes the content hash.
    pub external_id: Option<String>,
    pub source_game_id: Option<String>,
    pub date_text: String,
    pub time_text: Option<String>,
    pub league: Option<String>,
    pub round: Option<String>,
    pub home: Option<String>,
    pub home_code: Option<String>,
    pub away: Option<String>,
    pub away_code: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub organizer: Option<String>,
    pub federation_name: Option<String>,
    pub federation_link: Option<String>,
    pub ticket_url: Option<String>,
    pub match_url: Option<String>,
    pub broadcast: Option<String>,
    pub payload: serde_json::Value,
}

impl RawEvent {
    pub fn new(sport: Sport, source: &'static str, kind: EventKind, date_text: String) -> Self {
        Self {
            sport,
            source,
            kind,
            external_id: None,
            source_game_id: None,
            date_text,
            time_text: None,
            league: None,
            round: None,
            home: None,
            home_code: None,
            away: None,
            away_code: None,
            venue: None,
            city: None,
            title: None,
            subtitle: None,
            organizer: None,
            federation_name: None,
            federation_link: None,
            ticket_url: None,
            match_url: None,
            broadcast: None,
            payload: serde_json::Value::Null,
        }
    }
}

/// Contract shared by all adapters. `collect` performs the whole fetch for
/// one run; a transport-level failure (timeout, non-2xx on the source,
/// selector that never appears) is an Err and aborts the run, while
/// malformed rows are logged and dropped inside the adapter.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> &'static str;
    fn sport(&self) -> Sport;

    /// Whether this adapter's rows also land in the canonical `events`
    /// relation (in addition to the sport's raw table).
    fn writes_canonical(&self) -> bool {
        false
    }

    async fn collect(&self) -> Result<Vec<RawEvent>>;
}
