//! Datastore access: connection handle and the upsert/merge engine.

pub mod db;
pub mod upsert;

pub use db::Db;
pub use upsert::{
    upsert_canonical_event, upsert_raw_competition, upsert_raw_match, CanonicalEventRow,
    RawCompetitionRow, RawMatchRow, UpsertOutcome,
};
