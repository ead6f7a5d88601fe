//! Batch ingestion and normalization of sporting-event schedules.
//!
//! Each source adapter fetches raw markup or JSON from one federation
//! site and yields [`sources::RawEvent`] records; the runner pushes them
//! through normalization, identity resolution, and the conflict-aware
//! upsert path into Postgres. Re-running any adapter against unchanged
//! source content is a no-op apart from `scraped_at` advancing.

pub mod config;
pub mod identity;
pub mod normalize;
pub mod runner;
pub mod sources;
pub mod store;
pub mod tracing;

pub mod util {
    pub mod env;
}

pub use config::{AppConfig, UnmappedPolicy};
pub use runner::{run_adapter, RunContext, RunSummary};
pub use sources::{RawEvent, SourceAdapter, Sport};
pub use store::db::Db;
