//! Application-level configuration, materialized once at startup and handed
//! to constructors. Adapters never read process environment themselves.

use anyhow::Result;
use chrono::{Datelike, Utc};

use crate::util::env::{db_url, env_flag, env_parse};

/// What to do with an event whose team identities resolve to no alias.
///
/// `Store` keeps the row with free-text fields only so an operator can map
/// it later; `Drop` reproduces the strict behavior of sources that publish
/// team codes, where an unknown code usually means a non-league fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedPolicy {
    #[default]
    Store,
    Drop,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Year substituted into `DD.MM HH:MM` dates that carry no year.
    pub reference_year: i32,
    pub unmapped_policy: UnmappedPolicy,
}

impl AppConfig {
    /// Build from environment/.env. CLI flags may override fields afterwards.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: db_url()?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 5u32),
            reference_year: Utc::now().date_naive().year(),
            unmapped_policy: if env_flag("DROP_UNMAPPED", false) {
                UnmappedPolicy::Drop
            } else {
                UnmappedPolicy::Store
            },
        })
    }
}
