//! Flat alias index for O(1) raw-text -> canonical-id lookups.
//!
//! Aliases are operator-curated; the pipeline only reads them. Lookup is
//! whitespace-normalized, case-insensitive, exact. No fuzzy matching:
//! an unmapped string resolves to None and is reported, never guessed.

use anyhow::Result;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use crate::normalize::normalize_whitespace;
use crate::store::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasNamespace {
    Team,
    Venue,
    League,
}

impl AliasNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasNamespace::Team => "team",
            AliasNamespace::Venue => "venue",
            AliasNamespace::League => "league",
        }
    }

    fn from_db(raw: &str) -> Option<Self> {
        match raw {
            "team" => Some(AliasNamespace::Team),
            "venue" => Some(AliasNamespace::Venue),
            "league" => Some(AliasNamespace::League),
            _ => None,
        }
    }
}

/// One unresolved raw string with its occurrence count for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedEntry {
    pub namespace: AliasNamespace,
    pub raw: String,
    pub count: u64,
}

fn fold(raw: &str) -> String {
    normalize_whitespace(raw).to_lowercase()
}

/// In-memory snapshot of the alias tables for one sport, loaded once per
/// run. Also carries the team short-code map for sources that publish
/// codes instead of names.
pub struct AliasIndex {
    aliases: HashMap<(AliasNamespace, String), i64>,
    team_codes: HashMap<String, i64>,
    misses: Mutex<HashMap<(AliasNamespace, String), u64>>,
}

impl AliasIndex {
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
            team_codes: HashMap::new(),
            misses: Mutex::new(HashMap::new()),
        }
    }

    /// Load every alias and team code for `sport`.
    pub async fn load(db: &Db, sport: &str) -> Result<Self> {
        let mut index = Self::empty();

        let alias_rows = sqlx::query(
            "SELECT namespace, alias, entity_id FROM aliases WHERE sport = $1",
        )
        .persistent(false)
        .bind(sport)
        .fetch_all(&db.pool)
        .await?;
        for row in alias_rows {
            let ns: String = row.get("namespace");
            let alias: String = row.get("alias");
            let entity_id: i64 = row.get("entity_id");
            if let Some(ns) = AliasNamespace::from_db(&ns) {
                index.aliases.insert((ns, fold(&alias)), entity_id);
            }
        }

        let team_rows = sqlx::query("SELECT id, code FROM teams WHERE code IS NOT NULL")
            .persistent(false)
            .fetch_all(&db.pool)
            .await?;
        for row in team_rows {
            let id: i64 = row.get("id");
            let code: String = row.get("code");
            index.team_codes.insert(fold(&code), id);
        }

        info!(
            sport,
            aliases = index.aliases.len(),
            team_codes = index.team_codes.len(),
            "alias index loaded"
        );
        Ok(index)
    }

    /// Resolve raw text in a namespace; a miss is recorded and returns None.
    pub fn resolve(&self, namespace: AliasNamespace, raw: &str) -> Option<i64> {
        let key = fold(raw);
        if key.is_empty() {
            return None;
        }
        match self.aliases.get(&(namespace, key.clone())) {
            Some(id) => Some(*id),
            None => {
                let mut misses = self.misses.lock().unwrap();
                *misses.entry((namespace, key)).or_insert(0) += 1;
                None
            }
        }
    }

    /// Direct team lookup by short code (estlatbl publishes "TCH"-style
    /// codes). Falls back to the team alias namespace on a code miss.
    pub fn team_by_code(&self, code: &str) -> Option<i64> {
        let key = fold(code);
        if key.is_empty() {
            return None;
        }
        if let Some(id) = self.team_codes.get(&key) {
            return Some(*id);
        }
        self.resolve(AliasNamespace::Team, code)
    }

    /// Distinct unresolved strings seen during this run, most frequent
    /// first. This is the operator's triage list for new aliases.
    pub fn unmapped_report(&self) -> Vec<UnmappedEntry> {
        let misses = self.misses.lock().unwrap();
        let mut entries: Vec<UnmappedEntry> = misses
            .iter()
            .map(|((ns, raw), count)| UnmappedEntry {
                namespace: *ns,
                raw: raw.clone(),
                count: *count,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.raw.cmp(&b.raw)));
        entries
    }

    #[cfg(test)]
    pub(crate) fn with_entries(
        aliases: Vec<(AliasNamespace, &str, i64)>,
        team_codes: Vec<(&str, i64)>,
    ) -> Self {
        let mut index = Self::empty();
        for (ns, alias, id) in aliases {
            index.aliases.insert((ns, fold(alias)), id);
        }
        for (code, id) in team_codes {
            index.team_codes.insert(fold(code), id);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AliasIndex {
        AliasIndex::with_entries(
            vec![
                (AliasNamespace::Team, "BC Kalev/Cramo", 1),
                (AliasNamespace::Venue, "Tondiraba Jäähall", 7),
                (AliasNamespace::League, "Optibet Eesti–Läti Korvpalliliiga", 3),
            ],
            vec![("TCH", 11), ("OGR", 12)],
        )
    }

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        let idx = sample();
        assert_eq!(idx.resolve(AliasNamespace::Team, "  bc  kalev/cramo "), Some(1));
        assert_eq!(idx.resolve(AliasNamespace::Venue, "TONDIRABA\u{a0}JÄÄHALL"), Some(7));
    }

    #[test]
    fn namespaces_do_not_bleed() {
        let idx = sample();
        assert_eq!(idx.resolve(AliasNamespace::Venue, "BC Kalev/Cramo"), None);
    }

    #[test]
    fn miss_is_none_and_reported() {
        let idx = sample();
        assert_eq!(idx.resolve(AliasNamespace::Team, "Unknown Club"), None);
        assert_eq!(idx.resolve(AliasNamespace::Team, "unknown club"), None);
        let report = idx.unmapped_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].raw, "unknown club");
        assert_eq!(report[0].count, 2);
    }

    #[test]
    fn team_code_lookup() {
        let idx = sample();
        assert_eq!(idx.team_by_code("TCH"), Some(11));
        assert_eq!(idx.team_by_code("tch"), Some(11));
        assert_eq!(idx.team_by_code("ZZZ"), None);
    }
}
