//! Drives one adapter end to end: fetch, normalize, resolve identities,
//! upsert. A record-level failure of any kind is counted and logged, never
//! fatal; only a transport-level failure from the adapter aborts the run.

use anyhow::Result;
use std::fmt;
use tracing::{error, info, warn};

use crate::config::UnmappedPolicy;
use crate::identity::{self, AliasIndex, AliasNamespace};
use crate::normalize::{extract_team_and_code, normalize_whitespace, parse_clock, parse_date, parse_date_range};
use crate::sources::{EventKind, RawEvent, SourceAdapter, Sport};
use crate::store::{
    upsert_canonical_event, upsert_raw_competition, upsert_raw_match, CanonicalEventRow, Db,
    RawCompetitionRow, RawMatchRow, UpsertOutcome,
};

pub struct RunContext<'a> {
    pub db: &'a Db,
    pub aliases: &'a AliasIndex,
    pub reference_year: i32,
    pub unmapped_policy: UnmappedPolicy,
}

/// Outcome counts for one adapter run. Counts reflect exactly what was
/// durably written; the summary line is printed even when the run ends in
/// a transport error.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub source: String,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
    pub parse_skipped: usize,
    pub dropped_unmapped: usize,
    pub failed: usize,
    pub canonical_inserted: usize,
    pub canonical_updated: usize,
    pub canonical_duplicates: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DONE source={} fetched={} inserted={} updated={} duplicates={} parse_skipped={} dropped_unmapped={} failed={}",
            self.source,
            self.fetched,
            self.inserted,
            self.updated,
            self.duplicates,
            self.parse_skipped,
            self.dropped_unmapped,
            self.failed,
        )?;
        if self.canonical_inserted + self.canonical_updated + self.canonical_duplicates > 0 {
            write!(
                f,
                " events_inserted={} events_updated={} events_duplicates={}",
                self.canonical_inserted, self.canonical_updated, self.canonical_duplicates
            )?;
        }
        Ok(())
    }
}

impl RunSummary {
    fn count(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped => self.duplicates += 1,
        }
    }

    fn count_canonical(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.canonical_inserted += 1,
            UpsertOutcome::Updated => self.canonical_updated += 1,
            UpsertOutcome::Skipped => self.canonical_duplicates += 1,
        }
    }
}

fn clean(field: &Option<String>) -> Option<String> {
    field.as_deref().map(normalize_whitespace).filter(|s| !s.is_empty())
}

/// Canonical event title; the short code is what fans see in listings, so
/// it wins over the long name when the source published one.
fn match_title(
    home_code: Option<&str>,
    home_name: Option<&str>,
    away_code: Option<&str>,
    away_name: Option<&str>,
) -> String {
    let home = home_code.or(home_name).unwrap_or_default();
    let away = away_code.or(away_name).unwrap_or_default();
    format!("{home} vs {away}")
}

/// Run one adapter. Each record is its own unit of work; the datastore
/// enforces uniqueness, so concurrent runs of different adapters are safe.
pub async fn run_adapter(ctx: &RunContext<'_>, adapter: &dyn SourceAdapter) -> Result<RunSummary> {
    let mut summary = RunSummary {
        source: adapter.source().to_string(),
        ..RunSummary::default()
    };

    let events = adapter.collect().await?;
    summary.fetched = events.len();
    info!(source = adapter.source(), fetched = summary.fetched, "adapter fetch complete");

    for ev in &events {
        match ev.kind {
            EventKind::Match => process_match(ctx, adapter, ev, &mut summary).await,
            EventKind::Competition => process_competition(ctx, ev, &mut summary).await,
        }
    }

    let unmapped = ctx.aliases.unmapped_report();
    if !unmapped.is_empty() {
        info!(distinct = unmapped.len(), "unmapped alias strings seen this run");
        for entry in unmapped.iter().take(20) {
            info!(namespace = entry.namespace.as_str(), raw = %entry.raw, count = entry.count, "unmapped");
        }
    }

    Ok(summary)
}

async fn process_match(
    ctx: &RunContext<'_>,
    adapter: &dyn SourceAdapter,
    ev: &RawEvent,
    summary: &mut RunSummary,
) {
    let parsed = parse_date(&ev.date_text, ctx.reference_year);
    let Some(date) = parsed.date else {
        warn!(source = ev.source, raw = %ev.date_text, "unparseable date; skipping record");
        summary.parse_skipped += 1;
        return;
    };
    let time = ev
        .time_text
        .as_deref()
        .and_then(parse_clock)
        .or(parsed.time);

    let mut home_name = clean(&ev.home);
    let mut home_code = clean(&ev.home_code);
    let mut away_name = clean(&ev.away);
    let mut away_code = clean(&ev.away_code);

    // Basketball sites glue the short code onto the display name; other
    // sports use plain names (and roman-numeral suffixes like "II" that
    // must not be mistaken for codes).
    if ev.sport == Sport::Basketball {
        if home_code.is_none() {
            if let Some(name) = home_name.take() {
                let (name, code) = extract_team_and_code(&name);
                home_name = Some(name);
                home_code = code;
            }
        }
        if away_code.is_none() {
            if let Some(name) = away_name.take() {
                let (name, code) = extract_team_and_code(&name);
                away_name = Some(name);
                away_code = code;
            }
        }
    }

    if (home_name.is_none() && home_code.is_none()) || (away_name.is_none() && away_code.is_none())
    {
        warn!(source = ev.source, raw = ?ev.payload, "missing team fields; skipping record");
        summary.parse_skipped += 1;
        return;
    }

    let league = clean(&ev.league);
    let venue = clean(&ev.venue);
    let city = clean(&ev.city);

    let home_team_id = home_code
        .as_deref()
        .and_then(|c| ctx.aliases.team_by_code(c))
        .or_else(|| {
            home_name
                .as_deref()
                .and_then(|n| ctx.aliases.resolve(AliasNamespace::Team, n))
        });
    let away_team_id = away_code
        .as_deref()
        .and_then(|c| ctx.aliases.team_by_code(c))
        .or_else(|| {
            away_name
                .as_deref()
                .and_then(|n| ctx.aliases.resolve(AliasNamespace::Team, n))
        });

    if ctx.unmapped_policy == UnmappedPolicy::Drop
        && (home_team_id.is_none() || away_team_id.is_none())
    {
        info!(source = ev.source, ?home_code, ?away_code, "unknown team identity; dropping per policy");
        summary.dropped_unmapped += 1;
        return;
    }

    let venue_id = venue
        .as_deref()
        .and_then(|v| ctx.aliases.resolve(AliasNamespace::Venue, v));
    let league_node_id = league
        .as_deref()
        .and_then(|l| ctx.aliases.resolve(AliasNamespace::League, l));

    let external_id = ev.external_id.clone().unwrap_or_else(|| {
        identity::external_id(
            league.as_deref(),
            ev.source_game_id.as_deref(),
            Some(date),
            home_code.as_deref(),
            home_name.as_deref(),
            away_code.as_deref(),
            away_name.as_deref(),
        )
    });

    let row = RawMatchRow {
        source: ev.source.to_string(),
        external_id,
        source_game_id: ev.source_game_id.clone(),
        league: league.clone(),
        date,
        time,
        raw_venue: venue.clone(),
        raw_city: city.clone(),
        home_team_name: home_name.clone(),
        home_team_code: home_code.clone(),
        away_team_name: away_name.clone(),
        away_team_code: away_code.clone(),
        home_team_id,
        away_team_id,
        venue_id,
        league_node_id,
        federation_link: ev.federation_link.clone(),
        federation_name: ev.federation_name.clone(),
        ticket_link: ev.ticket_url.clone(),
        match_link: ev.match_url.clone(),
        broadcast: clean(&ev.broadcast),
        raw_payload: ev.payload.clone(),
    };

    match upsert_raw_match(ctx.db, ev.sport.raw_table(), &row).await {
        Ok(outcome) => summary.count(outcome),
        Err(e) => {
            error!(
                source = ev.source,
                external_id = %row.external_id,
                date = %row.date,
                home = ?row.home_team_name,
                away = ?row.away_team_name,
                error = %e,
                "raw upsert failed"
            );
            summary.failed += 1;
            return;
        }
    }

    if adapter.writes_canonical() {
        let canonical = CanonicalEventRow {
            sport: ev.sport.as_str().to_string(),
            source: ev.source.to_string(),
            external_id: row.external_id.clone(),
            title: match_title(
                home_code.as_deref(),
                home_name.as_deref(),
                away_code.as_deref(),
                away_name.as_deref(),
            ),
            date,
            time,
            home_team_id,
            away_team_id,
            home_team: home_name.clone(),
            away_team: away_name.clone(),
            location: venue.clone(),
            city: city.clone(),
            league: league.clone(),
        };
        match upsert_canonical_event(ctx.db, &canonical).await {
            Ok(outcome) => summary.count_canonical(outcome),
            Err(e) => {
                error!(
                    source = ev.source,
                    external_id = %canonical.external_id,
                    title = %canonical.title,
                    error = %e,
                    "canonical upsert failed"
                );
                summary.failed += 1;
            }
        }
    }
}

async fn process_competition(ctx: &RunContext<'_>, ev: &RawEvent, summary: &mut RunSummary) {
    let Some(span) = parse_date_range(&ev.date_text) else {
        warn!(source = ev.source, raw = %ev.date_text, "unparseable date range; skipping record");
        summary.parse_skipped += 1;
        return;
    };
    let Some(title) = clean(&ev.title) else {
        warn!(source = ev.source, raw = %ev.date_text, "competition without title; skipping record");
        summary.parse_skipped += 1;
        return;
    };

    let league = clean(&ev.league);
    let venue = clean(&ev.venue);

    let venue_id = venue
        .as_deref()
        .and_then(|v| ctx.aliases.resolve(AliasNamespace::Venue, v));
    let league_node_id = league
        .as_deref()
        .and_then(|l| ctx.aliases.resolve(AliasNamespace::League, l));

    let external_id = ev.external_id.clone().unwrap_or_else(|| {
        identity::competition_external_id(
            ev.source,
            None,
            &ev.date_text,
            &title,
            venue.as_deref(),
            clean(&ev.organizer).as_deref(),
            clean(&ev.subtitle).as_deref(),
        )
    });

    let row = RawCompetitionRow {
        source: ev.source.to_string(),
        external_id,
        league,
        title,
        subtitle: clean(&ev.subtitle),
        raw_venue: venue,
        raw_city: clean(&ev.city),
        organizer: clean(&ev.organizer),
        date_start: span.start,
        date_end: span.end,
        venue_id,
        league_node_id,
        federation_link: ev.federation_link.clone(),
        federation_name: ev.federation_name.clone(),
        raw_payload: ev.payload.clone(),
    };

    match upsert_raw_competition(ctx.db, ev.sport.raw_table(), &row).await {
        Ok(outcome) => summary.count(outcome),
        Err(e) => {
            error!(
                source = ev.source,
                external_id = %row.external_id,
                title = %row.title,
                date_start = %row.date_start,
                error = %e,
                "raw upsert failed"
            );
            summary.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_short_codes() {
        assert_eq!(
            match_title(Some("TCH"), None, Some("OGR"), None),
            "TCH vs OGR"
        );
    }

    #[test]
    fn title_falls_back_to_names() {
        assert_eq!(
            match_title(None, Some("FC Flora"), None, Some("FCI Levadia")),
            "FC Flora vs FCI Levadia"
        );
        assert_eq!(
            match_title(Some("KAL"), Some("BC Kalev/Cramo"), None, Some("VEF Riga")),
            "KAL vs VEF Riga"
        );
    }
}
