//! Conflict-aware insert-or-update against the raw stores and the
//! canonical `events` relation.
//!
//! Identity collisions (same `(source, external_id)`) refresh only the
//! fields a source can legitimately re-publish; operator-curated resolved
//! ids are only ever filled when still null, never overwritten.
//! `scraped_at` can only move forward. A unique violation on any *other*
//! constraint (legacy duplicate-detection rules on the events table) is a
//! skip, not an error.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::Row;

use crate::store::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Collided with a uniqueness rule other than the identity key.
    Skipped,
}

/// Row for the per-sport raw match tables (basketball, hockey, football).
#[derive(Debug, Clone)]
pub struct RawMatchRow {
    pub source: String,
    pub external_id: String,
    pub source_game_id: Option<String>,
    pub league: Option<String>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub raw_venue: Option<String>,
    pub raw_city: Option<String>,
    pub home_team_name: Option<String>,
    pub home_team_code: Option<String>,
    pub away_team_name: Option<String>,
    pub away_team_code: Option<String>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub venue_id: Option<i64>,
    pub league_node_id: Option<i64>,
    pub federation_link: Option<String>,
    pub federation_name: Option<String>,
    pub ticket_link: Option<String>,
    pub match_link: Option<String>,
    pub broadcast: Option<String>,
    pub raw_payload: serde_json::Value,
}

/// Row for the skating-style calendar tables (multi-day competitions,
/// no home/away split).
#[derive(Debug, Clone)]
pub struct RawCompetitionRow {
    pub source: String,
    pub external_id: String,
    pub league: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub raw_venue: Option<String>,
    pub raw_city: Option<String>,
    pub organizer: Option<String>,
    pub date_start: NaiveDate,
    pub date_end: Option<NaiveDate>,
    pub venue_id: Option<i64>,
    pub league_node_id: Option<i64>,
    pub federation_link: Option<String>,
    pub federation_name: Option<String>,
    pub raw_payload: serde_json::Value,
}

/// Row for the canonical `events` relation consumed by the serving layer.
#[derive(Debug, Clone)]
pub struct CanonicalEventRow {
    pub sport: String,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub league: Option<String>,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

fn outcome_from(row: sqlx::postgres::PgRow) -> UpsertOutcome {
    if row.get::<bool, _>("inserted") {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    }
}

/// Upsert one match row into `table` (must be one of the fixed raw-table
/// names from [`crate::sources::Sport::raw_table`]).
pub async fn upsert_raw_match(
    db: &Db,
    table: &'static str,
    row: &RawMatchRow,
) -> Result<UpsertOutcome> {
    let sql = format!(
        "INSERT INTO {t} (
            source, external_id, source_game_id, league, date, time,
            raw_venue, raw_city,
            home_team_name, home_team_code, away_team_name, away_team_code,
            home_team_id, away_team_id, venue_id, league_node_id,
            federation_link, federation_name, ticket_link, match_link, broadcast,
            raw_payload, scraped_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22, now())
         ON CONFLICT (source, external_id) DO UPDATE SET
            source_game_id = EXCLUDED.source_game_id,
            league = EXCLUDED.league,
            date = EXCLUDED.date,
            time = EXCLUDED.time,
            raw_venue = EXCLUDED.raw_venue,
            raw_city = EXCLUDED.raw_city,
            home_team_name = EXCLUDED.home_team_name,
            home_team_code = EXCLUDED.home_team_code,
            away_team_name = EXCLUDED.away_team_name,
            away_team_code = EXCLUDED.away_team_code,
            home_team_id = COALESCE({t}.home_team_id, EXCLUDED.home_team_id),
            away_team_id = COALESCE({t}.away_team_id, EXCLUDED.away_team_id),
            venue_id = COALESCE({t}.venue_id, EXCLUDED.venue_id),
            league_node_id = COALESCE({t}.league_node_id, EXCLUDED.league_node_id),
            federation_link = EXCLUDED.federation_link,
            ticket_link = EXCLUDED.ticket_link,
            match_link = EXCLUDED.match_link,
            broadcast = EXCLUDED.broadcast,
            raw_payload = EXCLUDED.raw_payload,
            scraped_at = GREATEST({t}.scraped_at, now())
         RETURNING (xmax = 0) AS inserted",
        t = table
    );

    let res = sqlx::query(&sql)
        .persistent(false)
        .bind(&row.source)
        .bind(&row.external_id)
        .bind(&row.source_game_id)
        .bind(&row.league)
        .bind(row.date)
        .bind(row.time)
        .bind(&row.raw_venue)
        .bind(&row.raw_city)
        .bind(&row.home_team_name)
        .bind(&row.home_team_code)
        .bind(&row.away_team_name)
        .bind(&row.away_team_code)
        .bind(row.home_team_id)
        .bind(row.away_team_id)
        .bind(row.venue_id)
        .bind(row.league_node_id)
        .bind(&row.federation_link)
        .bind(&row.federation_name)
        .bind(&row.ticket_link)
        .bind(&row.match_link)
        .bind(&row.broadcast)
        .bind(&row.raw_payload)
        .fetch_one(&db.pool)
        .await;

    match res {
        Ok(row) => Ok(outcome_from(row)),
        Err(e) if is_unique_violation(&e) => Ok(UpsertOutcome::Skipped),
        Err(e) => Err(e.into()),
    }
}

/// Upsert one competition row into `table`.
pub async fn upsert_raw_competition(
    db: &Db,
    table: &'static str,
    row: &RawCompetitionRow,
) -> Result<UpsertOutcome> {
    let sql = format!(
        "INSERT INTO {t} (
            source, external_id, league, title, subtitle,
            raw_venue, raw_city, organizer, date_start, date_end,
            venue_id, league_node_id,
            federation_link, federation_name, raw_payload, scraped_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15, now())
         ON CONFLICT (source, external_id) DO UPDATE SET
            league = EXCLUDED.league,
            title = EXCLUDED.title,
            subtitle = EXCLUDED.subtitle,
            raw_venue = EXCLUDED.raw_venue,
            raw_city = EXCLUDED.raw_city,
            organizer = EXCLUDED.organizer,
            date_start = EXCLUDED.date_start,
            date_end = EXCLUDED.date_end,
            venue_id = COALESCE({t}.venue_id, EXCLUDED.venue_id),
            league_node_id = COALESCE({t}.league_node_id, EXCLUDED.league_node_id),
            federation_link = EXCLUDED.federation_link,
            federation_name = EXCLUDED.federation_name,
            raw_payload = EXCLUDED.raw_payload,
            scraped_at = GREATEST({t}.scraped_at, now())
         RETURNING (xmax = 0) AS inserted",
        t = table
    );

    let res = sqlx::query(&sql)
        .persistent(false)
        .bind(&row.source)
        .bind(&row.external_id)
        .bind(&row.league)
        .bind(&row.title)
        .bind(&row.subtitle)
        .bind(&row.raw_venue)
        .bind(&row.raw_city)
        .bind(&row.organizer)
        .bind(row.date_start)
        .bind(row.date_end)
        .bind(row.venue_id)
        .bind(row.league_node_id)
        .bind(&row.federation_link)
        .bind(&row.federation_name)
        .bind(&row.raw_payload)
        .fetch_one(&db.pool)
        .await;

    match res {
        Ok(row) => Ok(outcome_from(row)),
        Err(e) if is_unique_violation(&e) => Ok(UpsertOutcome::Skipped),
        Err(e) => Err(e.into()),
    }
}

/// Upsert into the canonical `events` relation. The table carries a legacy
/// `unique_event` natural-key constraint alongside the identity key; a
/// collision on it surfaces as a plain unique violation here and is
/// reported as Skipped.
pub async fn upsert_canonical_event(db: &Db, row: &CanonicalEventRow) -> Result<UpsertOutcome> {
    let res = sqlx::query(
        "INSERT INTO events (
            sport, source, external_id, title, date, time,
            home_team_id, away_team_id, home_team, away_team,
            location, city, league, scraped_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13, now())
         ON CONFLICT (source, external_id) DO UPDATE SET
            title = EXCLUDED.title,
            date = EXCLUDED.date,
            time = EXCLUDED.time,
            home_team_id = COALESCE(events.home_team_id, EXCLUDED.home_team_id),
            away_team_id = COALESCE(events.away_team_id, EXCLUDED.away_team_id),
            home_team = EXCLUDED.home_team,
            away_team = EXCLUDED.away_team,
            location = EXCLUDED.location,
            city = EXCLUDED.city,
            league = EXCLUDED.league,
            scraped_at = GREATEST(events.scraped_at, now())
         RETURNING (xmax = 0) AS inserted",
    )
    .persistent(false)
    .bind(&row.sport)
    .bind(&row.source)
    .bind(&row.external_id)
    .bind(&row.title)
    .bind(row.date)
    .bind(row.time)
    .bind(row.home_team_id)
    .bind(row.away_team_id)
    .bind(&row.home_team)
    .bind(&row.away_team)
    .bind(&row.location)
    .bind(&row.city)
    .bind(&row.league)
    .fetch_one(&db.pool)
    .await;

    match res {
        Ok(row) => Ok(outcome_from(row)),
        Err(e) if is_unique_violation(&e) => Ok(UpsertOutcome::Skipped),
        Err(e) => Err(e.into()),
    }
}
