//! Wire types for the backend's PostgREST interface.
//!
//! Rows come back exactly as the database stores them: snake_case columns,
//! nullable everything. Mapping into the domain types (and rejecting rows
//! with unknown enum strings) happens in `client`, never here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// fixtures table
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FixtureRow {
    pub id: Option<String>,
    pub stage: Option<String>,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub status: Option<String>,
    pub score_a: Option<u16>,
    pub score_b: Option<u16>,
    pub kickoff_at: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    /// Cumulative paused time, in whole seconds.
    pub total_paused_time: Option<i64>,
    pub current_half: Option<u8>,
    pub half_time_at: Option<DateTime<Utc>>,
    pub second_half_started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// PATCH body for a fixture. The id travels in the query string, not the
/// body. Every mutable column is always present so one write carries the
/// whole authoritative state, `null`s included (a cleared `paused_at` must
/// overwrite the stored one).
#[derive(Debug, Serialize, Clone)]
pub struct FixturePatch {
    pub status: String,
    pub score_a: u16,
    pub score_b: u16,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_time: i64,
    pub current_half: Option<u8>,
    pub half_time_at: Option<DateTime<Utc>>,
    pub second_half_started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// match_events table
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MatchEventRow {
    pub id: Option<String>,
    pub fixture_id: Option<String>,
    pub kind: Option<String>,
    pub team_id: Option<String>,
    pub player_id: Option<String>,
    pub assist_player_id: Option<String>,
    pub minute: Option<u16>,
    pub half: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
}

/// INSERT body. Ids are minted by the writing client (one operator per
/// fixture), so the insert carries its own primary key.
#[derive(Debug, Serialize, Clone)]
pub struct MatchEventInsert {
    pub id: String,
    pub fixture_id: String,
    pub kind: String,
    pub team_id: String,
    pub player_id: String,
    pub assist_player_id: Option<String>,
    pub minute: u16,
    pub half: u8,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// teams / players tables
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    #[serde(rename = "group_name")]
    pub group: Option<String>,
    pub crest_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PlayerRow {
    pub id: Option<String>,
    pub team_id: Option<String>,
    pub name: Option<String>,
    pub shirt_number: Option<u8>,
    pub position: Option<String>,
    pub rank: Option<String>,
}

// ---------------------------------------------------------------------------
// trades table
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TradeRow {
    pub id: Option<String>,
    pub from_team: Option<String>,
    pub to_team: Option<String>,
    pub offered_player: Option<String>,
    pub requested_player: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TradeInsert {
    pub from_team: String,
    pub to_team: String,
    pub offered_player: String,
    pub requested_player: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// auth
// ---------------------------------------------------------------------------

/// `GET /auth/v1/user`. The role comes out of the user's app metadata,
/// flattened by the backend into a top-level claim.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct AuthUserResponse {
    pub email: Option<String>,
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Offline snapshot file
// ---------------------------------------------------------------------------

/// Shape of the JSON pointed at by `CUPTUI_FIXTURES_JSON`: a dump of the
/// three tables, reusing the row types above.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SnapshotFile {
    pub fixtures: Vec<FixtureRow>,
    #[serde(default)]
    pub teams: Vec<TeamRow>,
    #[serde(default)]
    pub players: Vec<PlayerRow>,
}
