use crate::realtime::{Change, ChangeFrame, EVENTS_TABLE, FIXTURES_TABLE};
use crate::rest::{
    AuthUserResponse, FixturePatch, FixtureRow, MatchEventInsert, MatchEventRow, PlayerRow,
    SnapshotFile, TeamRow, TradeInsert, TradeRow,
};
use crate::{
    Actor, Fixture, FixtureStatus, Half, MatchEvent, Player, RankTier, Role, Snapshot, Stage,
    Team, TradeProposal, TradeStatus,
};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:54321";

/// Client for the cup backend: PostgREST tables, auth, object storage.
#[derive(Debug, Clone)]
pub struct CupApi {
    client: Client,
    base_url: String,
    api_key: String,
    token: Option<String>,
    timeout: Duration,
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    /// A row decoded fine as JSON but carried a value the domain model
    /// refuses (unknown stage, kind, role and so on).
    Decode(String),
    NotFound(String),
    Forbidden(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Decode(msg) => write!(f, "Decode error: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Forbidden(url) => write!(f, "Forbidden: {url}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl CupApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("cuptui/0.2 (terminal cup operator)")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            token,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// All fixtures, scheduled ones last-by-unknown-kickoff.
    pub async fn fetch_fixtures(&self) -> ApiResult<Vec<Fixture>> {
        let url = format!(
            "{}/rest/v1/fixtures?select=*&order=kickoff_at.asc.nullslast",
            self.base_url
        );
        let rows: Vec<FixtureRow> = self.get(&url).await?;
        rows.into_iter().map(map_fixture).collect()
    }

    pub async fn fetch_fixture(&self, fixture_id: &str) -> ApiResult<Fixture> {
        let url = format!(
            "{}/rest/v1/fixtures?select=*&id=eq.{fixture_id}",
            self.base_url
        );
        let rows: Vec<FixtureRow> = self.get(&url).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("fixture {fixture_id}")))?;
        map_fixture(row)
    }

    /// The fixture's timeline in `(created_at, id)` order. With `since`,
    /// only events stamped at or after that instant come back; the caller
    /// trims the overlap with its own cursor.
    pub async fn fetch_timeline(
        &self,
        fixture_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> ApiResult<Vec<MatchEvent>> {
        let mut url = format!(
            "{}/rest/v1/match_events?select=*&fixture_id=eq.{fixture_id}&order=created_at.asc,id.asc",
            self.base_url
        );
        if let Some(since) = since {
            url.push_str(&format!(
                "&created_at=gte.{}",
                since.to_rfc3339_opts(SecondsFormat::Millis, true)
            ));
        }
        let rows: Vec<MatchEventRow> = self.get(&url).await?;
        rows.into_iter().map(map_event).collect()
    }

    /// One authoritative write of the fixture's mutable columns, cleared
    /// fields included.
    pub async fn save_fixture(&self, fixture: &Fixture) -> ApiResult<()> {
        let url = format!("{}/rest/v1/fixtures?id=eq.{}", self.base_url, fixture.id);
        let body = fixture_patch(fixture);
        let builder = self.request(self.client.patch(&url)).json(&body);
        self.send_no_content(builder, &url).await
    }

    pub async fn insert_event(&self, event: &MatchEvent) -> ApiResult<()> {
        let url = format!("{}/rest/v1/match_events", self.base_url);
        let body = event_insert(event);
        let builder = self.request(self.client.post(&url)).json(&body);
        self.send_no_content(builder, &url).await
    }

    pub async fn fetch_teams(&self) -> ApiResult<Vec<Team>> {
        let url = format!("{}/rest/v1/teams?select=*&order=name.asc", self.base_url);
        let rows: Vec<TeamRow> = self.get(&url).await?;
        rows.into_iter().map(map_team).collect()
    }

    /// The whole player directory; rosters are sliced client-side.
    pub async fn fetch_players(&self) -> ApiResult<Vec<Player>> {
        let url = format!(
            "{}/rest/v1/players?select=*&order=team_id.asc,name.asc",
            self.base_url
        );
        let rows: Vec<PlayerRow> = self.get(&url).await?;
        rows.into_iter().map(map_player).collect()
    }

    /// Proposals involving the team, newest first, either direction.
    pub async fn fetch_trades(&self, team_id: &str) -> ApiResult<Vec<TradeProposal>> {
        let url = format!(
            "{}/rest/v1/trades?select=*&or=(from_team.eq.{team_id},to_team.eq.{team_id})&order=created_at.desc",
            self.base_url
        );
        let rows: Vec<TradeRow> = self.get(&url).await?;
        rows.into_iter().map(map_trade).collect()
    }

    pub async fn propose_trade(
        &self,
        from_team: &str,
        to_team: &str,
        offered_player: &str,
        requested_player: &str,
    ) -> ApiResult<()> {
        let url = format!("{}/rest/v1/trades", self.base_url);
        let body = TradeInsert {
            from_team: from_team.to_string(),
            to_team: to_team.to_string(),
            offered_player: offered_player.to_string(),
            requested_player: requested_player.to_string(),
            status: TradeStatus::Pending.label().to_string(),
        };
        let builder = self.request(self.client.post(&url)).json(&body);
        self.send_no_content(builder, &url).await
    }

    pub async fn set_trade_status(&self, trade_id: &str, status: TradeStatus) -> ApiResult<()> {
        let url = format!("{}/rest/v1/trades?id=eq.{trade_id}", self.base_url);
        let body = serde_json::json!({ "status": status.label() });
        let builder = self.request(self.client.patch(&url)).json(&body);
        self.send_no_content(builder, &url).await
    }

    /// Resolve the operator token into a verified actor. Without a token
    /// the client is a read-only viewer and no request is made.
    pub async fn whoami(&self) -> ApiResult<Actor> {
        if self.token.is_none() {
            return Ok(Actor::viewer());
        }
        let url = format!("{}/auth/v1/user", self.base_url);
        let response: AuthUserResponse = self.get(&url).await?;
        map_actor(response)
    }

    /// Upload a team crest and point the team row at its public URL.
    pub async fn upload_crest(
        &self,
        team_id: &str,
        extension: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<String> {
        let object_path = format!("crests/{team_id}.{extension}");
        let url = format!("{}/storage/v1/object/{object_path}", self.base_url);
        let builder = self
            .request(self.client.post(&url))
            .header("x-upsert", "true")
            .header("cache-control", "3600")
            .header("content-type", content_type_for(extension))
            .body(bytes);
        self.send_no_content(builder, &url).await?;

        let public_url = format!("{}/storage/v1/object/public/{object_path}", self.base_url);
        let patch_url = format!("{}/rest/v1/teams?id=eq.{team_id}", self.base_url);
        let body = serde_json::json!({ "crest_url": public_url });
        let builder = self.request(self.client.patch(&patch_url)).json(&body);
        self.send_no_content(builder, &patch_url).await?;
        Ok(public_url)
    }

    /// Load the offline snapshot named by `CUPTUI_FIXTURES_JSON`: either a
    /// local file or an http(s) URL serving the same JSON.
    pub async fn load_snapshot(&self, source: &str) -> ApiResult<Snapshot> {
        let file: SnapshotFile = if source.starts_with("http://") || source.starts_with("https://")
        {
            self.get(source).await?
        } else {
            let content = std::fs::read_to_string(source)
                .map_err(|e| ApiError::NotFound(format!("could not read {source}: {e}")))?;
            serde_json::from_str(&content)
                .map_err(|e| ApiError::Decode(format!("invalid snapshot json at {source}: {e}")))?
        };
        map_snapshot(file)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.timeout(self.timeout).header("apikey", &self.api_key);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .request(self.client.get(url))
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(classify_status(e, url)),
        }
    }

    async fn send_no_content(
        &self,
        builder: reqwest::RequestBuilder,
        url: &str,
    ) -> ApiResult<()> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;
        match response.error_for_status() {
            Ok(_) => Ok(()),
            Err(e) => Err(classify_status(e, url)),
        }
    }
}

fn classify_status(e: reqwest::Error, url: &str) -> ApiError {
    match e.status() {
        Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            ApiError::Forbidden(url.to_owned())
        }
        Some(StatusCode::NOT_FOUND) => ApiError::NotFound(url.to_owned()),
        _ => ApiError::Api(e, url.to_owned()),
    }
}

// ---------------------------------------------------------------------------
// Mapping: backend wire rows → clean domain types
// ---------------------------------------------------------------------------

fn need(value: Option<String>, what: &'static str) -> ApiResult<String> {
    value.ok_or_else(|| ApiError::Decode(format!("row missing {what}")))
}

fn unknown(table: &str, column: &str, value: &str) -> ApiError {
    ApiError::Decode(format!("{table}.{column}: unknown value '{value}'"))
}

fn map_fixture(row: FixtureRow) -> ApiResult<Fixture> {
    let stage_raw = need(row.stage, "fixtures.stage")?;
    let stage = Stage::parse(&stage_raw).ok_or_else(|| unknown("fixtures", "stage", &stage_raw))?;
    let status_raw = need(row.status, "fixtures.status")?;
    let status = FixtureStatus::parse(&status_raw)
        .ok_or_else(|| unknown("fixtures", "status", &status_raw))?;
    let current_half = match row.current_half {
        Some(n) => Some(
            Half::parse(n).ok_or_else(|| unknown("fixtures", "current_half", &n.to_string()))?,
        ),
        None => None,
    };

    Ok(Fixture {
        id: need(row.id, "fixtures.id")?,
        stage,
        team_a: need(row.team_a, "fixtures.team_a")?,
        team_b: need(row.team_b, "fixtures.team_b")?,
        status,
        score: (row.score_a.unwrap_or(0), row.score_b.unwrap_or(0)),
        kickoff_at: row.kickoff_at,
        venue: row.venue,
        started_at: row.started_at,
        paused_at: row.paused_at,
        total_paused_secs: row.total_paused_time.unwrap_or(0),
        current_half,
        half_time_at: row.half_time_at,
        second_half_started_at: row.second_half_started_at,
        ended_at: row.ended_at,
    })
}

fn fixture_patch(fixture: &Fixture) -> FixturePatch {
    FixturePatch {
        status: fixture.status.as_str().to_string(),
        score_a: fixture.score.0,
        score_b: fixture.score.1,
        started_at: fixture.started_at,
        paused_at: fixture.paused_at,
        total_paused_time: fixture.total_paused_secs,
        current_half: fixture.current_half.map(|h| h.number()),
        half_time_at: fixture.half_time_at,
        second_half_started_at: fixture.second_half_started_at,
        ended_at: fixture.ended_at,
    }
}

fn map_event(row: MatchEventRow) -> ApiResult<MatchEvent> {
    let kind_raw = need(row.kind, "match_events.kind")?;
    let kind = crate::EventKind::parse(&kind_raw)
        .ok_or_else(|| unknown("match_events", "kind", &kind_raw))?;
    let half_raw = row.half.unwrap_or(1);
    let half =
        Half::parse(half_raw).ok_or_else(|| unknown("match_events", "half", &half_raw.to_string()))?;

    Ok(MatchEvent {
        id: need(row.id, "match_events.id")?,
        fixture_id: need(row.fixture_id, "match_events.fixture_id")?,
        kind,
        team_id: need(row.team_id, "match_events.team_id")?,
        player_id: need(row.player_id, "match_events.player_id")?,
        assist_player_id: row.assist_player_id,
        minute: row.minute.unwrap_or(0),
        half,
        created_at: row
            .created_at
            .ok_or_else(|| ApiError::Decode("row missing match_events.created_at".into()))?,
    })
}

fn event_insert(event: &MatchEvent) -> MatchEventInsert {
    MatchEventInsert {
        id: event.id.clone(),
        fixture_id: event.fixture_id.clone(),
        kind: event.kind.as_str().to_string(),
        team_id: event.team_id.clone(),
        player_id: event.player_id.clone(),
        assist_player_id: event.assist_player_id.clone(),
        minute: event.minute,
        half: event.half.number(),
        created_at: event.created_at,
    }
}

fn map_team(row: TeamRow) -> ApiResult<Team> {
    let name = need(row.name, "teams.name")?;
    Ok(Team {
        id: need(row.id, "teams.id")?,
        short_name: row.short_name.unwrap_or_else(|| abbreviate(&name)),
        name,
        group: row.group,
        crest_url: row.crest_url,
    })
}

/// First three letters, upper-cased, for rows without a short name.
fn abbreviate(name: &str) -> String {
    name.chars().take(3).collect::<String>().to_uppercase()
}

fn map_player(row: PlayerRow) -> ApiResult<Player> {
    let rank = match row.rank {
        Some(raw) => {
            RankTier::parse(&raw).ok_or_else(|| unknown("players", "rank", &raw))?
        }
        None => RankTier::default(),
    };
    Ok(Player {
        id: need(row.id, "players.id")?,
        team_id: need(row.team_id, "players.team_id")?,
        name: need(row.name, "players.name")?,
        shirt_number: row.shirt_number,
        position: row.position,
        rank,
    })
}

fn map_trade(row: TradeRow) -> ApiResult<TradeProposal> {
    let status_raw = need(row.status, "trades.status")?;
    let status =
        TradeStatus::parse(&status_raw).ok_or_else(|| unknown("trades", "status", &status_raw))?;
    Ok(TradeProposal {
        id: need(row.id, "trades.id")?,
        from_team: need(row.from_team, "trades.from_team")?,
        to_team: need(row.to_team, "trades.to_team")?,
        offered_player: need(row.offered_player, "trades.offered_player")?,
        requested_player: need(row.requested_player, "trades.requested_player")?,
        status,
        created_at: row
            .created_at
            .ok_or_else(|| ApiError::Decode("row missing trades.created_at".into()))?,
    })
}

fn map_actor(response: AuthUserResponse) -> ApiResult<Actor> {
    let email = response.email.unwrap_or_default();
    // No claim means the account exists but was never granted anything.
    let role = match response.role {
        Some(raw) => Role::parse(&raw).ok_or_else(|| unknown("auth.user", "role", &raw))?,
        None => Role::Viewer,
    };
    Ok(Actor { email, role })
}

fn map_snapshot(file: SnapshotFile) -> ApiResult<Snapshot> {
    Ok(Snapshot {
        fixtures: file.fixtures.into_iter().map(map_fixture).collect::<ApiResult<_>>()?,
        teams: file.teams.into_iter().map(map_team).collect::<ApiResult<_>>()?,
        players: file.players.into_iter().map(map_player).collect::<ApiResult<_>>()?,
    })
}

/// Decode one realtime frame into a domain change. Frames for tables this
/// client does not watch map to `None` and are dropped quietly.
pub fn decode_change(frame: &ChangeFrame) -> ApiResult<Option<Change>> {
    match frame.table.as_str() {
        FIXTURES_TABLE => {
            let row: FixtureRow = serde_json::from_value(frame.record.clone())
                .map_err(|e| ApiError::Decode(format!("fixtures change: {e}")))?;
            Ok(Some(Change::FixtureUpdated(map_fixture(row)?)))
        }
        EVENTS_TABLE => {
            let row: MatchEventRow = serde_json::from_value(frame.record.clone())
                .map_err(|e| ApiError::Decode(format!("match_events change: {e}")))?;
            Ok(Some(Change::EventInserted(map_event(row)?)))
        }
        _ => Ok(None),
    }
}

/// Frame an operator publishes after a successful fixture write, so relay
/// peers see the change without waiting for the next poll. Carries the
/// whole row; [`decode_change`] reads it back.
pub fn fixture_update_frame(fixture: &Fixture) -> ChangeFrame {
    ChangeFrame {
        table: FIXTURES_TABLE.to_string(),
        kind: "UPDATE".to_string(),
        record: serde_json::json!({
            "id": fixture.id,
            "stage": fixture.stage.as_str(),
            "team_a": fixture.team_a,
            "team_b": fixture.team_b,
            "status": fixture.status.as_str(),
            "score_a": fixture.score.0,
            "score_b": fixture.score.1,
            "kickoff_at": fixture.kickoff_at,
            "venue": fixture.venue,
            "started_at": fixture.started_at,
            "paused_at": fixture.paused_at,
            "total_paused_time": fixture.total_paused_secs,
            "current_half": fixture.current_half.map(|h| h.number()),
            "half_time_at": fixture.half_time_at,
            "second_half_started_at": fixture.second_half_started_at,
            "ended_at": fixture.ended_at,
        }),
    }
}

pub fn event_insert_frame(event: &MatchEvent) -> ChangeFrame {
    ChangeFrame {
        table: EVENTS_TABLE.to_string(),
        kind: "INSERT".to_string(),
        record: serde_json::json!({
            "id": event.id,
            "fixture_id": event.fixture_id,
            "kind": event.kind.as_str(),
            "team_id": event.team_id,
            "player_id": event.player_id,
            "assist_player_id": event.assist_player_id,
            "minute": event.minute,
            "half": event.half.number(),
            "created_at": event.created_at,
        }),
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
