use crate::state::network::LoadingState;
use chrono::{DateTime, Utc};
use crossterm::event::KeyEvent;
use cup_api::phase::PhaseAction;
use cup_api::timeline::EventDraft;
use cup_api::{Actor, Fixture, MatchEvent, Player, Snapshot, Team, TradeProposal, TradeStatus};

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    /// Fixtures plus the team/player directory plus the actor, one round.
    LoadBoard,
    RefreshFixtures,
    LoadMatch { fixture_id: String },
    /// Catch-up read after a realtime reconnect: everything stamped at or
    /// after `since`; the dispatcher trims the overlap.
    ReconcileTimeline { fixture_id: String, since: Option<DateTime<Utc>> },
    ApplyTransition { fixture_id: String, action: PhaseAction },
    AppendEvent { fixture_id: String, draft: EventDraft },
    LoadTrades { team_id: String },
    ProposeTrade { from_team: String, to_team: String, offered: String, requested: String },
    ResolveTrade { trade_id: String, team_id: String, status: TradeStatus },
    UploadCrest { team_id: String, path: String },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    BoardLoaded { snapshot: Snapshot, actor: Actor },
    FixturesRefreshed { fixtures: Vec<Fixture> },
    MatchLoaded { fixture: Fixture, events: Vec<MatchEvent> },
    TimelineReconciled { fixture_id: String, events: Vec<MatchEvent> },
    /// An admin write went through; the echoed state is authoritative.
    FixtureSaved { fixture: Fixture, appended: Option<MatchEvent> },
    TradesLoaded { team_id: String, trades: Vec<TradeProposal> },
    TradeSaved { team_id: String },
    CrestUploaded { team_id: String, url: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    AnimationTick,
}

/// Name/rank lookups for rosters and celebrations.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
}

impl Directory {
    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Falls back to the raw id so rendering never dead-ends on a row the
    /// directory has not seen yet.
    pub fn team_name(&self, team_id: &str) -> String {
        self.team(team_id).map_or_else(|| team_id.to_string(), |t| t.name.clone())
    }

    pub fn player_name(&self, player_id: &str) -> String {
        self.player(player_id).map_or_else(|| player_id.to_string(), |p| p.name.clone())
    }

    pub fn roster(&self, team_id: &str) -> Vec<&Player> {
        let mut roster: Vec<&Player> =
            self.players.iter().filter(|p| p.team_id == team_id).collect();
        roster.sort_by_key(|p| (p.rank, p.shirt_number.unwrap_or(u8::MAX)));
        roster
    }
}
