use crate::app::MenuItem;
use crate::state::dispatcher::{CelebrationTrigger, LiveDispatcher};
use crate::state::messages::Directory;
use cup_api::timeline::{self, EventDraft};
use cup_api::{
    Actor, EventKind, Fixture, FixtureStatus, MatchEvent, Stage, TradeProposal, TradeStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Overlay animation state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AnimationState {
    /// Current frame index into the celebration frames array, wraps at FRAME_COUNT.
    pub frame: usize,
    /// Monotonic tick counter, drives the bounce offset in the overlay.
    pub tick: u64,
}

impl AnimationState {
    pub fn advance(&mut self, frame_count: usize) {
        self.tick = self.tick.wrapping_add(1);
        self.frame = (self.frame + 1) % frame_count;
    }
}

// ---------------------------------------------------------------------------
// Fixture board state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FixtureBoardState {
    pub fixtures: Vec<Fixture>,
    /// The stage with live play, auto-detected whenever fixtures change.
    /// Drives the initial view on load.
    pub current_stage: Stage,
    /// The stage the user has navigated to (may differ from current_stage).
    pub view_stage: Stage,
    /// Selected fixture index within the viewed stage.
    pub selected_fixture: usize,
}

impl FixtureBoardState {
    /// Store a freshly loaded board and jump the view to the active stage.
    pub fn load(&mut self, fixtures: Vec<Fixture>) {
        self.current_stage = detect_active_stage(&fixtures);
        self.view_stage = self.current_stage;
        self.selected_fixture = 0;
        self.fixtures = fixtures;
    }

    /// Wholesale refresh from a poll. Keeps the user's place on the board.
    pub fn refresh(&mut self, fixtures: Vec<Fixture>) {
        self.fixtures = fixtures;
        self.current_stage = detect_active_stage(&self.fixtures);
        self.clamp_selection();
    }

    /// One changed row from the live feed or an echoed admin write.
    pub fn apply_update(&mut self, update: Fixture) {
        if let Some(fixture) = self.fixtures.iter_mut().find(|f| f.id == update.id) {
            *fixture = update;
            self.current_stage = detect_active_stage(&self.fixtures);
        }
    }

    pub fn navigate_stage_next(&mut self) {
        if let Some(next) = self.view_stage.next() {
            self.view_stage = next;
            self.selected_fixture = 0;
        }
    }

    pub fn navigate_stage_prev(&mut self) {
        if let Some(prev) = self.view_stage.prev() {
            self.view_stage = prev;
            self.selected_fixture = 0;
        }
    }

    pub fn navigate_fixture_down(&mut self) {
        let max = self.fixtures_in_view().len().saturating_sub(1);
        if self.selected_fixture < max {
            self.selected_fixture += 1;
        }
    }

    pub fn navigate_fixture_up(&mut self) {
        self.selected_fixture = self.selected_fixture.saturating_sub(1);
    }

    pub fn fixtures_in_view(&self) -> Vec<&Fixture> {
        self.fixtures.iter().filter(|f| f.stage == self.view_stage).collect()
    }

    /// The fixture id under the cursor, if any.
    pub fn selected_fixture_id(&self) -> Option<String> {
        self.fixtures_in_view().get(self.selected_fixture).map(|f| f.id.clone())
    }

    fn clamp_selection(&mut self) {
        let max = self.fixtures_in_view().len().saturating_sub(1);
        if self.selected_fixture > max {
            self.selected_fixture = max;
        }
    }
}

/// Detect the active stage by scanning fixture statuses. Returns the first
/// stage with any live fixture, or failing that, the last stage with any
/// completed one.
fn detect_active_stage(fixtures: &[Fixture]) -> Stage {
    let stage_order = [Stage::Group, Stage::Quarter, Stage::Semi, Stage::Final];

    let mut last_with_results = Stage::Group;

    for stage in stage_order {
        let has_live = fixtures
            .iter()
            .any(|f| f.stage == stage && f.status == FixtureStatus::Live);
        if has_live {
            return stage;
        }

        let has_completed = fixtures
            .iter()
            .any(|f| f.stage == stage && f.status == FixtureStatus::Completed);
        if has_completed {
            last_with_results = stage;
        }
    }

    last_with_results
}

// ---------------------------------------------------------------------------
// Match view state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MatchViewState {
    pub fixture: Option<Fixture>,
    pub events: Vec<MatchEvent>,
    pub scroll_offset: u16,
    /// Event ids that arrived while the view was open; drawn highlighted.
    fresh_ids: HashSet<String>,
}

impl MatchViewState {
    pub fn load(&mut self, fixture: Fixture, mut events: Vec<MatchEvent>) {
        timeline::sort_timeline(&mut events);
        self.fixture = Some(fixture);
        self.events = events;
        self.scroll_offset = 0;
        self.fresh_ids.clear();
    }

    pub fn unmount(&mut self) {
        *self = Self::default();
    }

    pub fn fixture_id(&self) -> Option<&str> {
        self.fixture.as_ref().map(|f| f.id.as_str())
    }

    /// Replace the fixture row if it belongs to the open match.
    pub fn apply_fixture(&mut self, fixture: Fixture) {
        if self.fixture.as_ref().is_some_and(|f| f.id == fixture.id) {
            self.fixture = Some(fixture);
        }
    }

    /// Insert one event, keeping `(created_at, id)` order. Returns false for
    /// events already present or belonging to another fixture. The scoreline
    /// is re-projected from the timeline, so it stays right even when the
    /// fixture row's own update frame never arrives.
    pub fn insert_event(&mut self, event: MatchEvent) -> bool {
        let Some(fixture) = &self.fixture else {
            return false;
        };
        if event.fixture_id != fixture.id || self.events.iter().any(|e| e.id == event.id) {
            return false;
        }
        self.fresh_ids.insert(event.id.clone());
        self.events.push(event);
        timeline::sort_timeline(&mut self.events);
        if let Some(fixture) = &mut self.fixture {
            let score = timeline::project_score(fixture, &self.events);
            fixture.score = score;
        }
        true
    }

    pub fn is_fresh(&self, event_id: &str) -> bool {
        self.fresh_ids.contains(event_id)
    }

    pub fn scroll_down(&mut self) {
        let max = self.events.len().saturating_sub(1) as u16;
        if self.scroll_offset < max {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Celebration overlay state
// ---------------------------------------------------------------------------

/// How long the goal overlay stays up, in 80ms animation ticks (~6s).
const CELEBRATION_TICKS: u32 = 75;

#[derive(Debug, Default)]
pub struct CelebrationState {
    pub current: Option<CelebrationTrigger>,
    ticks_left: u32,
}

impl CelebrationState {
    /// A newer goal preempts whatever is still on screen.
    pub fn show(&mut self, trigger: CelebrationTrigger) {
        self.current = Some(trigger);
        self.ticks_left = CELEBRATION_TICKS;
    }

    /// Driven by the animation tick. Returns true when the overlay just
    /// closed so the caller can force a redraw.
    pub fn tick(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        self.ticks_left = self.ticks_left.saturating_sub(1);
        if self.ticks_left == 0 {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
        self.ticks_left = 0;
    }

    pub fn is_showing(&self) -> bool {
        self.current.is_some()
    }
}

// ---------------------------------------------------------------------------
// Teams view state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TeamsState {
    pub selected_team: usize,
    pub roster_scroll: u16,
    /// Trades involving the selected team, newest first.
    pub trades: Vec<TradeProposal>,
    /// Index into the pending subset of `trades`.
    pub selected_trade: usize,
    pub crest_input: String,
    pub prompting_crest: bool,
}

impl TeamsState {
    pub fn selected_team_id(&self, directory: &Directory) -> Option<String> {
        directory.teams.get(self.selected_team).map(|t| t.id.clone())
    }

    pub fn navigate_team_next(&mut self, team_count: usize) {
        if team_count == 0 {
            return;
        }
        self.selected_team = (self.selected_team + 1) % team_count;
        self.on_team_changed();
    }

    pub fn navigate_team_prev(&mut self, team_count: usize) {
        if team_count == 0 {
            return;
        }
        self.selected_team = (self.selected_team + team_count - 1) % team_count;
        self.on_team_changed();
    }

    fn on_team_changed(&mut self) {
        self.roster_scroll = 0;
        self.selected_trade = 0;
        // Stale until the next TradesLoaded response lands.
        self.trades.clear();
    }

    pub fn set_trades(&mut self, trades: Vec<TradeProposal>) {
        self.trades = trades;
        self.selected_trade = 0;
    }

    pub fn pending_trades(&self) -> Vec<&TradeProposal> {
        self.trades.iter().filter(|t| t.status == TradeStatus::Pending).collect()
    }

    pub fn selected_pending_trade(&self) -> Option<&TradeProposal> {
        self.pending_trades().get(self.selected_trade).copied()
    }

    pub fn navigate_trade_down(&mut self) {
        let max = self.pending_trades().len().saturating_sub(1);
        if self.selected_trade < max {
            self.selected_trade += 1;
        }
    }

    pub fn navigate_trade_up(&mut self) {
        self.selected_trade = self.selected_trade.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Standings view state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StandingsState {
    pub scroll_offset: u16,
}

// ---------------------------------------------------------------------------
// Trade wizard state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TradeStep {
    #[default]
    OfferedPlayer,
    CounterpartyTeam,
    RequestedPlayer,
    Confirm,
}

/// On-disk draft, so a half-built proposal survives a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeDraft {
    pub from_team: Option<String>,
    pub offered_player: Option<String>,
    pub to_team: Option<String>,
    pub requested_player: Option<String>,
}

#[derive(Debug, Default)]
pub struct TradeWizardState {
    pub step: TradeStep,
    pub draft: TradeDraft,
    /// Index into the option list the current step presents.
    pub selected: usize,
    pub completed: bool,
}

impl TradeWizardState {
    /// Start a proposal on behalf of `from_team` (the team the operator
    /// manages, or whichever team an admin picked on the Teams tab).
    pub fn begin(&mut self, from_team: String) {
        *self = Self::default();
        self.draft.from_team = Some(from_team);
    }

    pub fn choose(&mut self, id: String) {
        match self.step {
            TradeStep::OfferedPlayer => {
                self.draft.offered_player = Some(id);
                self.step = TradeStep::CounterpartyTeam;
            }
            TradeStep::CounterpartyTeam => {
                self.draft.to_team = Some(id);
                self.step = TradeStep::RequestedPlayer;
            }
            TradeStep::RequestedPlayer => {
                self.draft.requested_player = Some(id);
                self.step = TradeStep::Confirm;
                self.completed = true;
            }
            TradeStep::Confirm => {}
        }
        self.selected = 0;
    }

    /// Step back, clearing the choice being revisited.
    pub fn back(&mut self) {
        self.completed = false;
        self.step = match self.step {
            TradeStep::OfferedPlayer => TradeStep::OfferedPlayer,
            TradeStep::CounterpartyTeam => {
                self.draft.offered_player = None;
                TradeStep::OfferedPlayer
            }
            TradeStep::RequestedPlayer => {
                self.draft.to_team = None;
                TradeStep::CounterpartyTeam
            }
            TradeStep::Confirm => {
                self.draft.requested_player = None;
                TradeStep::RequestedPlayer
            }
        };
        self.selected = 0;
    }

    pub fn navigate_down(&mut self, option_count: usize) {
        let max = option_count.saturating_sub(1);
        if self.selected < max {
            self.selected += 1;
        }
    }

    pub fn navigate_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// `(from_team, to_team, offered, requested)` once every step is done.
    pub fn proposal(&self) -> Option<(String, String, String, String)> {
        Some((
            self.draft.from_team.clone()?,
            self.draft.to_team.clone()?,
            self.draft.offered_player.clone()?,
            self.draft.requested_player.clone()?,
        ))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resume a saved draft at its first unfilled step.
    pub fn apply_saved_draft(&mut self, draft: TradeDraft) {
        self.step = if draft.from_team.is_none() || draft.offered_player.is_none() {
            TradeStep::OfferedPlayer
        } else if draft.to_team.is_none() {
            TradeStep::CounterpartyTeam
        } else if draft.requested_player.is_none() {
            TradeStep::RequestedPlayer
        } else {
            TradeStep::Confirm
        };
        self.completed = self.step == TradeStep::Confirm;
        self.draft = draft;
        self.selected = 0;
    }
}

// ---------------------------------------------------------------------------
// Admin event entry state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStep {
    Team,
    Player,
    Assist,
}

/// The little team → player → (assist) picker an admin walks through after
/// pressing one of the event keys on a live match.
#[derive(Debug, Default)]
pub struct EventEntryState {
    pub kind: Option<EventKind>,
    pub team_id: Option<String>,
    pub player_id: Option<String>,
    pub selected: usize,
}

impl EventEntryState {
    pub fn begin(&mut self, kind: EventKind) {
        *self = Self::default();
        self.kind = Some(kind);
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_some()
    }

    pub fn step(&self) -> Option<EntryStep> {
        self.kind?;
        Some(if self.team_id.is_none() {
            EntryStep::Team
        } else if self.player_id.is_none() {
            EntryStep::Player
        } else {
            EntryStep::Assist
        })
    }

    pub fn choose_team(&mut self, team_id: String) {
        self.team_id = Some(team_id);
        self.selected = 0;
    }

    /// Cards and own goals are complete once the player is known; a goal
    /// stays open for the assist step.
    pub fn choose_player(&mut self, player_id: String) -> Option<EventDraft> {
        match self.kind {
            Some(EventKind::Goal) => {
                self.player_id = Some(player_id);
                self.selected = 0;
                None
            }
            Some(_) => {
                self.player_id = Some(player_id);
                self.finish(None)
            }
            None => None,
        }
    }

    pub fn choose_assist(&mut self, assist: String) -> Option<EventDraft> {
        self.finish(Some(assist))
    }

    pub fn skip_assist(&mut self) -> Option<EventDraft> {
        self.finish(None)
    }

    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    pub fn navigate_down(&mut self, option_count: usize) {
        let max = option_count.saturating_sub(1);
        if self.selected < max {
            self.selected += 1;
        }
    }

    pub fn navigate_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn finish(&mut self, assist: Option<String>) -> Option<EventDraft> {
        let kind = self.kind?;
        let draft = EventDraft {
            kind,
            team_id: self.team_id.clone()?,
            player_id: self.player_id.clone()?,
            assist_player_id: assist,
        };
        *self = Self::default();
        Some(draft)
    }
}

// ---------------------------------------------------------------------------
// Realtime feed status
// ---------------------------------------------------------------------------

/// Connection state of the realtime feed, shown in the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedStatus {
    #[default]
    Connecting,
    Connected,
    Reconnecting,
    /// Gave up for good; the periodic poll is the only update path now.
    Unavailable,
}

impl FeedStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FeedStatus::Connecting => "live: connecting",
            FeedStatus::Connected => "live",
            FeedStatus::Reconnecting => "live: reconnecting",
            FeedStatus::Unavailable => "live updates unavailable, refresh to update",
        }
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    /// Who is at the keyboard, resolved from the operator token at startup.
    pub actor: Actor,
    pub feed: FeedStatus,
    pub board: FixtureBoardState,
    pub match_view: MatchViewState,
    pub directory: Directory,
    pub teams: TeamsState,
    pub standings: StandingsState,
    pub trade_wizard: TradeWizardState,
    pub event_entry: EventEntryState,
    pub celebration: CelebrationState,
    pub dispatcher: LiveDispatcher,
    pub animation: AnimationState,
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cup_api::Half;

    fn fixture(id: &str, stage: Stage, status: FixtureStatus) -> Fixture {
        Fixture { id: id.into(), stage, status, ..Fixture::default() }
    }

    fn event(id: &str, fixture_id: &str, offset_secs: i64) -> MatchEvent {
        MatchEvent {
            id: id.into(),
            fixture_id: fixture_id.into(),
            kind: EventKind::Goal,
            team_id: "ax".into(),
            player_id: "p1".into(),
            assist_player_id: None,
            minute: 10,
            half: Half::First,
            created_at: Utc::now() + chrono::Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_detect_active_stage_prefers_live_play() {
        let fixtures = vec![
            fixture("f1", Stage::Group, FixtureStatus::Completed),
            fixture("f2", Stage::Quarter, FixtureStatus::Live),
            fixture("f3", Stage::Semi, FixtureStatus::Upcoming),
        ];
        assert_eq!(detect_active_stage(&fixtures), Stage::Quarter);
    }

    #[test]
    fn test_detect_active_stage_falls_back_to_last_completed() {
        let fixtures = vec![
            fixture("f1", Stage::Group, FixtureStatus::Completed),
            fixture("f2", Stage::Quarter, FixtureStatus::Completed),
            fixture("f3", Stage::Semi, FixtureStatus::Upcoming),
        ];
        assert_eq!(detect_active_stage(&fixtures), Stage::Quarter);

        assert_eq!(detect_active_stage(&[]), Stage::Group);
    }

    #[test]
    fn test_board_refresh_keeps_the_view_and_clamps_selection() {
        let mut board = FixtureBoardState::default();
        board.load(vec![
            fixture("f1", Stage::Group, FixtureStatus::Live),
            fixture("f2", Stage::Group, FixtureStatus::Upcoming),
        ]);
        board.navigate_fixture_down();
        assert_eq!(board.selected_fixture, 1);

        board.refresh(vec![fixture("f1", Stage::Group, FixtureStatus::Live)]);
        assert_eq!(board.view_stage, Stage::Group);
        assert_eq!(board.selected_fixture, 0);
        assert_eq!(board.selected_fixture_id().as_deref(), Some("f1"));
    }

    #[test]
    fn test_match_view_dedups_and_orders_inserted_events() {
        let mut view = MatchViewState::default();
        view.load(fixture("f1", Stage::Group, FixtureStatus::Live), vec![event("e2", "f1", 60)]);

        assert!(view.insert_event(event("e1", "f1", 0)));
        assert!(!view.insert_event(event("e1", "f1", 0)));
        assert!(!view.insert_event(event("e9", "f2", 0)));

        let order: Vec<&str> = view.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["e1", "e2"]);
        assert!(view.is_fresh("e1"));
        assert!(!view.is_fresh("e2"));
    }

    #[test]
    fn test_celebration_preempts_and_auto_dismisses() {
        let mut celebration = CelebrationState::default();
        let trigger = CelebrationTrigger {
            fixture_id: "f1".into(),
            kind: EventKind::Goal,
            team_name: "Albion".into(),
            player_name: "Okafor".into(),
            player_rank: cup_api::RankTier::Gold,
            assist_name: None,
            minute: 12,
        };
        celebration.show(trigger.clone());
        for _ in 0..10 {
            assert!(!celebration.tick());
        }
        assert!(celebration.is_showing());

        // A second goal restarts the clock.
        celebration.show(CelebrationTrigger { minute: 14, ..trigger });
        for _ in 0..CELEBRATION_TICKS - 1 {
            assert!(!celebration.tick());
        }
        assert!(celebration.tick());
        assert!(!celebration.is_showing());
        assert!(!celebration.tick());
    }

    #[test]
    fn test_trade_wizard_walks_to_confirm() {
        let mut wizard = TradeWizardState::default();
        wizard.begin("ax".into());
        assert_eq!(wizard.step, TradeStep::OfferedPlayer);

        wizard.choose("p1".into());
        wizard.choose("bx".into());
        wizard.choose("p9".into());
        assert_eq!(wizard.step, TradeStep::Confirm);
        assert!(wizard.completed);
        assert_eq!(
            wizard.proposal(),
            Some(("ax".into(), "bx".into(), "p1".into(), "p9".into()))
        );

        wizard.back();
        assert_eq!(wizard.step, TradeStep::RequestedPlayer);
        assert!(wizard.proposal().is_none());
    }

    #[test]
    fn test_trade_wizard_resumes_saved_draft() {
        let mut wizard = TradeWizardState::default();
        wizard.apply_saved_draft(TradeDraft {
            from_team: Some("ax".into()),
            offered_player: Some("p1".into()),
            to_team: Some("bx".into()),
            requested_player: None,
        });
        assert_eq!(wizard.step, TradeStep::RequestedPlayer);
        assert!(!wizard.completed);
    }

    #[test]
    fn test_event_entry_goal_waits_for_assist() {
        let mut entry = EventEntryState::default();
        entry.begin(EventKind::Goal);
        assert_eq!(entry.step(), Some(EntryStep::Team));

        entry.choose_team("ax".into());
        assert_eq!(entry.step(), Some(EntryStep::Player));
        assert!(entry.choose_player("p1".into()).is_none());
        assert_eq!(entry.step(), Some(EntryStep::Assist));

        let draft = entry.choose_assist("p2".into()).unwrap();
        assert_eq!(draft.kind, EventKind::Goal);
        assert_eq!(draft.assist_player_id.as_deref(), Some("p2"));
        assert!(!entry.is_active());
    }

    #[test]
    fn test_event_entry_card_finishes_without_assist() {
        let mut entry = EventEntryState::default();
        entry.begin(EventKind::YellowCard);
        entry.choose_team("bx".into());
        let draft = entry.choose_player("p7".into()).unwrap();
        assert_eq!(draft.kind, EventKind::YellowCard);
        assert!(draft.assist_player_id.is_none());
    }

    #[test]
    fn test_pending_trade_selection_skips_resolved_rows() {
        let mut teams = TeamsState::default();
        let trade = |id: &str, status: TradeStatus| TradeProposal {
            id: id.into(),
            from_team: "ax".into(),
            to_team: "bx".into(),
            offered_player: "p1".into(),
            requested_player: "p9".into(),
            status,
            created_at: Utc::now(),
        };
        teams.set_trades(vec![
            trade("t1", TradeStatus::Accepted),
            trade("t2", TradeStatus::Pending),
            trade("t3", TradeStatus::Pending),
        ]);
        assert_eq!(teams.selected_pending_trade().map(|t| t.id.as_str()), Some("t2"));
        teams.navigate_trade_down();
        assert_eq!(teams.selected_pending_trade().map(|t| t.id.as_str()), Some("t3"));
        teams.navigate_trade_down();
        assert_eq!(teams.selected_pending_trade().map(|t| t.id.as_str()), Some("t3"));
    }
}
