use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, EntryStep, FeedStatus, TradeDraft, TradeStep};
use crate::state::dispatcher::LiveTrigger;
use crate::state::messages::Directory;
use chrono::{DateTime, Utc};
use cup_api::phase::{Phase, PhaseAction};
use cup_api::realtime::Change;
use cup_api::timeline::EventDraft;
use cup_api::{Actor, EventKind, Fixture, MatchEvent, Snapshot, TradeProposal};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Fixtures,
    Match,
    Teams,
    Standings,
    TradeWizard,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new() -> Self {
        let settings = AppSettings::load();

        let app = Self {
            state: AppState::default(),
            settings,
        };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_board_loaded(&mut self, snapshot: Snapshot, actor: Actor) {
        self.state.last_error = None;
        self.state.actor = actor;
        self.state.directory = Directory {
            teams: snapshot.teams,
            players: snapshot.players,
        };
        self.state.board.load(snapshot.fixtures);
    }

    pub fn on_fixtures_refreshed(&mut self, fixtures: Vec<Fixture>) {
        let open = self.state.match_view.fixture_id().map(str::to_string);
        if let Some(id) = open
            && let Some(row) = fixtures.iter().find(|f| f.id == id)
        {
            self.state.match_view.apply_fixture(row.clone());
        }
        self.state.board.refresh(fixtures);
    }

    pub fn on_match_loaded(&mut self, fixture: Fixture, events: Vec<MatchEvent>) {
        // A response for a match the viewer already closed is dropped.
        if self.state.dispatcher.watched_fixture_id() != Some(fixture.id.as_str()) {
            return;
        }
        self.state.last_error = None;
        self.state.dispatcher.prime(&events);
        self.state.board.apply_update(fixture.clone());
        self.state.match_view.load(fixture, events);
    }

    pub fn on_timeline_reconciled(&mut self, fixture_id: String, events: Vec<MatchEvent>) {
        let triggers =
            self.state.dispatcher.reconcile(&fixture_id, events, &self.state.directory);
        for trigger in triggers {
            self.apply_trigger(trigger);
        }
    }

    /// An admin write came back. The echoed fixture is authoritative, and an
    /// appended event runs through the same gate as the feed, so the relay
    /// echoing it back later cannot double-count it.
    pub fn on_fixture_saved(&mut self, fixture: Fixture, appended: Option<MatchEvent>) {
        self.state.last_error = None;
        self.state.board.apply_update(fixture.clone());
        self.state.match_view.apply_fixture(fixture);
        if let Some(event) = appended {
            let fixture_id = event.fixture_id.clone();
            let triggers =
                self.state.dispatcher.reconcile(&fixture_id, vec![event], &self.state.directory);
            for trigger in triggers {
                self.apply_trigger(trigger);
            }
        }
    }

    pub fn on_trades_loaded(&mut self, team_id: String, trades: Vec<TradeProposal>) {
        // A response for a team the operator has already moved off of is stale.
        if self.selected_team_id() == Some(team_id) {
            self.state.teams.set_trades(trades);
        }
    }

    pub fn on_trade_saved(&mut self) {
        self.state.last_error = None;
        if self.state.trade_wizard.completed {
            self.state.trade_wizard.reset();
            let _ = std::fs::remove_file(trade_draft_path());
            if self.state.active_tab == MenuItem::TradeWizard {
                self.update_tab(MenuItem::Teams);
            }
        }
    }

    pub fn on_crest_uploaded(&mut self, team_id: String, url: String) {
        self.state.last_error = None;
        if let Some(team) = self.state.directory.teams.iter_mut().find(|t| t.id == team_id) {
            team.crest_url = Some(url);
        }
    }

    pub fn on_error(&mut self, message: String) {
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Live feed handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_live_change(&mut self, change: Change) {
        if let Some(trigger) = self.state.dispatcher.on_change(change, &self.state.directory) {
            self.apply_trigger(trigger);
        }
    }

    /// On (re)connect: if a match is open, the caller should fetch everything
    /// since the last event we saw, in case rows landed while the socket was
    /// down. Returns the fixture to reconcile and where to start.
    pub fn on_live_connected(&mut self) -> Option<(String, Option<DateTime<Utc>>)> {
        self.state.feed = FeedStatus::Connected;
        let fixture_id = self.state.dispatcher.watched_fixture_id()?.to_string();
        Some((fixture_id, self.state.dispatcher.catch_up_since()))
    }

    pub fn on_live_disconnected(&mut self) {
        if self.state.feed == FeedStatus::Connected {
            log::warn!("live feed dropped, reconnecting");
        }
        self.state.feed = FeedStatus::Reconnecting;
    }

    pub fn on_live_retries_exhausted(&mut self) {
        self.state.feed = FeedStatus::Unavailable;
        log::warn!("live feed unavailable; scores now update on the 30s poll only");
    }

    pub fn on_live_error(&mut self, message: String) {
        log::warn!("live feed error: {message}");
    }

    fn apply_trigger(&mut self, trigger: LiveTrigger) {
        match trigger {
            LiveTrigger::Celebration { event, banner } => {
                self.state.match_view.insert_event(event);
                self.state.celebration.show(banner);
            }
            LiveTrigger::TimelineUpdate { event } => {
                self.state.match_view.insert_event(event);
            }
            LiveTrigger::FixtureChanged { fixture } => {
                self.state.board.apply_update(fixture.clone());
                self.state.match_view.apply_fixture(fixture);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if self.state.active_tab == MenuItem::TradeWizard {
            self.start_trade_wizard();
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Fixture board navigation, delegated to FixtureBoardState
    // -----------------------------------------------------------------------

    pub fn board_next_stage(&mut self) {
        self.state.board.navigate_stage_next();
    }

    pub fn board_prev_stage(&mut self) {
        self.state.board.navigate_stage_prev();
    }

    pub fn board_fixture_down(&mut self) {
        self.state.board.navigate_fixture_down();
    }

    pub fn board_fixture_up(&mut self) {
        self.state.board.navigate_fixture_up();
    }

    /// Returns the fixture id if the user pressed Enter on a row. Switches to
    /// the Match tab and scopes the live feed to that fixture as side-effects.
    pub fn open_selected_match(&mut self) -> Option<String> {
        let fixture_id = self.state.board.selected_fixture_id()?;
        if let Some(row) = self.state.board.fixtures.iter().find(|f| f.id == fixture_id) {
            self.state.dispatcher.watch(row);
        }
        self.update_tab(MenuItem::Match);
        Some(fixture_id)
    }

    /// Leaves the match view. Returns the fixture id the feed should drop.
    pub fn close_match(&mut self) -> Option<String> {
        let fixture_id = self.state.match_view.fixture_id().map(str::to_string);
        self.state.match_view.unmount();
        self.state.dispatcher.unwatch();
        self.state.event_entry.cancel();
        self.state.celebration.dismiss();
        self.update_tab(MenuItem::Fixtures);
        fixture_id
    }

    // -----------------------------------------------------------------------
    // Animation tick, fired every 80ms
    // -----------------------------------------------------------------------

    pub fn advance_animation(&mut self, frame_count: usize) {
        self.state.animation.advance(frame_count);
        self.state.celebration.tick();
    }

    // -----------------------------------------------------------------------
    // Admin match operation
    // -----------------------------------------------------------------------

    /// The transition the `s` key means right now: kickoff from scheduled,
    /// second-half kickoff from the break.
    pub fn start_action(&self) -> Option<PhaseAction> {
        let fixture = self.state.match_view.fixture.as_ref()?;
        match fixture.phase() {
            Phase::Scheduled => Some(PhaseAction::Start),
            Phase::HalfTime => Some(PhaseAction::StartSecondHalf),
            _ => None,
        }
    }

    /// `(fixture_id, action)` ready to send, if the operator may run matches.
    pub fn transition(&self, action: PhaseAction) -> Option<(String, PhaseAction)> {
        if !self.state.actor.is_admin() {
            return None;
        }
        let fixture_id = self.state.match_view.fixture_id()?.to_string();
        Some((fixture_id, action))
    }

    pub fn begin_event_entry(&mut self, kind: EventKind) {
        if !self.state.actor.is_admin() || self.state.match_view.fixture.is_none() {
            return;
        }
        self.state.event_entry.begin(kind);
    }

    /// Options the current entry step presents, as `(id, label)` pairs.
    pub fn event_entry_options(&self) -> Vec<(String, String)> {
        let Some(step) = self.state.event_entry.step() else {
            return Vec::new();
        };
        let Some(fixture) = &self.state.match_view.fixture else {
            return Vec::new();
        };
        let directory = &self.state.directory;
        match step {
            EntryStep::Team => [&fixture.team_a, &fixture.team_b]
                .into_iter()
                .map(|id| (id.clone(), directory.team_name(id)))
                .collect(),
            EntryStep::Player => {
                let Some(team_id) = &self.state.event_entry.team_id else {
                    return Vec::new();
                };
                directory
                    .roster(team_id)
                    .into_iter()
                    .map(|p| (p.id.clone(), p.name.clone()))
                    .collect()
            }
            EntryStep::Assist => {
                let Some(team_id) = &self.state.event_entry.team_id else {
                    return Vec::new();
                };
                directory
                    .roster(team_id)
                    .into_iter()
                    .filter(|p| Some(&p.id) != self.state.event_entry.player_id.as_ref())
                    .map(|p| (p.id.clone(), p.name.clone()))
                    .collect()
            }
        }
    }

    /// Confirm the highlighted option. Returns a draft once the walk is done.
    pub fn event_entry_select(&mut self) -> Option<EventDraft> {
        let options = self.event_entry_options();
        let (id, _) = options.get(self.state.event_entry.selected)?.clone();
        match self.state.event_entry.step()? {
            EntryStep::Team => {
                self.state.event_entry.choose_team(id);
                None
            }
            EntryStep::Player => self.state.event_entry.choose_player(id),
            EntryStep::Assist => self.state.event_entry.choose_assist(id),
        }
    }

    /// `n` on the assist step records the goal unassisted.
    pub fn event_entry_skip_assist(&mut self) -> Option<EventDraft> {
        if self.state.event_entry.step() == Some(EntryStep::Assist) {
            self.state.event_entry.skip_assist()
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Teams and trades
    // -----------------------------------------------------------------------

    pub fn teams_next(&mut self) {
        let count = self.state.directory.teams.len();
        self.state.teams.navigate_team_next(count);
    }

    pub fn teams_prev(&mut self) {
        let count = self.state.directory.teams.len();
        self.state.teams.navigate_team_prev(count);
    }

    pub fn selected_team_id(&self) -> Option<String> {
        self.state.teams.selected_team_id(&self.state.directory)
    }

    /// `(trade_id, team_id)` for an accept/reject on the highlighted pending
    /// trade. The server still decides whether this operator may resolve it.
    pub fn resolve_selected_trade(&self) -> Option<(String, String)> {
        if !self.state.actor.can_trade() {
            return None;
        }
        let trade = self.state.teams.selected_pending_trade()?;
        let trade_id = trade.id.clone();
        let team_id = self.selected_team_id()?;
        Some((trade_id, team_id))
    }

    pub fn begin_crest_prompt(&mut self) {
        if !self.state.actor.is_admin() || self.selected_team_id().is_none() {
            return;
        }
        self.state.teams.prompting_crest = true;
        self.state.teams.crest_input.clear();
    }

    pub fn crest_prompt_char(&mut self, c: char) {
        self.state.teams.crest_input.push(c);
    }

    pub fn crest_prompt_backspace(&mut self) {
        self.state.teams.crest_input.pop();
    }

    pub fn cancel_crest_prompt(&mut self) {
        self.state.teams.prompting_crest = false;
        self.state.teams.crest_input.clear();
    }

    /// `(team_id, path)` for the upload, if the typed path is non-empty.
    pub fn take_crest_prompt(&mut self) -> Option<(String, String)> {
        let team_id = self.selected_team_id()?;
        let path = self.state.teams.crest_input.trim().to_string();
        self.cancel_crest_prompt();
        if path.is_empty() {
            return None;
        }
        Some((team_id, path))
    }

    // -----------------------------------------------------------------------
    // Trade wizard
    // -----------------------------------------------------------------------

    pub fn start_trade_wizard(&mut self) {
        let Some(team_id) = self.selected_team_id() else {
            self.state.last_error = Some("Pick a team on the Teams tab first".to_string());
            return;
        };
        self.state.trade_wizard.begin(team_id.clone());
        // A saved draft only resumes for the team it was started for.
        if let Ok(saved) = self.load_trade_draft_file()
            && saved.from_team.as_deref() == Some(team_id.as_str())
        {
            self.state.trade_wizard.apply_saved_draft(saved);
        }
    }

    /// Options the current wizard step presents, as `(id, label)` pairs.
    pub fn wizard_options(&self) -> Vec<(String, String)> {
        let wizard = &self.state.trade_wizard;
        let directory = &self.state.directory;
        match wizard.step {
            TradeStep::OfferedPlayer => {
                let Some(team_id) = &wizard.draft.from_team else {
                    return Vec::new();
                };
                directory
                    .roster(team_id)
                    .into_iter()
                    .map(|p| (p.id.clone(), p.name.clone()))
                    .collect()
            }
            TradeStep::CounterpartyTeam => directory
                .teams
                .iter()
                .filter(|t| Some(&t.id) != wizard.draft.from_team.as_ref())
                .map(|t| (t.id.clone(), t.name.clone()))
                .collect(),
            TradeStep::RequestedPlayer => {
                let Some(team_id) = &wizard.draft.to_team else {
                    return Vec::new();
                };
                directory
                    .roster(team_id)
                    .into_iter()
                    .map(|p| (p.id.clone(), p.name.clone()))
                    .collect()
            }
            TradeStep::Confirm => Vec::new(),
        }
    }

    pub fn wizard_select(&mut self) {
        let options = self.wizard_options();
        let Some((id, _)) = options.get(self.state.trade_wizard.selected) else {
            return;
        };
        self.state.trade_wizard.choose(id.clone());
        if let Err(err) = self.save_trade_draft_file() {
            log::warn!("saving trade draft failed: {err}");
        }
    }

    pub fn wizard_back(&mut self) {
        self.state.trade_wizard.back();
    }

    /// `(from_team, to_team, offered, requested)` ready to send, if the
    /// wizard is complete and the operator may trade.
    pub fn submit_trade(&self) -> Option<(String, String, String, String)> {
        if !self.state.actor.can_trade() {
            return None;
        }
        self.state.trade_wizard.proposal()
    }

    /// `n` on the confirm step throws the proposal away and starts over.
    pub fn restart_trade_wizard(&mut self) {
        if let Some(team_id) = self.state.trade_wizard.draft.from_team.clone() {
            let _ = std::fs::remove_file(trade_draft_path());
            self.state.trade_wizard.begin(team_id);
        }
    }

    pub fn save_trade_draft_file(&self) -> Result<(), String> {
        let path = trade_draft_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("create dir failed: {e}"))?;
        }
        let payload = serde_json::to_string_pretty(&self.state.trade_wizard.draft)
            .map_err(|e| format!("serialize draft failed: {e}"))?;
        std::fs::write(&path, payload).map_err(|e| format!("write draft failed: {e}"))?;
        Ok(())
    }

    pub fn load_trade_draft_file(&self) -> Result<TradeDraft, String> {
        let path = trade_draft_path();
        let content =
            std::fs::read_to_string(&path).map_err(|e| format!("read draft failed: {e}"))?;
        serde_json::from_str::<TradeDraft>(&content)
            .map_err(|e| format!("parse draft failed: {e}"))
    }
}

fn trade_draft_path() -> PathBuf {
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
        && !config_dir.trim().is_empty()
    {
        return PathBuf::from(config_dir).join("cuptui").join("trade_draft.json");
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home)
            .join(".config")
            .join("cuptui")
            .join("trade_draft.json");
    }
    PathBuf::from("trade_draft.json")
}
