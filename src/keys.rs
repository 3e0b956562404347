use crate::app::{App, MenuItem};
use crate::state::live::LiveCommand;
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use cup_api::phase::PhaseAction;
use cup_api::{EventKind, TradeStatus};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    live_commands: &mpsc::Sender<LiveCommand>,
) {
    let mut guard = app.lock().await;
    let mut refresh_trades = false;

    // The crest path prompt swallows everything except Ctrl-C while open.
    if guard.state.active_tab == MenuItem::Teams && guard.state.teams.prompting_crest {
        match (key_event.code, key_event.modifiers) {
            (Char('c'), KeyModifiers::CONTROL) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (KeyCode::Enter, _) => {
                if let Some((team_id, path)) = guard.take_crest_prompt() {
                    drop(guard);
                    let _ = network_requests
                        .send(NetworkRequest::UploadCrest { team_id, path })
                        .await;
                }
            }
            (KeyCode::Esc, _) => guard.cancel_crest_prompt(),
            (KeyCode::Backspace, _) => guard.crest_prompt_backspace(),
            (Char(c), _) => guard.crest_prompt_char(c),
            _ => {}
        }
        return;
    }

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Fixtures),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Match),
        (_, Char('3'), _) => {
            guard.update_tab(MenuItem::Teams);
            refresh_trades = true;
        }
        (_, Char('4'), _) => guard.update_tab(MenuItem::Standings),
        (_, Char('5'), _) => guard.update_tab(MenuItem::TradeWizard),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Full refresh
        (_, Char('R'), _) => {
            drop(guard);
            let _ = network_requests.send(NetworkRequest::LoadBoard).await;
            return;
        }

        // Fixture board navigation
        (MenuItem::Fixtures, Char('l') | KeyCode::Right, _) => guard.board_next_stage(),
        (MenuItem::Fixtures, Char('h') | KeyCode::Left, _) => guard.board_prev_stage(),
        (MenuItem::Fixtures, Char('j') | KeyCode::Down, _) => guard.board_fixture_down(),
        (MenuItem::Fixtures, Char('k') | KeyCode::Up, _) => guard.board_fixture_up(),
        (MenuItem::Fixtures, KeyCode::Enter, _) => {
            if let Some(fixture_id) = guard.open_selected_match() {
                drop(guard);
                let _ = live_commands
                    .send(LiveCommand::Watch { fixture_id: fixture_id.clone() })
                    .await;
                let _ = network_requests
                    .send(NetworkRequest::LoadMatch { fixture_id })
                    .await;
                return;
            }
        }

        // Match view. j/k drive the event entry picker while it is open,
        // the timeline otherwise.
        (MenuItem::Match, Char('j') | KeyCode::Down, _) => {
            if guard.state.event_entry.is_active() {
                let count = guard.event_entry_options().len();
                guard.state.event_entry.navigate_down(count);
            } else {
                guard.state.match_view.scroll_down();
            }
        }
        (MenuItem::Match, Char('k') | KeyCode::Up, _) => {
            if guard.state.event_entry.is_active() {
                guard.state.event_entry.navigate_up();
            } else {
                guard.state.match_view.scroll_up();
            }
        }
        (MenuItem::Match, KeyCode::Enter, _) => {
            if let Some(draft) = guard.event_entry_select()
                && let Some(fixture_id) =
                    guard.state.match_view.fixture_id().map(str::to_string)
            {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::AppendEvent { fixture_id, draft })
                    .await;
                return;
            }
        }
        (MenuItem::Match, Char('n'), _) => {
            if let Some(draft) = guard.event_entry_skip_assist()
                && let Some(fixture_id) =
                    guard.state.match_view.fixture_id().map(str::to_string)
            {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::AppendEvent { fixture_id, draft })
                    .await;
                return;
            }
        }
        (MenuItem::Match, KeyCode::Esc, _) => {
            if guard.state.celebration.is_showing() {
                guard.state.celebration.dismiss();
            } else if guard.state.event_entry.is_active() {
                guard.state.event_entry.cancel();
            } else if let Some(fixture_id) = guard.close_match() {
                drop(guard);
                let _ = live_commands.send(LiveCommand::Unwatch { fixture_id }).await;
                return;
            }
        }

        // Admin match transitions, no-ops for viewers
        (MenuItem::Match, Char('s'), _) => {
            if let Some(action) = guard.start_action()
                && let Some((fixture_id, action)) = guard.transition(action)
            {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ApplyTransition { fixture_id, action })
                    .await;
                return;
            }
        }
        (MenuItem::Match, Char('p'), _) => {
            if let Some((fixture_id, action)) = guard.transition(PhaseAction::Pause) {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ApplyTransition { fixture_id, action })
                    .await;
                return;
            }
        }
        (MenuItem::Match, Char('r'), _) => {
            if let Some((fixture_id, action)) = guard.transition(PhaseAction::Resume) {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ApplyTransition { fixture_id, action })
                    .await;
                return;
            }
        }
        (MenuItem::Match, Char('t'), _) => {
            if let Some((fixture_id, action)) = guard.transition(PhaseAction::EnterHalfTime) {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ApplyTransition { fixture_id, action })
                    .await;
                return;
            }
        }
        (MenuItem::Match, Char('e'), _) => {
            if let Some((fixture_id, action)) = guard.transition(PhaseAction::End) {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ApplyTransition { fixture_id, action })
                    .await;
                return;
            }
        }
        (MenuItem::Match, Char('g'), _) => guard.begin_event_entry(EventKind::Goal),
        (MenuItem::Match, Char('o'), _) => guard.begin_event_entry(EventKind::OwnGoal),
        (MenuItem::Match, Char('y'), _) => guard.begin_event_entry(EventKind::YellowCard),
        (MenuItem::Match, Char('x'), _) => guard.begin_event_entry(EventKind::RedCard),

        // Teams
        (MenuItem::Teams, Char('l') | KeyCode::Right, _) => {
            guard.teams_next();
            refresh_trades = true;
        }
        (MenuItem::Teams, Char('h') | KeyCode::Left, _) => {
            guard.teams_prev();
            refresh_trades = true;
        }
        (MenuItem::Teams, Char('j') | KeyCode::Down, _) => {
            guard.state.teams.roster_scroll = guard.state.teams.roster_scroll.saturating_add(1);
        }
        (MenuItem::Teams, Char('k') | KeyCode::Up, _) => {
            guard.state.teams.roster_scroll = guard.state.teams.roster_scroll.saturating_sub(1);
        }
        (MenuItem::Teams, Char('J'), _) => guard.state.teams.navigate_trade_down(),
        (MenuItem::Teams, Char('K'), _) => guard.state.teams.navigate_trade_up(),
        (MenuItem::Teams, Char('a'), _) => {
            if let Some((trade_id, team_id)) = guard.resolve_selected_trade() {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ResolveTrade {
                        trade_id,
                        team_id,
                        status: TradeStatus::Accepted,
                    })
                    .await;
                return;
            }
        }
        (MenuItem::Teams, Char('x'), _) => {
            if let Some((trade_id, team_id)) = guard.resolve_selected_trade() {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ResolveTrade {
                        trade_id,
                        team_id,
                        status: TradeStatus::Rejected,
                    })
                    .await;
                return;
            }
        }
        (MenuItem::Teams, Char('u'), _) => guard.begin_crest_prompt(),
        (MenuItem::Teams, Char('T'), _) => guard.update_tab(MenuItem::TradeWizard),

        // Standings
        (MenuItem::Standings, Char('j') | KeyCode::Down, _) => {
            guard.state.standings.scroll_offset =
                guard.state.standings.scroll_offset.saturating_add(1);
        }
        (MenuItem::Standings, Char('k') | KeyCode::Up, _) => {
            guard.state.standings.scroll_offset =
                guard.state.standings.scroll_offset.saturating_sub(1);
        }

        // Trade wizard
        (MenuItem::TradeWizard, Char('j') | KeyCode::Down, _) => {
            let count = guard.wizard_options().len();
            guard.state.trade_wizard.navigate_down(count);
        }
        (MenuItem::TradeWizard, Char('k') | KeyCode::Up, _) => {
            guard.state.trade_wizard.navigate_up();
        }
        (MenuItem::TradeWizard, KeyCode::Enter, _) => guard.wizard_select(),
        (MenuItem::TradeWizard, KeyCode::Esc, _) => guard.wizard_back(),
        (MenuItem::TradeWizard, Char('y'), _) => {
            if let Some((from_team, to_team, offered, requested)) = guard.submit_trade() {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::ProposeTrade { from_team, to_team, offered, requested })
                    .await;
                return;
            }
        }
        (MenuItem::TradeWizard, Char('n'), _) => guard.restart_trade_wizard(),

        // Global
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }

    if refresh_trades
        && let Some(team_id) = guard.selected_team_id()
    {
        drop(guard);
        let _ = network_requests
            .send(NetworkRequest::LoadTrades { team_id })
            .await;
    }
}
