mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::live::{LiveCommand, LiveEvent, LiveWorker};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use cup_api::client;
use log::error;
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

const LIVE_WS_ENV: &str = "CUPTUI_LIVE_WS";
const DEFAULT_LIVE_WS: &str = "ws://127.0.0.1:8787";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = handle_cli_args();

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal();

    tui_logger::init_logger(log::LevelFilter::Info)?;
    tui_logger::set_default_level(log::LevelFilter::Info);

    let mut app = App::new();
    app.settings.full_screen = cli.full_screen;
    let app = Arc::new(Mutex::new(app));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);
    let (live_cmd_tx, live_cmd_rx) = mpsc::channel::<LiveCommand>(100);
    let (live_evt_tx, live_evt_rx) = mpsc::channel::<LiveEvent>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Live feed thread
    let live_worker = LiveWorker {
        url: std::env::var(LIVE_WS_ENV).unwrap_or_else(|_| DEFAULT_LIVE_WS.to_string()),
        commands: live_cmd_rx,
        events: live_evt_tx,
    };
    let live_task = tokio::spawn(live_worker.run());

    // Periodic fixture refresh thread (every 30s)
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone());
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Animation tick thread, 80ms
    let anim_tx = ui_event_tx.clone();
    let animation_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(80));
        loop {
            interval.tick().await;
            if anim_tx.send(UiEvent::AnimationTick).await.is_err() {
                break;
            }
        }
    });

    // Load the board on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(
        terminal,
        app,
        ui_event_rx,
        network_req_tx,
        network_resp_rx,
        live_cmd_tx,
        live_evt_rx,
    )
    .await;

    input_handler.abort();
    network_task.abort();
    live_task.abort();
    periodic_task.abort();
    animation_task.abort();

    Ok(())
}

struct CliArgs {
    full_screen: bool,
}

fn handle_cli_args() -> CliArgs {
    let mut cli = CliArgs { full_screen: false };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", usage_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("cuptui {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "-f" | "--full-screen" => cli.full_screen = true,
            _ => {
                eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
                std::process::exit(2);
            }
        }
    }
    cli
}

fn usage_text() -> &'static str {
    "cuptui - tournament operations terminal UI

Usage:
  cuptui [-f | --full-screen]
  cuptui --help
  cuptui --version

Environment:
  CUPTUI_BACKEND_URL    Backend base URL (default http://127.0.0.1:54321)
  CUPTUI_BACKEND_KEY    Backend API key
  CUPTUI_TOKEN          Operator token; omit to browse as a viewer
  CUPTUI_FIXTURES_JSON  Path or URL of an offline board snapshot
  CUPTUI_LIVE_WS        Live feed relay URL (default ws://127.0.0.1:8787)
  CUPTUI_LOG            Log pane verbosity: off|error|warn|info|debug|trace"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    live_commands: mpsc::Sender<LiveCommand>,
    mut live_events: mpsc::Receiver<LiveEvent>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests, &live_commands).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &live_commands, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(live_event) = live_events.recv() => {
                let should_redraw = handle_live_event(live_event, &app, &network_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    live_commands: &mpsc::Sender<LiveCommand>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let _ = network_requests.send(NetworkRequest::LoadBoard).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests, live_commands).await;
            true
        }
        UiEvent::Resize => true,
        UiEvent::AnimationTick => {
            let mut guard = app.lock().await;
            guard.advance_animation(crate::components::celebration::FRAME_COUNT);
            true
        }
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    live_commands: &mpsc::Sender<LiveCommand>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::BoardLoaded { snapshot, actor } => {
            let mut guard = app.lock().await;
            guard.on_board_loaded(snapshot, actor);
        }
        NetworkResponse::FixturesRefreshed { fixtures } => {
            let mut guard = app.lock().await;
            guard.on_fixtures_refreshed(fixtures);
        }
        NetworkResponse::MatchLoaded { fixture, events } => {
            let mut guard = app.lock().await;
            guard.on_match_loaded(fixture, events);
        }
        NetworkResponse::TimelineReconciled { fixture_id, events } => {
            let mut guard = app.lock().await;
            guard.on_timeline_reconciled(fixture_id, events);
        }
        NetworkResponse::FixtureSaved { fixture, appended } => {
            let _ = live_commands
                .send(LiveCommand::Publish(client::fixture_update_frame(&fixture)))
                .await;
            if let Some(event) = appended.as_ref() {
                let _ = live_commands
                    .send(LiveCommand::Publish(client::event_insert_frame(event)))
                    .await;
            }
            let mut guard = app.lock().await;
            guard.on_fixture_saved(fixture, appended);
        }
        NetworkResponse::TradesLoaded { team_id, trades } => {
            let mut guard = app.lock().await;
            guard.on_trades_loaded(team_id, trades);
        }
        NetworkResponse::TradeSaved { team_id } => {
            let mut guard = app.lock().await;
            guard.on_trade_saved();
            drop(guard);
            let _ = network_requests.send(NetworkRequest::LoadTrades { team_id }).await;
        }
        NetworkResponse::CrestUploaded { team_id, url } => {
            let mut guard = app.lock().await;
            guard.on_crest_uploaded(team_id, url);
        }
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            let mut guard = app.lock().await;
            guard.on_error(message);
        }
    }
    !loading.is_loading
}

async fn handle_live_event(
    event: LiveEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match event {
        LiveEvent::Connected => {
            let mut guard = app.lock().await;
            let reconcile = guard.on_live_connected();
            drop(guard);
            if let Some((fixture_id, since)) = reconcile {
                let _ = network_requests
                    .send(NetworkRequest::ReconcileTimeline { fixture_id, since })
                    .await;
            }
        }
        LiveEvent::Disconnected => {
            let mut guard = app.lock().await;
            guard.on_live_disconnected();
        }
        LiveEvent::Change(change) => {
            let mut guard = app.lock().await;
            guard.on_live_change(change);
        }
        LiveEvent::RetriesExhausted => {
            let mut guard = app.lock().await;
            guard.on_live_retries_exhausted();
        }
        LiveEvent::Error(message) => {
            let mut guard = app.lock().await;
            guard.on_live_error(message);
        }
    }
    true
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide).unwrap();
    execute!(stdout, terminal::EnterAlternateScreen).unwrap();
    execute!(stdout, terminal::Clear(terminal::ClearType::All)).unwrap();
    terminal::enable_raw_mode().unwrap();
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::MoveTo(0, 0)).unwrap();
    execute!(stdout, terminal::Clear(terminal::ClearType::All)).unwrap();
    execute!(stdout, terminal::LeaveAlternateScreen).unwrap();
    execute!(stdout, cursor::Show).unwrap();
    terminal::disable_raw_mode().unwrap();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
