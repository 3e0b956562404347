use crate::state::messages::{NetworkRequest, NetworkResponse};
use chrono::Utc;
use cup_api::client::{ApiError, CupApi};
use cup_api::phase::{self, PhaseAction};
use cup_api::timeline::{self, EventDraft};
use cup_api::{Actor, Snapshot, TradeStatus};
use log::{debug, error, warn};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

const BACKEND_URL_ENV: &str = "CUPTUI_BACKEND_URL";
const BACKEND_KEY_ENV: &str = "CUPTUI_BACKEND_KEY";
const TOKEN_ENV: &str = "CUPTUI_TOKEN";
const SNAPSHOT_ENV: &str = "CUPTUI_FIXTURES_JSON";

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

pub struct NetworkWorker {
    client: CupApi,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            client: backend_from_env(),
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.start_loading_animation().await;

            let result = match request {
                NetworkRequest::LoadBoard => self.handle_load_board().await,
                NetworkRequest::RefreshFixtures => self.handle_refresh_fixtures().await,
                NetworkRequest::LoadMatch { fixture_id } => {
                    self.handle_load_match(fixture_id).await
                }
                NetworkRequest::ReconcileTimeline { fixture_id, since } => {
                    self.handle_reconcile_timeline(fixture_id, since).await
                }
                NetworkRequest::ApplyTransition { fixture_id, action } => {
                    self.handle_apply_transition(fixture_id, action).await
                }
                NetworkRequest::AppendEvent { fixture_id, draft } => {
                    self.handle_append_event(fixture_id, draft).await
                }
                NetworkRequest::LoadTrades { team_id } => self.handle_load_trades(team_id).await,
                NetworkRequest::ProposeTrade { from_team, to_team, offered, requested } => {
                    self.handle_propose_trade(from_team, to_team, offered, requested).await
                }
                NetworkRequest::ResolveTrade { trade_id, team_id, status } => {
                    self.handle_resolve_trade(trade_id, team_id, status).await
                }
                NetworkRequest::UploadCrest { team_id, path } => {
                    self.handle_upload_crest(team_id, path).await
                }
            };

            debug!("network request complete");
            self.stop_loading_animation(result.is_ok()).await;

            let response = result.unwrap_or_else(|err| NetworkResponse::Error {
                message: err.to_string(),
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_board(&self) -> Result<NetworkResponse, ApiError> {
        debug!("loading tournament board");
        let snapshot = if let Ok(source) = env::var(SNAPSHOT_ENV) {
            self.client.load_snapshot(&source).await?
        } else {
            Snapshot {
                fixtures: self.client.fetch_fixtures().await?,
                teams: self.client.fetch_teams().await?,
                players: self.client.fetch_players().await?,
            }
        };
        // A broken token should not take the whole board down with it.
        let actor = match self.client.whoami().await {
            Ok(actor) => actor,
            Err(err) => {
                warn!("could not verify operator token, continuing as viewer: {err}");
                Actor::viewer()
            }
        };
        Ok(NetworkResponse::BoardLoaded { snapshot, actor })
    }

    async fn handle_refresh_fixtures(&self) -> Result<NetworkResponse, ApiError> {
        debug!("refreshing fixtures");
        let fixtures = self.client.fetch_fixtures().await?;
        Ok(NetworkResponse::FixturesRefreshed { fixtures })
    }

    async fn handle_load_match(&self, fixture_id: String) -> Result<NetworkResponse, ApiError> {
        debug!("loading match view for fixture {fixture_id}");
        let fixture = self.client.fetch_fixture(&fixture_id).await?;
        let events = self.client.fetch_timeline(&fixture_id, None).await?;
        Ok(NetworkResponse::MatchLoaded { fixture, events })
    }

    async fn handle_reconcile_timeline(
        &self,
        fixture_id: String,
        since: Option<chrono::DateTime<Utc>>,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("reconciling timeline for fixture {fixture_id} since {since:?}");
        let events = self.client.fetch_timeline(&fixture_id, since).await?;
        Ok(NetworkResponse::TimelineReconciled { fixture_id, events })
    }

    async fn handle_apply_transition(
        &self,
        fixture_id: String,
        action: PhaseAction,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("applying {action} to fixture {fixture_id}");
        let actor = self.client.whoami().await?;
        let mut fixture = self.client.fetch_fixture(&fixture_id).await?;
        if let Err(err) = phase::apply(&mut fixture, &actor, action, Utc::now()) {
            return Ok(NetworkResponse::Error { message: err.to_string() });
        }
        self.client.save_fixture(&fixture).await?;
        Ok(NetworkResponse::FixtureSaved { fixture, appended: None })
    }

    async fn handle_append_event(
        &self,
        fixture_id: String,
        draft: EventDraft,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("appending {} to fixture {fixture_id}", draft.kind.label());
        let actor = self.client.whoami().await?;
        let mut fixture = self.client.fetch_fixture(&fixture_id).await?;
        let mut events = self.client.fetch_timeline(&fixture_id, None).await?;
        let event =
            match timeline::append_event(&mut fixture, &mut events, draft, &actor, Utc::now()) {
                Ok(event) => event,
                Err(err) => return Ok(NetworkResponse::Error { message: err.to_string() }),
            };
        // Event first; if the score patch is lost, the next projection of the
        // timeline restores it.
        self.client.insert_event(&event).await?;
        self.client.save_fixture(&fixture).await?;
        Ok(NetworkResponse::FixtureSaved { fixture, appended: Some(event) })
    }

    async fn handle_load_trades(&self, team_id: String) -> Result<NetworkResponse, ApiError> {
        debug!("loading trades for team {team_id}");
        let trades = self.client.fetch_trades(&team_id).await?;
        Ok(NetworkResponse::TradesLoaded { team_id, trades })
    }

    async fn handle_propose_trade(
        &self,
        from_team: String,
        to_team: String,
        offered: String,
        requested: String,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("proposing trade {offered} ({from_team}) for {requested} ({to_team})");
        self.client.propose_trade(&from_team, &to_team, &offered, &requested).await?;
        Ok(NetworkResponse::TradeSaved { team_id: from_team })
    }

    async fn handle_resolve_trade(
        &self,
        trade_id: String,
        team_id: String,
        status: TradeStatus,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("marking trade {trade_id} {}", status.label());
        self.client.set_trade_status(&trade_id, status).await?;
        Ok(NetworkResponse::TradeSaved { team_id })
    }

    async fn handle_upload_crest(
        &self,
        team_id: String,
        path: String,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("uploading crest for team {team_id} from {path}");
        let Some(extension) = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        else {
            return Ok(NetworkResponse::Error {
                message: format!("{path} has no file extension; expected .png, .jpg, .svg or .webp"),
            });
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ApiError::Other(format!("could not read {path}: {e}")))?;
        let url = self.client.upload_crest(&team_id, &extension, bytes).await?;
        Ok(NetworkResponse::CrestUploaded { team_id, url })
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

fn backend_from_env() -> CupApi {
    let base_url = env::var(BACKEND_URL_ENV)
        .unwrap_or_else(|_| cup_api::client::DEFAULT_BASE_URL.to_string());
    let api_key = env::var(BACKEND_KEY_ENV).unwrap_or_default();
    let token = env::var(TOKEN_ENV).ok();
    CupApi::new(base_url, api_key, token)
}
