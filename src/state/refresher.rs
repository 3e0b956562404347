use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Periodic fixture refresh, every 30 seconds while the app runs. This is
/// the fallback path that keeps scores honest when the live feed is down;
/// the full board (teams, players) is loaded once on startup.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>) -> Self {
        Self { network_requests }
    }

    pub async fn run(self) {
        let mut fixtures_interval = interval(Duration::from_secs(30));
        // Skip the immediate first tick so startup loading isn't double-triggered.
        fixtures_interval.tick().await;

        loop {
            fixtures_interval.tick().await;
            let _ = self
                .network_requests
                .send(NetworkRequest::RefreshFixtures)
                .await;
        }
    }
}
