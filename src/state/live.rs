use cup_api::client::decode_change;
use cup_api::realtime::{Change, ChangeFrame, SubscribeFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Consecutive connect failures before the worker gives up for good.
const MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone)]
pub enum LiveCommand {
    Watch { fixture_id: String },
    Unwatch { fixture_id: String },
    /// Echo an operator's own write to the feed so peers see it without
    /// waiting for their next poll.
    Publish(ChangeFrame),
}

#[derive(Debug)]
pub enum LiveEvent {
    Connected,
    Disconnected,
    Change(Change),
    /// The feed is gone and the worker has stopped trying; polling is the
    /// only update path from here on.
    RetriesExhausted,
    Error(String),
}

#[derive(Debug)]
pub struct LiveWorker {
    pub url: String,
    pub commands: mpsc::Receiver<LiveCommand>,
    pub events: mpsc::Sender<LiveEvent>,
}

impl LiveWorker {
    pub async fn run(mut self) {
        let mut watched: Option<String> = None;
        let mut pending: Vec<ChangeFrame> = Vec::new();
        let mut failures: u32 = 0;
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    failures = 0;
                    let _ = self.events.send(LiveEvent::Connected).await;
                    let (mut write, mut read) = stream.split();

                    if let Err(e) = resubscribe(&mut write, watched.as_deref()).await {
                        let _ = self
                            .events
                            .send(LiveEvent::Error(format!("live subscribe failed: {e}")))
                            .await;
                        let _ = self.events.send(LiveEvent::Disconnected).await;
                    } else {
                        for frame in pending.drain(..) {
                            if let Err(e) = publish_frame(&mut write, &frame).await {
                                let _ = self
                                    .events
                                    .send(LiveEvent::Error(format!("live publish failed: {e}")))
                                    .await;
                            }
                        }

                        loop {
                            tokio::select! {
                                maybe_cmd = self.commands.recv() => {
                                    let Some(cmd) = maybe_cmd else {
                                        return;
                                    };
                                    match cmd {
                                        LiveCommand::Watch { fixture_id } => {
                                            let previous = watched.replace(fixture_id.clone());
                                            let mut frames = Vec::new();
                                            if let Some(old) = previous
                                                && old != fixture_id
                                            {
                                                frames.extend(SubscribeFrame::unwatch_fixture(&old));
                                            }
                                            frames.extend(SubscribeFrame::watch_fixture(&fixture_id));
                                            if let Err(e) = send_frames(&mut write, frames).await {
                                                let _ = self.events.send(LiveEvent::Error(format!("live subscribe failed: {e}"))).await;
                                                let _ = self.events.send(LiveEvent::Disconnected).await;
                                                break;
                                            }
                                        }
                                        LiveCommand::Unwatch { fixture_id } => {
                                            watched = None;
                                            if let Err(e) = send_frames(&mut write, SubscribeFrame::unwatch_fixture(&fixture_id)).await {
                                                let _ = self.events.send(LiveEvent::Error(format!("live unsubscribe failed: {e}"))).await;
                                                let _ = self.events.send(LiveEvent::Disconnected).await;
                                                break;
                                            }
                                        }
                                        LiveCommand::Publish(frame) => {
                                            if let Err(e) = publish_frame(&mut write, &frame).await {
                                                pending.push(frame);
                                                let _ = self.events.send(LiveEvent::Error(format!("live publish failed: {e}"))).await;
                                                let _ = self.events.send(LiveEvent::Disconnected).await;
                                                break;
                                            }
                                        }
                                    }
                                }
                                inbound = read.next() => {
                                    match inbound {
                                        Some(Ok(Message::Text(text))) => {
                                            match serde_json::from_str::<ChangeFrame>(&text) {
                                                Ok(frame) => match decode_change(&frame) {
                                                    Ok(Some(change)) => {
                                                        let _ = self.events.send(LiveEvent::Change(change)).await;
                                                    }
                                                    Ok(None) => {}
                                                    Err(e) => {
                                                        let _ = self.events.send(LiveEvent::Error(format!("live decode error: {e}"))).await;
                                                    }
                                                },
                                                Err(e) => {
                                                    let _ = self.events.send(LiveEvent::Error(format!("live parse error: {e}"))).await;
                                                }
                                            }
                                        }
                                        Some(Ok(Message::Close(_))) | None => {
                                            let _ = self.events.send(LiveEvent::Disconnected).await;
                                            break;
                                        }
                                        Some(Ok(_)) => {}
                                        Some(Err(e)) => {
                                            let _ = self.events.send(LiveEvent::Error(format!("live read failed: {e}"))).await;
                                            let _ = self.events.send(LiveEvent::Disconnected).await;
                                            break;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    let _ = self
                        .events
                        .send(LiveEvent::Error(format!("live connect failed: {e}")))
                        .await;
                    let _ = self.events.send(LiveEvent::Disconnected).await;
                    if failures >= MAX_RETRIES {
                        let _ = self.events.send(LiveEvent::RetriesExhausted).await;
                        return;
                    }
                }
            }

            loop {
                match self.commands.try_recv() {
                    Ok(LiveCommand::Watch { fixture_id }) => watched = Some(fixture_id),
                    Ok(LiveCommand::Unwatch { .. }) => watched = None,
                    Ok(LiveCommand::Publish(frame)) => pending.push(frame),
                    Err(tokio::sync::mpsc::error::TryRecvError::Empty) => break,
                    Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => return,
                }
            }
            sleep(backoff_delay(failures)).await;
        }
    }
}

/// 2s after a clean drop, then doubling per consecutive connect failure,
/// capped at 30s.
fn backoff_delay(consecutive_failures: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(consecutive_failures.max(1)).min(30))
}

async fn resubscribe<S>(write: &mut S, watched: Option<&str>) -> Result<(), String>
where
    S: futures_util::sink::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    match watched {
        Some(fixture_id) => send_frames(write, SubscribeFrame::watch_fixture(fixture_id)).await,
        None => Ok(()),
    }
}

async fn send_frames<S>(write: &mut S, frames: Vec<SubscribeFrame>) -> Result<(), String>
where
    S: futures_util::sink::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    for frame in frames {
        let text = serde_json::to_string(&frame).map_err(|e| e.to_string())?;
        write.send(Message::Text(text.into())).await.map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn publish_frame<S>(write: &mut S, frame: &ChangeFrame) -> Result<(), String>
where
    S: futures_util::sink::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    write.send(Message::Text(text.into())).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_secs(2));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(10), Duration::from_secs(30));
    }
}
