//! Standalone fan-out for the live feed.
//!
//! Clients speak the frames in `cup_api::realtime`: subscribe frames update
//! the sending connection's filters and are never forwarded; change frames
//! are broadcast to every connection whose filters match.

use cup_api::realtime::{ChangeFrame, SubscribeFrame};
use futures_util::{SinkExt, StreamExt};
use std::env;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = env::var("CUPTUI_LIVE_BIND").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    let listener = TcpListener::bind(&addr).await?;
    let (tx, _rx) = broadcast::channel::<ChangeFrame>(512);

    eprintln!("live relay listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        let tx = tx.clone();
        let rx = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, tx, rx).await {
                eprintln!("client {peer} disconnected: {e}");
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    tx: broadcast::Sender<ChangeFrame>,
    mut rx: broadcast::Receiver<ChangeFrame>,
) -> anyhow::Result<()> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();
    let mut subscriptions: Vec<Subscription> = Vec::new();

    loop {
        tokio::select! {
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&text, &tx, &mut subscriptions);
                    }
                    Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Ok(frame) => {
                        if subscriptions.iter().any(|sub| sub.matches(&frame)) {
                            let text = serde_json::to_string(&frame)?;
                            write.send(Message::Text(text.into())).await?;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

fn handle_frame(
    text: &str,
    tx: &broadcast::Sender<ChangeFrame>,
    subscriptions: &mut Vec<Subscription>,
) {
    // Subscribe frames carry `action`, change frames carry `kind`; neither
    // parses as the other.
    if let Ok(frame) = serde_json::from_str::<SubscribeFrame>(text) {
        apply_subscribe(frame, subscriptions);
        return;
    }
    match serde_json::from_str::<ChangeFrame>(text) {
        Ok(frame) => {
            let _ = tx.send(frame);
        }
        Err(e) => eprintln!("unrecognized frame: {e}"),
    }
}

fn apply_subscribe(frame: SubscribeFrame, subscriptions: &mut Vec<Subscription>) {
    let SubscribeFrame {
        action,
        table,
        event,
        filter,
    } = frame;
    let sub = Subscription {
        table,
        event,
        filter,
    };
    match action.as_str() {
        "subscribe" => {
            if !subscriptions.contains(&sub) {
                subscriptions.push(sub);
            }
        }
        "unsubscribe" => {
            subscriptions.retain(|existing| existing != &sub);
        }
        other => eprintln!("unknown action {other:?}"),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Subscription {
    table: String,
    event: String,
    filter: Option<String>,
}

impl Subscription {
    fn matches(&self, change: &ChangeFrame) -> bool {
        if self.table != change.table {
            return false;
        }
        if self.event != "*" && self.event != change.kind {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => filter_matches(filter, &change.record),
        }
    }
}

/// `column=eq.value` against the raw record. Unknown filter shapes match
/// nothing rather than everything.
fn filter_matches(filter: &str, record: &serde_json::Value) -> bool {
    let Some((column, rest)) = filter.split_once('=') else {
        return false;
    };
    let Some(wanted) = rest.strip_prefix("eq.") else {
        return false;
    };
    match record.get(column) {
        Some(serde_json::Value::String(actual)) => actual == wanted,
        Some(other) => other.to_string() == wanted,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(table: &str, kind: &str, record: serde_json::Value) -> ChangeFrame {
        ChangeFrame {
            table: table.to_string(),
            kind: kind.to_string(),
            record,
        }
    }

    #[test]
    fn test_subscribe_then_match() {
        let mut subs = Vec::new();
        for frame in SubscribeFrame::watch_fixture("f1") {
            apply_subscribe(frame, &mut subs);
        }
        assert_eq!(subs.len(), 2);

        let update = change("fixtures", "UPDATE", json!({"id": "f1"}));
        assert!(subs.iter().any(|s| s.matches(&update)));

        let other = change("fixtures", "UPDATE", json!({"id": "f2"}));
        assert!(!subs.iter().any(|s| s.matches(&other)));

        let insert = change("match_events", "INSERT", json!({"fixture_id": "f1"}));
        assert!(subs.iter().any(|s| s.matches(&insert)));
    }

    #[test]
    fn test_unsubscribe_removes() {
        let mut subs = Vec::new();
        for frame in SubscribeFrame::watch_fixture("f1") {
            apply_subscribe(frame, &mut subs);
        }
        for frame in SubscribeFrame::unwatch_fixture("f1") {
            apply_subscribe(frame, &mut subs);
        }
        assert!(subs.is_empty());
    }

    #[test]
    fn test_wildcard_event_and_no_filter() {
        let sub = Subscription {
            table: "fixtures".to_string(),
            event: "*".to_string(),
            filter: None,
        };
        assert!(sub.matches(&change("fixtures", "UPDATE", json!({"id": "x"}))));
        assert!(sub.matches(&change("fixtures", "INSERT", json!({"id": "x"}))));
        assert!(!sub.matches(&change("match_events", "INSERT", json!({}))));
    }

    #[test]
    fn test_malformed_filter_matches_nothing() {
        assert!(!filter_matches("id", &json!({"id": "f1"})));
        assert!(!filter_matches("id=gt.f1", &json!({"id": "f1"})));
        assert!(!filter_matches("id=eq.f1", &json!({})));
    }
}
