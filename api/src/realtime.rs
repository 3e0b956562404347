//! Frames spoken over the realtime websocket.
//!
//! The protocol is deliberately small: a client subscribes to row changes
//! on a table (optionally filtered to one fixture), and the feed pushes
//! every matching change as its own text frame. Delivery is at-least-once
//! across reconnects; consumers dedup by event id.

use serde::{Deserialize, Serialize};

use crate::{Fixture, MatchEvent};

pub const FIXTURES_TABLE: &str = "fixtures";
pub const EVENTS_TABLE: &str = "match_events";

/// Client -> feed. `action` is "subscribe" or "unsubscribe"; `event` is
/// "INSERT", "UPDATE" or "*".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeFrame {
    pub action: String,
    pub table: String,
    pub event: String,
    pub filter: Option<String>,
}

impl SubscribeFrame {
    /// Watch one fixture: its row updates and its event inserts.
    pub fn watch_fixture(fixture_id: &str) -> Vec<SubscribeFrame> {
        vec![
            SubscribeFrame {
                action: "subscribe".to_string(),
                table: FIXTURES_TABLE.to_string(),
                event: "UPDATE".to_string(),
                filter: Some(format!("id=eq.{fixture_id}")),
            },
            SubscribeFrame {
                action: "subscribe".to_string(),
                table: EVENTS_TABLE.to_string(),
                event: "INSERT".to_string(),
                filter: Some(format!("fixture_id=eq.{fixture_id}")),
            },
        ]
    }

    pub fn unwatch_fixture(fixture_id: &str) -> Vec<SubscribeFrame> {
        SubscribeFrame::watch_fixture(fixture_id)
            .into_iter()
            .map(|mut frame| {
                frame.action = "unsubscribe".to_string();
                frame
            })
            .collect()
    }
}

/// Feed -> client: one row change. `record` is the raw row, decoded by the
/// client layer into a domain [`Change`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeFrame {
    pub table: String,
    pub kind: String,
    pub record: serde_json::Value,
}

/// A decoded row change the dispatcher can act on.
#[derive(Debug, Clone)]
pub enum Change {
    FixtureUpdated(Fixture),
    EventInserted(MatchEvent),
}

impl Change {
    pub fn fixture_id(&self) -> &str {
        match self {
            Change::FixtureUpdated(fixture) => &fixture.id,
            Change::EventInserted(event) => &event.fixture_id,
        }
    }
}
