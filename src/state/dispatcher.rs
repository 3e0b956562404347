use std::collections::HashSet;

use chrono::{DateTime, Utc};
use cup_api::realtime::Change;
use cup_api::{EventKind, Fixture, MatchEvent, RankTier};
use log::debug;

use crate::state::messages::Directory;

/// What the viewer should do about one decoded row change.
#[derive(Debug, Clone)]
pub enum LiveTrigger {
    /// Loud: a goal interrupts the viewer with the overlay.
    Celebration { event: MatchEvent, banner: CelebrationTrigger },
    /// Quiet: cards only refresh the timeline pane.
    TimelineUpdate { event: MatchEvent },
    /// Re-render scoreline, phase badge and clock from the fresh row.
    FixtureChanged { fixture: Fixture },
}

/// Everything the overlay needs, resolved while the directory lock is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CelebrationTrigger {
    pub fixture_id: String,
    pub kind: EventKind,
    /// The side the goal counts for; on an own goal that is the opposition.
    pub team_name: String,
    pub player_name: String,
    pub player_rank: RankTier,
    pub assist_name: Option<String>,
    pub minute: u16,
}

#[derive(Debug, Clone)]
struct WatchedFixture {
    id: String,
    team_a: String,
    team_b: String,
}

/// Per-viewer feed gate. The realtime channel is at-least-once across
/// reconnects, so every event id passes through the seen set exactly once
/// no matter how often the feed delivers it; duplicates are dropped
/// silently rather than treated as errors.
#[derive(Debug, Default)]
pub struct LiveDispatcher {
    watched: Option<WatchedFixture>,
    seen: HashSet<String>,
    cursor: Option<DateTime<Utc>>,
}

impl LiveDispatcher {
    /// Scope to one fixture. Forgets the previous fixture's dedup state;
    /// a viewer only ever watches one match.
    pub fn watch(&mut self, fixture: &Fixture) {
        self.watched = Some(WatchedFixture {
            id: fixture.id.clone(),
            team_a: fixture.team_a.clone(),
            team_b: fixture.team_b.clone(),
        });
        self.seen.clear();
        self.cursor = None;
    }

    pub fn unwatch(&mut self) {
        self.watched = None;
        self.seen.clear();
        self.cursor = None;
    }

    pub fn watched_fixture_id(&self) -> Option<&str> {
        self.watched.as_ref().map(|w| w.id.as_str())
    }

    /// Mark an already-rendered timeline as consumed, so the feed echoing
    /// those rows later cannot replay them as fresh triggers.
    pub fn prime(&mut self, events: &[MatchEvent]) {
        for event in events {
            self.seen.insert(event.id.clone());
            self.advance_cursor(event.created_at);
        }
    }

    /// Where an incremental catch-up read should start after a reconnect.
    pub fn catch_up_since(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    pub fn on_change(&mut self, change: Change, directory: &Directory) -> Option<LiveTrigger> {
        let watched = self.watched.as_ref()?;
        if change.fixture_id() != watched.id {
            return None;
        }
        match change {
            Change::FixtureUpdated(fixture) => Some(LiveTrigger::FixtureChanged { fixture }),
            Change::EventInserted(event) => self.admit(event, directory),
        }
    }

    /// Replay what the fixture's timeline says happened while the socket
    /// was down. Runs through the same gate as the live path, so an event
    /// that later arrives again over the feed stays deduplicated.
    pub fn reconcile(
        &mut self,
        fixture_id: &str,
        missed: Vec<MatchEvent>,
        directory: &Directory,
    ) -> Vec<LiveTrigger> {
        if self.watched_fixture_id() != Some(fixture_id) {
            return Vec::new();
        }
        missed
            .into_iter()
            .filter_map(|event| self.admit(event, directory))
            .collect()
    }

    fn admit(&mut self, event: MatchEvent, directory: &Directory) -> Option<LiveTrigger> {
        if !self.seen.insert(event.id.clone()) {
            debug!("duplicate delivery dropped: {}", event.id);
            return None;
        }
        self.advance_cursor(event.created_at);

        if event.kind.is_goal() {
            let credited = match event.kind {
                EventKind::OwnGoal => self.credited_side(&event.team_id),
                _ => event.team_id.clone(),
            };
            let banner = CelebrationTrigger {
                fixture_id: event.fixture_id.clone(),
                kind: event.kind,
                team_name: directory.team_name(&credited),
                player_name: directory.player_name(&event.player_id),
                player_rank: directory.player(&event.player_id).map(|p| p.rank).unwrap_or_default(),
                assist_name: event.assist_player_id.as_deref().map(|id| directory.player_name(id)),
                minute: event.minute,
            };
            Some(LiveTrigger::Celebration { event, banner })
        } else {
            Some(LiveTrigger::TimelineUpdate { event })
        }
    }

    fn credited_side(&self, scorer_team: &str) -> String {
        match &self.watched {
            Some(w) if w.team_a == scorer_team => w.team_b.clone(),
            Some(w) if w.team_b == scorer_team => w.team_a.clone(),
            _ => scorer_team.to_string(),
        }
    }

    fn advance_cursor(&mut self, created_at: DateTime<Utc>) {
        if self.cursor.is_none_or(|c| created_at > c) {
            self.cursor = Some(created_at);
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use cup_api::{Half, Player, Team};

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 18, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        Fixture {
            id: "fx1".into(),
            team_a: "ax".into(),
            team_b: "bx".into(),
            ..Fixture::default()
        }
    }

    fn directory() -> Directory {
        Directory {
            teams: vec![
                Team { id: "ax".into(), name: "Albion".into(), ..Team::default() },
                Team { id: "bx".into(), name: "Borough".into(), ..Team::default() },
            ],
            players: vec![
                Player {
                    id: "p1".into(),
                    team_id: "ax".into(),
                    name: "Okafor".into(),
                    rank: RankTier::Gold,
                    ..Player::default()
                },
                Player {
                    id: "p2".into(),
                    team_id: "ax".into(),
                    name: "Silva".into(),
                    ..Player::default()
                },
            ],
        }
    }

    fn event(id: &str, kind: EventKind, team: &str, minute: u16, offset_secs: i64) -> MatchEvent {
        MatchEvent {
            id: id.into(),
            fixture_id: "fx1".into(),
            kind,
            team_id: team.into(),
            player_id: "p1".into(),
            assist_player_id: None,
            minute,
            half: Half::First,
            created_at: kickoff() + Duration::seconds(offset_secs),
        }
    }

    fn watching() -> LiveDispatcher {
        let mut dispatcher = LiveDispatcher::default();
        dispatcher.watch(&fixture());
        dispatcher
    }

    #[test]
    fn test_goal_triggers_a_celebration_once() {
        let mut dispatcher = watching();
        let directory = directory();
        let goal = event("ev1", EventKind::Goal, "ax", 12, 700);

        let first = dispatcher.on_change(Change::EventInserted(goal.clone()), &directory);
        let Some(LiveTrigger::Celebration { banner, .. }) = first else {
            panic!("expected a celebration, got {first:?}");
        };
        assert_eq!(banner.team_name, "Albion");
        assert_eq!(banner.player_name, "Okafor");
        assert_eq!(banner.player_rank, RankTier::Gold);
        assert_eq!(banner.minute, 12);

        // The feed redelivers after a reconnect; the duplicate is silent.
        let second = dispatcher.on_change(Change::EventInserted(goal), &directory);
        assert!(second.is_none());
    }

    #[test]
    fn test_own_goal_celebrates_the_opposition() {
        let mut dispatcher = watching();
        let own = event("ev1", EventKind::OwnGoal, "ax", 30, 1800);
        let trigger = dispatcher.on_change(Change::EventInserted(own), &directory());
        let Some(LiveTrigger::Celebration { banner, .. }) = trigger else {
            panic!("expected a celebration, got {trigger:?}");
        };
        assert_eq!(banner.kind, EventKind::OwnGoal);
        assert_eq!(banner.team_name, "Borough");
    }

    #[test]
    fn test_cards_update_quietly() {
        let mut dispatcher = watching();
        let card = event("ev1", EventKind::YellowCard, "bx", 40, 2400);
        let trigger = dispatcher.on_change(Change::EventInserted(card), &directory());
        assert!(matches!(trigger, Some(LiveTrigger::TimelineUpdate { .. })));
    }

    #[test]
    fn test_changes_for_other_fixtures_are_dropped() {
        let mut dispatcher = watching();
        let mut foreign = event("ev1", EventKind::Goal, "ax", 5, 300);
        foreign.fixture_id = "fx2".into();
        assert!(dispatcher.on_change(Change::EventInserted(foreign), &directory()).is_none());

        let mut other_row = fixture();
        other_row.id = "fx2".into();
        assert!(dispatcher.on_change(Change::FixtureUpdated(other_row), &directory()).is_none());
    }

    #[test]
    fn test_fixture_updates_always_pass_through() {
        let mut dispatcher = watching();
        let mut row = fixture();
        row.score = (2, 1);
        let trigger = dispatcher.on_change(Change::FixtureUpdated(row.clone()), &directory());
        assert!(matches!(trigger, Some(LiveTrigger::FixtureChanged { .. })));
        // Row updates are idempotent overwrites, not deduplicated.
        let again = dispatcher.on_change(Change::FixtureUpdated(row), &directory());
        assert!(matches!(again, Some(LiveTrigger::FixtureChanged { .. })));
    }

    #[test]
    fn test_priming_marks_rendered_events_as_consumed() {
        let mut dispatcher = watching();
        let e1 = event("ev1", EventKind::Goal, "ax", 9, 500);
        dispatcher.prime(&[e1.clone()]);
        assert!(dispatcher.on_change(Change::EventInserted(e1), &directory()).is_none());
        assert_eq!(dispatcher.catch_up_since(), Some(kickoff() + Duration::seconds(500)));
    }

    #[test]
    fn test_reconnect_reconciles_missed_events_in_order_exactly_once() {
        let mut dispatcher = watching();
        let directory = directory();
        let e1 = event("ev1", EventKind::Goal, "ax", 9, 500);
        dispatcher.prime(&[e1]);

        // The socket died; E2 and E3 landed meanwhile and come back from
        // the catch-up read in (created_at, id) order.
        let e2 = event("ev2", EventKind::Goal, "bx", 21, 1250);
        let e3 = event("ev3", EventKind::YellowCard, "ax", 24, 1430);
        let triggers = dispatcher.reconcile("fx1", vec![e2.clone(), e3.clone()], &directory);
        assert_eq!(triggers.len(), 2);
        assert!(matches!(&triggers[0], LiveTrigger::Celebration { event, .. } if event.id == "ev2"));
        assert!(matches!(&triggers[1], LiveTrigger::TimelineUpdate { event } if event.id == "ev3"));

        // The resubscribed feed replays both; the viewer sees nothing new.
        assert!(dispatcher.on_change(Change::EventInserted(e2), &directory).is_none());
        assert!(dispatcher.on_change(Change::EventInserted(e3), &directory).is_none());
        assert_eq!(dispatcher.catch_up_since(), Some(kickoff() + Duration::seconds(1430)));
    }

    #[test]
    fn test_reconcile_for_an_unwatched_fixture_is_empty() {
        let mut dispatcher = watching();
        let e2 = event("ev2", EventKind::Goal, "bx", 21, 1250);
        assert!(dispatcher.reconcile("fx9", vec![e2], &directory()).is_empty());
    }

    #[test]
    fn test_unknown_references_fall_back_to_raw_ids() {
        let mut dispatcher = watching();
        let empty = Directory::default();
        let goal = event("ev1", EventKind::Goal, "ax", 3, 150);
        let trigger = dispatcher.on_change(Change::EventInserted(goal), &empty);
        let Some(LiveTrigger::Celebration { banner, .. }) = trigger else {
            panic!("expected a celebration, got {trigger:?}");
        };
        assert_eq!(banner.player_name, "p1");
        assert_eq!(banner.team_name, "ax");
        assert_eq!(banner.player_rank, RankTier::Bronze);
    }

    #[test]
    fn test_watch_resets_state_between_fixtures() {
        let mut dispatcher = watching();
        let goal = event("ev1", EventKind::Goal, "ax", 12, 700);
        dispatcher.on_change(Change::EventInserted(goal.clone()), &directory());

        let mut other = fixture();
        other.id = "fx2".into();
        dispatcher.watch(&other);
        assert_eq!(dispatcher.catch_up_since(), None);
        assert_eq!(dispatcher.watched_fixture_id(), Some("fx2"));
    }
}
