//! The append-only match timeline and everything derived from it.
//!
//! Events are never edited or deleted. A mis-entered goal is corrected by
//! appending a compensating event, and the scoreline is recomputed as a
//! full projection of the log on every append, so the stored score can
//! never drift from the events that justify it.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::clock::{self, ClockError, ClockRules};
use crate::phase::Phase;
use crate::{Actor, EventKind, Fixture, MatchEvent, Role};

/// What the operator types in; ids and timestamps are stamped on append.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub kind: EventKind,
    pub team_id: String,
    pub player_id: String,
    pub assist_player_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineError {
    /// Events may only be appended to a live fixture. Scheduled, paused,
    /// half-time and completed all reject.
    FixtureNotLive,
    /// The event's team is not one of the fixture's two sides.
    InvalidTeam,
    /// A goal's assist must come from a different player than the scorer.
    InvalidAssist,
    /// The actor's role does not allow recording events.
    Forbidden { required: Role },
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineError::FixtureNotLive => write!(f, "fixture is not live"),
            TimelineError::InvalidTeam => write!(f, "team is not part of this fixture"),
            TimelineError::InvalidAssist => {
                write!(f, "assist must come from a different player")
            }
            TimelineError::Forbidden { required } => {
                write!(f, "requires the {} role", required.label())
            }
        }
    }
}

impl std::error::Error for TimelineError {}

/// Validate a draft against the fixture, stamp minute/half/id/timestamp,
/// append it, and refresh the fixture's score projection. Returns the
/// stored event for persistence.
pub fn append_event(
    fixture: &mut Fixture,
    events: &mut Vec<MatchEvent>,
    draft: EventDraft,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<MatchEvent, TimelineError> {
    if !actor.is_admin() {
        return Err(TimelineError::Forbidden { required: Role::Admin });
    }
    let Phase::Live(half) = fixture.phase() else {
        return Err(TimelineError::FixtureNotLive);
    };
    if !fixture.involves(&draft.team_id) {
        return Err(TimelineError::InvalidTeam);
    }

    let assist_player_id = match draft.kind {
        EventKind::Goal | EventKind::OwnGoal => {
            if let Some(assist) = &draft.assist_player_id
                && *assist == draft.player_id
            {
                return Err(TimelineError::InvalidAssist);
            }
            // Assists are only meaningful on a goal; an own goal has none.
            if draft.kind == EventKind::Goal { draft.assist_player_id } else { None }
        }
        EventKind::YellowCard | EventKind::RedCard => None,
    };

    let minute = match clock::minute_number(fixture, now, ClockRules::default()) {
        Ok(minute) => minute,
        Err(ClockError::NotStarted) => return Err(TimelineError::FixtureNotLive),
    };

    let event = MatchEvent {
        // Unique under the one-operator-per-fixture model.
        id: format!("{}-{}-{}", fixture.id, now.timestamp_millis(), events.len() + 1),
        fixture_id: fixture.id.clone(),
        kind: draft.kind,
        team_id: draft.team_id,
        player_id: draft.player_id,
        assist_player_id,
        minute,
        half,
        created_at: now,
    };
    events.push(event.clone());
    fixture.score = project_score(fixture, events);
    Ok(event)
}

/// The scoreline implied by the log. A goal credits its own team, an own
/// goal credits the opposing side, cards score nothing, and events that
/// reference neither team are ignored.
pub fn project_score(fixture: &Fixture, events: &[MatchEvent]) -> (u16, u16) {
    let mut score = (0u16, 0u16);
    for event in events {
        if event.fixture_id != fixture.id {
            continue;
        }
        let credited = match event.kind {
            EventKind::Goal => Some(event.team_id.as_str()),
            EventKind::OwnGoal => fixture.other_team(&event.team_id),
            EventKind::YellowCard | EventKind::RedCard => None,
        };
        if credited == Some(fixture.team_a.as_str()) {
            score.0 += 1;
        } else if credited == Some(fixture.team_b.as_str()) {
            score.1 += 1;
        }
    }
    score
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardCount {
    pub yellow: u16,
    pub red: u16,
}

/// Discipline tally for one side, derived on demand.
pub fn card_counts(events: &[MatchEvent], team_id: &str) -> CardCount {
    let mut count = CardCount::default();
    for event in events.iter().filter(|e| e.team_id == team_id) {
        match event.kind {
            EventKind::YellowCard => count.yellow += 1,
            EventKind::RedCard => count.red += 1,
            EventKind::Goal | EventKind::OwnGoal => {}
        }
    }
    count
}

/// Canonical timeline order: `created_at`, ties broken by id.
pub fn sort_timeline(events: &mut [MatchEvent]) {
    events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Incremental read over a sorted timeline: everything strictly after the
/// cursor event. `None` or an unknown cursor yields the whole timeline, so
/// a reader can always restart from scratch.
pub fn events_since<'a>(events: &'a [MatchEvent], last_seen: Option<&str>) -> &'a [MatchEvent] {
    let Some(last_seen) = last_seen else {
        return events;
    };
    match events.iter().position(|event| event.id == last_seen) {
        Some(index) => &events[index + 1..],
        None => events,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn admin() -> Actor {
        Actor { email: "ref@cup.test".into(), role: Role::Admin }
    }

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 18, 0, 0).unwrap()
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        kickoff() + Duration::minutes(minutes)
    }

    fn live_fixture() -> Fixture {
        let mut fixture = Fixture {
            id: "fx1".into(),
            team_a: "ax".into(),
            team_b: "bx".into(),
            ..Fixture::default()
        };
        fixture.start(&admin(), kickoff()).unwrap();
        fixture
    }

    fn goal(team: &str, player: &str) -> EventDraft {
        EventDraft {
            kind: EventKind::Goal,
            team_id: team.into(),
            player_id: player.into(),
            assist_player_id: None,
        }
    }

    #[test]
    fn test_goal_scores_for_its_own_team() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        append_event(&mut fixture, &mut events, goal("ax", "p1"), &admin(), t(10)).unwrap();
        assert_eq!(fixture.score, (1, 0));
        append_event(&mut fixture, &mut events, goal("bx", "p9"), &admin(), t(20)).unwrap();
        assert_eq!(fixture.score, (1, 1));
        assert_eq!(project_score(&fixture, &events), fixture.score);
    }

    #[test]
    fn test_own_goal_credits_the_opposition() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let draft = EventDraft {
            kind: EventKind::OwnGoal,
            team_id: "ax".into(),
            player_id: "p2".into(),
            assist_player_id: None,
        };
        append_event(&mut fixture, &mut events, draft, &admin(), t(30)).unwrap();
        assert_eq!(fixture.score, (0, 1));
    }

    #[test]
    fn test_compensating_own_goal_restores_the_score() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        // A goal credited to the wrong side...
        append_event(&mut fixture, &mut events, goal("bx", "p9"), &admin(), t(10)).unwrap();
        assert_eq!(fixture.score, (0, 1));
        // ...is corrected by appending, never by editing the log.
        let compensate = EventDraft {
            kind: EventKind::OwnGoal,
            team_id: "bx".into(),
            player_id: "p9".into(),
            assist_player_id: None,
        };
        append_event(&mut fixture, &mut events, compensate, &admin(), t(11)).unwrap();
        append_event(&mut fixture, &mut events, goal("ax", "p1"), &admin(), t(12)).unwrap();
        assert_eq!(fixture.score, (2, 1));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_cards_never_score_and_lose_their_assist() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let draft = EventDraft {
            kind: EventKind::YellowCard,
            team_id: "ax".into(),
            player_id: "p3".into(),
            assist_player_id: Some("p4".into()),
        };
        let stored = append_event(&mut fixture, &mut events, draft, &admin(), t(15)).unwrap();
        assert_eq!(fixture.score, (0, 0));
        assert_eq!(stored.assist_player_id, None);

        let red = EventDraft {
            kind: EventKind::RedCard,
            team_id: "ax".into(),
            player_id: "p3".into(),
            assist_player_id: None,
        };
        append_event(&mut fixture, &mut events, red, &admin(), t(16)).unwrap();
        assert_eq!(card_counts(&events, "ax"), CardCount { yellow: 1, red: 1 });
        assert_eq!(card_counts(&events, "bx"), CardCount::default());
    }

    #[test]
    fn test_unknown_team_is_rejected() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let err =
            append_event(&mut fixture, &mut events, goal("zz", "p1"), &admin(), t(5)).unwrap_err();
        assert_eq!(err, TimelineError::InvalidTeam);
        assert!(events.is_empty());
    }

    #[test]
    fn test_self_assist_is_rejected() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let mut draft = goal("ax", "p1");
        draft.assist_player_id = Some("p1".into());
        let err = append_event(&mut fixture, &mut events, draft, &admin(), t(5)).unwrap_err();
        assert_eq!(err, TimelineError::InvalidAssist);

        let own = EventDraft {
            kind: EventKind::OwnGoal,
            team_id: "ax".into(),
            player_id: "p2".into(),
            assist_player_id: Some("p2".into()),
        };
        let err = append_event(&mut fixture, &mut events, own, &admin(), t(6)).unwrap_err();
        assert_eq!(err, TimelineError::InvalidAssist);
    }

    #[test]
    fn test_append_requires_a_live_fixture() {
        let admin = admin();
        let mut events = Vec::new();

        let mut scheduled = Fixture {
            id: "fx1".into(),
            team_a: "ax".into(),
            team_b: "bx".into(),
            ..Fixture::default()
        };
        let err = append_event(&mut scheduled, &mut events, goal("ax", "p1"), &admin, kickoff())
            .unwrap_err();
        assert_eq!(err, TimelineError::FixtureNotLive);

        let mut paused = live_fixture();
        paused.pause(&admin, t(10)).unwrap();
        let err =
            append_event(&mut paused, &mut events, goal("ax", "p1"), &admin, t(11)).unwrap_err();
        assert_eq!(err, TimelineError::FixtureNotLive);

        let mut at_break = live_fixture();
        at_break.enter_half_time(&admin, t(45)).unwrap();
        let err =
            append_event(&mut at_break, &mut events, goal("ax", "p1"), &admin, t(50)).unwrap_err();
        assert_eq!(err, TimelineError::FixtureNotLive);
    }

    #[test]
    fn test_append_requires_admin() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let err = append_event(&mut fixture, &mut events, goal("ax", "p1"), &Actor::viewer(), t(5))
            .unwrap_err();
        assert_eq!(err, TimelineError::Forbidden { required: Role::Admin });
    }

    #[test]
    fn test_minute_is_stamped_from_the_clock() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let early = append_event(
            &mut fixture,
            &mut events,
            goal("ax", "p1"),
            &admin(),
            kickoff() + Duration::seconds(65),
        )
        .unwrap();
        assert_eq!(early.minute, 2);
        assert_eq!(early.half, crate::Half::First);
    }

    #[test]
    fn test_events_since_cursor() {
        let mut fixture = live_fixture();
        let mut events = Vec::new();
        let e1 = append_event(&mut fixture, &mut events, goal("ax", "p1"), &admin(), t(5)).unwrap();
        let e2 = append_event(&mut fixture, &mut events, goal("bx", "p9"), &admin(), t(9)).unwrap();
        let e3 =
            append_event(&mut fixture, &mut events, goal("ax", "p2"), &admin(), t(14)).unwrap();
        sort_timeline(&mut events);

        assert_eq!(events_since(&events, None).len(), 3);
        let tail = events_since(&events, Some(&e1.id));
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id, e2.id);
        assert_eq!(tail[1].id, e3.id);
        // Restartable: the same cursor yields the same suffix again.
        assert_eq!(events_since(&events, Some(&e1.id)).len(), 2);
        assert!(events_since(&events, Some(&e3.id)).is_empty());
        // An unknown cursor falls back to the full timeline.
        assert_eq!(events_since(&events, Some("gone")).len(), 3);
    }

    #[test]
    fn test_full_match_scenario() {
        let admin = admin();
        let mut fixture = Fixture {
            id: "fx-final".into(),
            team_a: "ax".into(),
            team_b: "bx".into(),
            ..Fixture::default()
        };
        let mut events = Vec::new();

        fixture.start(&admin, kickoff()).unwrap();
        fixture.pause(&admin, t(20)).unwrap();
        fixture.resume(&admin, t(25)).unwrap();
        // 45 minutes of play reached at wall clock +50.
        fixture.enter_half_time(&admin, t(50)).unwrap();
        fixture.start_second_half(&admin, t(65)).unwrap();
        assert_eq!(fixture.total_paused_secs, 20 * 60);

        // In the 70th playing minute: 69m30s elapsed, +20m of stoppages.
        let strike = kickoff() + Duration::seconds(69 * 60 + 30) + Duration::minutes(20);
        let scored = append_event(&mut fixture, &mut events, goal("ax", "p1"), &admin, strike)
            .unwrap();
        assert_eq!(scored.minute, 70);
        assert_eq!(scored.half, crate::Half::Second);
        assert_eq!(fixture.score, (1, 0));

        fixture.end(&admin, t(115)).unwrap();
        let err =
            append_event(&mut fixture, &mut events, goal("bx", "p9"), &admin, t(116)).unwrap_err();
        assert_eq!(err, TimelineError::FixtureNotLive);
        assert_eq!(fixture.end(&admin, t(116)), Err(crate::phase::PhaseError::AlreadyCompleted));
        assert_eq!(fixture.score, (1, 0));
    }
}
