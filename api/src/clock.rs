//! Pure match-clock arithmetic over the timing fields of a [`Fixture`].
//!
//! Nothing here ticks. The running clock a viewer sees is recomputed from
//! the persisted timestamps and the caller's `now` on every render, so any
//! client looking at the same fixture row derives the same elapsed time.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::{Fixture, Half};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The fixture has no `started_at` yet; there is no clock to read.
    NotStarted,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::NotStarted => write!(f, "match has not started"),
        }
    }
}

impl std::error::Error for ClockError {}

/// Display rules for the match minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRules {
    /// Regulation length of one half in minutes.
    pub half_minutes: u16,
    /// When set, the displayed minute is clamped to
    /// `half_minutes + cap` in the first half and `2 * half_minutes + cap`
    /// in the second. `None` leaves stoppage time unbounded.
    pub stoppage_cap: Option<u16>,
}

impl Default for ClockRules {
    fn default() -> Self {
        ClockRules { half_minutes: 45, stoppage_cap: None }
    }
}

/// Playing seconds elapsed, excluding every paused interval and the
/// half-time break.
///
/// The reference point is `ended_at` once the match is over and
/// `half_time_at` while the break is on, so the clock freezes at those
/// boundaries no matter how much wall time passes. Clock skew between the
/// operator's writes and this reader's `now` is clamped so the result is
/// never negative.
pub fn elapsed_seconds(fixture: &Fixture, now: DateTime<Utc>) -> Result<i64, ClockError> {
    let Some(started_at) = fixture.started_at else {
        return Err(ClockError::NotStarted);
    };

    let effective_now = if let Some(ended_at) = fixture.ended_at {
        ended_at
    } else if let Some(half_time_at) = fixture.half_time_at
        && fixture.second_half_started_at.is_none()
    {
        half_time_at
    } else {
        now
    };

    let open_pause = match fixture.paused_at {
        Some(paused_at) => (effective_now - paused_at).num_seconds().max(0),
        None => 0,
    };

    let elapsed =
        (effective_now - started_at).num_seconds() - fixture.total_paused_secs - open_pause;
    Ok(elapsed.max(0))
}

/// Continuous match minute: the first second of the match is minute 1, so
/// 65 elapsed seconds is minute 2. Not reset at half-time.
pub fn minute_number(
    fixture: &Fixture,
    now: DateTime<Utc>,
    rules: ClockRules,
) -> Result<u16, ClockError> {
    let elapsed = elapsed_seconds(fixture, now)?;
    let minute = (elapsed / 60 + 1).min(i64::from(u16::MAX)) as u16;
    let half = fixture.current_half.unwrap_or(Half::First);
    match rules.stoppage_cap {
        Some(cap) => {
            let ceiling = rules.half_minutes * u16::from(half.number()) + cap;
            Ok(minute.min(ceiling))
        }
        None => Ok(minute),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 18, 0, 0).unwrap()
    }

    fn live_fixture() -> Fixture {
        Fixture {
            id: "fx1".into(),
            team_a: "ax".into(),
            team_b: "bx".into(),
            status: crate::FixtureStatus::Live,
            started_at: Some(kickoff()),
            current_half: Some(Half::First),
            ..Fixture::default()
        }
    }

    #[test]
    fn test_not_started_has_no_clock() {
        let fixture = Fixture::default();
        assert_eq!(elapsed_seconds(&fixture, kickoff()), Err(ClockError::NotStarted));
        assert_eq!(
            minute_number(&fixture, kickoff(), ClockRules::default()),
            Err(ClockError::NotStarted)
        );
    }

    #[test]
    fn test_first_second_is_minute_one() {
        let fixture = live_fixture();
        assert_eq!(elapsed_seconds(&fixture, kickoff()), Ok(0));
        assert_eq!(minute_number(&fixture, kickoff(), ClockRules::default()), Ok(1));
    }

    #[test]
    fn test_sixty_five_seconds_is_minute_two() {
        let fixture = live_fixture();
        let now = kickoff() + Duration::seconds(65);
        assert_eq!(elapsed_seconds(&fixture, now), Ok(65));
        assert_eq!(minute_number(&fixture, now, ClockRules::default()), Ok(2));
    }

    #[test]
    fn test_open_pause_does_not_count_as_playing_time() {
        let mut fixture = live_fixture();
        fixture.paused_at = Some(kickoff() + Duration::minutes(20));
        // Ten real minutes into the pause the clock still reads 20:00.
        let now = kickoff() + Duration::minutes(30);
        assert_eq!(elapsed_seconds(&fixture, now), Ok(20 * 60));
    }

    #[test]
    fn test_closed_pauses_are_subtracted() {
        let mut fixture = live_fixture();
        fixture.total_paused_secs = 5 * 60;
        let now = kickoff() + Duration::minutes(30);
        assert_eq!(elapsed_seconds(&fixture, now), Ok(25 * 60));
    }

    #[test]
    fn test_clock_freezes_at_half_time() {
        let mut fixture = live_fixture();
        fixture.half_time_at = Some(kickoff() + Duration::minutes(45));
        let during_break = kickoff() + Duration::minutes(53);
        assert_eq!(elapsed_seconds(&fixture, during_break), Ok(45 * 60));
    }

    #[test]
    fn test_clock_freezes_after_full_time() {
        let mut fixture = live_fixture();
        fixture.current_half = Some(Half::Second);
        fixture.second_half_started_at = Some(kickoff() + Duration::minutes(60));
        fixture.half_time_at = Some(kickoff() + Duration::minutes(45));
        fixture.total_paused_secs = 15 * 60;
        fixture.ended_at = Some(kickoff() + Duration::minutes(105));
        let long_after = kickoff() + Duration::hours(6);
        assert_eq!(elapsed_seconds(&fixture, long_after), Ok(90 * 60));
    }

    #[test]
    fn test_clock_skew_never_goes_negative() {
        let fixture = live_fixture();
        // Reader's clock is behind the operator's.
        let now = kickoff() - Duration::seconds(30);
        assert_eq!(elapsed_seconds(&fixture, now), Ok(0));
        assert_eq!(minute_number(&fixture, now, ClockRules::default()), Ok(1));
    }

    #[test]
    fn test_stoppage_cap_clamps_each_half() {
        let rules = ClockRules { half_minutes: 45, stoppage_cap: Some(3) };
        let mut fixture = live_fixture();
        let deep_in_stoppage = kickoff() + Duration::minutes(70);
        assert_eq!(minute_number(&fixture, deep_in_stoppage, rules), Ok(48));

        fixture.current_half = Some(Half::Second);
        fixture.half_time_at = Some(kickoff() + Duration::minutes(45));
        fixture.second_half_started_at = Some(kickoff() + Duration::minutes(60));
        fixture.total_paused_secs = 15 * 60;
        let late = kickoff() + Duration::minutes(120);
        assert_eq!(minute_number(&fixture, late, rules), Ok(93));
    }

    #[test]
    fn test_uncapped_minute_keeps_climbing() {
        let fixture = live_fixture();
        let very_late = kickoff() + Duration::minutes(58);
        assert_eq!(minute_number(&fixture, very_late, ClockRules::default()), Ok(59));
    }
}
