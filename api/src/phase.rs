//! Match phase state machine.
//!
//! The phase is never stored. It is derived from the timing fields, so the
//! fixture row cannot drift into contradicting itself, and every transition
//! below validates against the derived phase before stamping anything.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::{Actor, Fixture, FixtureStatus, Half, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scheduled,
    Live(Half),
    Paused(Half),
    HalfTime,
    Completed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Scheduled => "scheduled",
            Phase::Live(_) => "live",
            Phase::Paused(_) => "paused",
            Phase::HalfTime => "at half-time",
            Phase::Completed => "completed",
        }
    }
}

/// The six operator actions, as a value the UI and workers can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    Start,
    Pause,
    Resume,
    EnterHalfTime,
    StartSecondHalf,
    End,
}

impl PhaseAction {
    pub fn label(&self) -> &'static str {
        match self {
            PhaseAction::Start => "start",
            PhaseAction::Pause => "pause",
            PhaseAction::Resume => "resume",
            PhaseAction::EnterHalfTime => "enter half-time",
            PhaseAction::StartSecondHalf => "start the second half",
            PhaseAction::End => "end",
        }
    }
}

impl fmt::Display for PhaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseError {
    /// The action does not apply to the fixture's current phase.
    InvalidTransition { from: Phase, action: PhaseAction },
    /// Completed fixtures accept no transition at all, a second `end`
    /// included.
    AlreadyCompleted,
    /// The actor's role does not allow operating a match.
    Forbidden { required: Role },
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseError::InvalidTransition { from, action } => {
                write!(f, "cannot {} a fixture that is {}", action.label(), from.label())
            }
            PhaseError::AlreadyCompleted => write!(f, "fixture is already completed"),
            PhaseError::Forbidden { required } => {
                write!(f, "requires the {} role", required.label())
            }
        }
    }
}

impl std::error::Error for PhaseError {}

fn require_admin(actor: &Actor) -> Result<(), PhaseError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PhaseError::Forbidden { required: Role::Admin })
    }
}

impl Fixture {
    /// Exactly one phase holds at any instant.
    pub fn phase(&self) -> Phase {
        if self.ended_at.is_some() {
            return Phase::Completed;
        }
        if self.started_at.is_none() {
            return Phase::Scheduled;
        }
        let half = self.current_half.unwrap_or(Half::First);
        if self.half_time_at.is_some() && self.second_half_started_at.is_none() {
            return Phase::HalfTime;
        }
        if self.paused_at.is_some() {
            return Phase::Paused(half);
        }
        Phase::Live(half)
    }

    /// Kick off: Scheduled -> Live(First).
    pub fn start(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), PhaseError> {
        require_admin(actor)?;
        match self.phase() {
            Phase::Scheduled => {
                self.started_at = Some(now);
                self.current_half = Some(Half::First);
                self.status = FixtureStatus::Live;
                Ok(())
            }
            Phase::Completed => Err(PhaseError::AlreadyCompleted),
            from => Err(PhaseError::InvalidTransition { from, action: PhaseAction::Start }),
        }
    }

    /// Stop the clock mid-half: Live(h) -> Paused(h).
    pub fn pause(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), PhaseError> {
        require_admin(actor)?;
        match self.phase() {
            Phase::Live(_) => {
                self.paused_at = Some(now);
                Ok(())
            }
            Phase::Completed => Err(PhaseError::AlreadyCompleted),
            from => Err(PhaseError::InvalidTransition { from, action: PhaseAction::Pause }),
        }
    }

    /// Restart the clock: Paused(h) -> Live(h). The closed pause is folded
    /// into `total_paused_secs`, which only ever grows.
    pub fn resume(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), PhaseError> {
        require_admin(actor)?;
        match self.phase() {
            Phase::Paused(_) => {
                self.fold_open_pause(now);
                Ok(())
            }
            Phase::Completed => Err(PhaseError::AlreadyCompleted),
            from => Err(PhaseError::InvalidTransition { from, action: PhaseAction::Resume }),
        }
    }

    /// Whistle for the break: Live(First) | Paused(First) -> HalfTime.
    /// A pause that is still open is folded first, so the break itself is
    /// accounted once, by `start_second_half`.
    pub fn enter_half_time(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), PhaseError> {
        require_admin(actor)?;
        match self.phase() {
            Phase::Live(Half::First) | Phase::Paused(Half::First) => {
                self.fold_open_pause(now);
                self.half_time_at = Some(now);
                Ok(())
            }
            Phase::Completed => Err(PhaseError::AlreadyCompleted),
            from => {
                Err(PhaseError::InvalidTransition { from, action: PhaseAction::EnterHalfTime })
            }
        }
    }

    /// Back out for the second half: HalfTime -> Live(Second). The whole
    /// break counts as paused time.
    pub fn start_second_half(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), PhaseError> {
        require_admin(actor)?;
        match self.phase() {
            Phase::HalfTime => {
                if let Some(half_time_at) = self.half_time_at {
                    self.total_paused_secs += (now - half_time_at).num_seconds().max(0);
                }
                self.second_half_started_at = Some(now);
                self.current_half = Some(Half::Second);
                Ok(())
            }
            Phase::Completed => Err(PhaseError::AlreadyCompleted),
            from => {
                Err(PhaseError::InvalidTransition { from, action: PhaseAction::StartSecondHalf })
            }
        }
    }

    /// Full time. Allowed from any phase after kick-off; an open pause or
    /// an unfinished break is folded so the final clock reads playing time
    /// only.
    pub fn end(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), PhaseError> {
        require_admin(actor)?;
        match self.phase() {
            Phase::Live(_) | Phase::Paused(_) => {
                self.fold_open_pause(now);
                self.ended_at = Some(now);
                self.status = FixtureStatus::Completed;
                Ok(())
            }
            Phase::HalfTime => {
                if let Some(half_time_at) = self.half_time_at {
                    self.total_paused_secs += (now - half_time_at).num_seconds().max(0);
                }
                self.ended_at = Some(now);
                self.status = FixtureStatus::Completed;
                Ok(())
            }
            Phase::Completed => Err(PhaseError::AlreadyCompleted),
            from @ Phase::Scheduled => {
                Err(PhaseError::InvalidTransition { from, action: PhaseAction::End })
            }
        }
    }

    fn fold_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused_secs += (now - paused_at).num_seconds().max(0);
        }
    }
}

/// Dispatch an action value to the matching transition.
pub fn apply(
    fixture: &mut Fixture,
    actor: &Actor,
    action: PhaseAction,
    now: DateTime<Utc>,
) -> Result<(), PhaseError> {
    match action {
        PhaseAction::Start => fixture.start(actor, now),
        PhaseAction::Pause => fixture.pause(actor, now),
        PhaseAction::Resume => fixture.resume(actor, now),
        PhaseAction::EnterHalfTime => fixture.enter_half_time(actor, now),
        PhaseAction::StartSecondHalf => fixture.start_second_half(actor, now),
        PhaseAction::End => fixture.end(actor, now),
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

    fn scheduled() -> Fixture {
        Fixture { id: "fx1".into(), team_a: "ax".into(), team_b: "bx".into(), ..Fixture::default() }
    }

    #[test]
    fn test_start_stamps_kickoff() {
        let mut fixture = scheduled();
        assert_eq!(fixture.phase(), Phase::Scheduled);
        fixture.start(&admin(), kickoff()).unwrap();
        assert_eq!(fixture.phase(), Phase::Live(Half::First));
        assert_eq!(fixture.status, FixtureStatus::Live);
        assert_eq!(fixture.started_at, Some(kickoff()));
        assert_eq!(fixture.current_half, Some(Half::First));
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        let err = fixture.start(&admin(), t(1)).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: Phase::Live(Half::First),
                action: PhaseAction::Start
            }
        );
    }

    #[test]
    fn test_pause_requires_live() {
        let mut fixture = scheduled();
        let err = fixture.pause(&admin(), kickoff()).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition { from: Phase::Scheduled, action: PhaseAction::Pause }
        );

        fixture.start(&admin(), kickoff()).unwrap();
        fixture.pause(&admin(), t(10)).unwrap();
        assert_eq!(fixture.phase(), Phase::Paused(Half::First));
        let err = fixture.pause(&admin(), t(11)).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: Phase::Paused(Half::First),
                action: PhaseAction::Pause
            }
        );
    }

    #[test]
    fn test_resume_folds_the_open_pause() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.pause(&admin(), t(20)).unwrap();
        fixture.resume(&admin(), t(25)).unwrap();
        assert_eq!(fixture.phase(), Phase::Live(Half::First));
        assert_eq!(fixture.total_paused_secs, 5 * 60);
        assert_eq!(fixture.paused_at, None);
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        let err = fixture.resume(&admin(), t(5)).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: Phase::Live(Half::First),
                action: PhaseAction::Resume
            }
        );
    }

    #[test]
    fn test_half_time_from_mid_pause_folds_first() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.pause(&admin(), t(40)).unwrap();
        fixture.enter_half_time(&admin(), t(44)).unwrap();
        assert_eq!(fixture.phase(), Phase::HalfTime);
        assert_eq!(fixture.total_paused_secs, 4 * 60);
        assert_eq!(fixture.paused_at, None);
        assert_eq!(fixture.half_time_at, Some(t(44)));
    }

    #[test]
    fn test_half_time_only_in_first_half() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.enter_half_time(&admin(), t(45)).unwrap();
        fixture.start_second_half(&admin(), t(60)).unwrap();
        let err = fixture.enter_half_time(&admin(), t(70)).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: Phase::Live(Half::Second),
                action: PhaseAction::EnterHalfTime
            }
        );
    }

    #[test]
    fn test_second_half_counts_the_break_as_paused() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.enter_half_time(&admin(), t(45)).unwrap();
        fixture.start_second_half(&admin(), t(60)).unwrap();
        assert_eq!(fixture.phase(), Phase::Live(Half::Second));
        assert_eq!(fixture.total_paused_secs, 15 * 60);
        assert_eq!(fixture.current_half, Some(Half::Second));
        assert_eq!(fixture.second_half_started_at, Some(t(60)));
    }

    #[test]
    fn test_second_half_requires_the_break() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        let err = fixture.start_second_half(&admin(), t(45)).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: Phase::Live(Half::First),
                action: PhaseAction::StartSecondHalf
            }
        );
    }

    #[test]
    fn test_end_before_start_is_invalid() {
        let mut fixture = scheduled();
        let err = fixture.end(&admin(), kickoff()).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition { from: Phase::Scheduled, action: PhaseAction::End }
        );
    }

    #[test]
    fn test_second_end_fails_already_completed() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.end(&admin(), t(90)).unwrap();
        assert_eq!(fixture.phase(), Phase::Completed);
        assert_eq!(fixture.status, FixtureStatus::Completed);
        assert_eq!(fixture.end(&admin(), t(91)), Err(PhaseError::AlreadyCompleted));
        assert_eq!(fixture.pause(&admin(), t(91)), Err(PhaseError::AlreadyCompleted));
        assert_eq!(fixture.start(&admin(), t(91)), Err(PhaseError::AlreadyCompleted));
    }

    #[test]
    fn test_end_during_pause_folds_the_pause() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.pause(&admin(), t(80)).unwrap();
        fixture.end(&admin(), t(85)).unwrap();
        assert_eq!(fixture.total_paused_secs, 5 * 60);
        assert_eq!(fixture.ended_at, Some(t(85)));
    }

    #[test]
    fn test_end_at_half_time_freezes_first_half_clock() {
        let mut fixture = scheduled();
        fixture.start(&admin(), kickoff()).unwrap();
        fixture.enter_half_time(&admin(), t(45)).unwrap();
        fixture.end(&admin(), t(55)).unwrap();
        assert_eq!(fixture.phase(), Phase::Completed);
        // The abandoned break is paused time, so the clock reads 45:00.
        let elapsed = crate::clock::elapsed_seconds(&fixture, t(300)).unwrap();
        assert_eq!(elapsed, 45 * 60);
    }

    #[test]
    fn test_viewer_and_manager_are_forbidden() {
        let viewer = Actor::viewer();
        let manager = Actor { email: "boss@cup.test".into(), role: Role::Manager };
        let mut fixture = scheduled();
        assert_eq!(
            fixture.start(&viewer, kickoff()),
            Err(PhaseError::Forbidden { required: Role::Admin })
        );
        assert_eq!(
            fixture.start(&manager, kickoff()),
            Err(PhaseError::Forbidden { required: Role::Admin })
        );
        assert_eq!(fixture.phase(), Phase::Scheduled);
    }

    #[test]
    fn test_apply_dispatches_every_action() {
        let mut fixture = scheduled();
        apply(&mut fixture, &admin(), PhaseAction::Start, kickoff()).unwrap();
        apply(&mut fixture, &admin(), PhaseAction::Pause, t(10)).unwrap();
        apply(&mut fixture, &admin(), PhaseAction::Resume, t(12)).unwrap();
        apply(&mut fixture, &admin(), PhaseAction::EnterHalfTime, t(45)).unwrap();
        apply(&mut fixture, &admin(), PhaseAction::StartSecondHalf, t(60)).unwrap();
        apply(&mut fixture, &admin(), PhaseAction::End, t(105)).unwrap();
        assert_eq!(fixture.phase(), Phase::Completed);
        assert_eq!(fixture.total_paused_secs, 17 * 60);
    }
}
