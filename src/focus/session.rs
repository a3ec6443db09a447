use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::focus::error::{SessionError, SessionLockedError};

/// Lifecycle of a flow session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }
}

/// Countdown for a single flow session.
///
/// Paused time does not count towards the duration. A pause longer than the
/// configured break time ends on its own and the countdown resumes.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    state: SessionState,
    strict: bool,
    duration: Duration,
    break_time: Duration,
    started_at: Option<NaiveDateTime>,
    paused_at: Option<NaiveDateTime>,
    paused_total: Duration,
}

impl SessionTimer {
    pub fn new(strict: bool, break_time: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            strict,
            duration: Duration::zero(),
            break_time,
            started_at: None,
            paused_at: None,
            paused_total: Duration::zero(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Idle -> Running
    pub fn start(&mut self, duration: Duration, now: NaiveDateTime) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "start",
            });
        }

        self.state = SessionState::Running;
        self.duration = duration;
        self.started_at = Some(now);
        self.paused_at = None;
        self.paused_total = Duration::zero();
        Ok(())
    }

    /// Advance the session to `now`, ending expired breaks and completing
    /// the countdown once elapsed reaches the duration
    pub fn tick(&mut self, now: NaiveDateTime) -> SessionState {
        if self.state == SessionState::Paused {
            if let Some(paused_at) = self.paused_at {
                if self.break_time > Duration::zero() && now - paused_at >= self.break_time {
                    self.paused_total = self.paused_total + self.break_time;
                    self.paused_at = None;
                    self.state = SessionState::Running;
                }
            }
        }

        if self.state == SessionState::Running && self.elapsed(now) >= self.duration {
            self.state = SessionState::Completed;
        }

        self.state
    }

    /// Running -> Paused, refused for strict sessions
    pub fn pause(&mut self, now: NaiveDateTime) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "pause",
            });
        }
        if self.strict {
            return Err(self.locked(now).into());
        }

        self.paused_at = Some(now);
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Paused -> Running
    pub fn resume(&mut self, now: NaiveDateTime) -> Result<(), SessionError> {
        if self.state != SessionState::Paused {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: "resume",
            });
        }

        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total = self.paused_total + (now - paused_at).max(Duration::zero());
        }
        self.state = SessionState::Running;
        Ok(())
    }

    /// Cancel the session. A strict session is refused until its time is up;
    /// once elapsed reaches the duration it is completed, not cancellable.
    pub fn cancel(&mut self, now: NaiveDateTime) -> Result<(), SessionError> {
        match self.tick(now) {
            SessionState::Running | SessionState::Paused if self.strict => Err(self.locked(now).into()),
            SessionState::Idle | SessionState::Running | SessionState::Paused => {
                self.state = SessionState::Cancelled;
                self.paused_at = None;
                Ok(())
            }
            state @ (SessionState::Completed | SessionState::Cancelled) => {
                Err(SessionError::InvalidTransition {
                    from: state,
                    action: "cancel",
                })
            }
        }
    }

    /// Active time so far, excluding pauses
    pub fn elapsed(&self, now: NaiveDateTime) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::zero();
        };

        let until = match self.state {
            SessionState::Paused => self.paused_at.unwrap_or(now),
            _ => now,
        };

        if self.state == SessionState::Completed {
            return self.duration;
        }

        (until - started_at - self.paused_total).max(Duration::zero())
    }

    /// Time left, never negative
    pub fn remaining(&self, now: NaiveDateTime) -> Duration {
        match self.state {
            SessionState::Idle => self.duration,
            SessionState::Completed | SessionState::Cancelled => Duration::zero(),
            SessionState::Running | SessionState::Paused => {
                (self.duration - self.elapsed(now)).max(Duration::zero())
            }
        }
    }

    /// When a running session will complete if not paused
    pub fn ends_at(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.state {
            SessionState::Running => Some(now + self.remaining(now)),
            _ => None,
        }
    }

    /// When a paused session's break runs out
    pub fn break_ends_at(&self) -> Option<NaiveDateTime> {
        match (self.state, self.paused_at) {
            (SessionState::Paused, Some(paused_at)) if self.break_time > Duration::zero() => {
                Some(paused_at + self.break_time)
            }
            _ => None,
        }
    }

    fn locked(&self, now: NaiveDateTime) -> SessionLockedError {
        SessionLockedError {
            remaining_secs: self.remaining(now).num_seconds(),
        }
    }
}
