use chrono::NaiveDateTime;
use std::time::Duration;
use tokio::time::Instant;

/// Decides when the agent evaluates next.
///
/// The agent wakes at the earlier of the next known transition (schedule
/// boundary, session end) and the regular tick interval, so usage-driven
/// rules are still re-checked when no transition is pending.
pub struct WakeScheduler {
    tick_interval: Duration,
}

impl WakeScheduler {
    /// Create a new wake scheduler
    ///
    /// # Arguments
    /// * `tick_interval_secs` - Longest sleep between evaluations in seconds
    pub fn new(tick_interval_secs: u64) -> Self {
        Self {
            tick_interval: Duration::from_secs(tick_interval_secs),
        }
    }

    /// Time to sleep from `now` given the next transition, if any
    pub fn sleep_duration(&self, now: NaiveDateTime, next_transition: Option<NaiveDateTime>) -> Duration {
        let Some(next) = next_transition else {
            return self.tick_interval;
        };

        // A transition in the past means we are late; evaluate right away
        let until = (next - now).to_std().unwrap_or(Duration::ZERO);
        until.min(self.tick_interval)
    }

    /// Monotonic deadline for the next evaluation
    pub fn deadline(&self, now: NaiveDateTime, next_transition: Option<NaiveDateTime>) -> Instant {
        let sleep_duration = self.sleep_duration(now, next_transition);
        tracing::debug!("Sleeping for {} seconds until next evaluation", sleep_duration.as_secs());
        Instant::now() + sleep_duration
    }
}
