use chrono::{Datelike, Duration, NaiveDateTime};

use crate::focus::mode::{DayOfWeek, Schedule};

/// Evaluates recurring schedule windows against local wall-clock time
pub struct ScheduleEvaluator;

impl ScheduleEvaluator {
    /// Whether the schedule window covers `now`.
    ///
    /// A window that crosses midnight is attributed to the day it starts on,
    /// so the early-morning tail checks the previous weekday. Empty day sets
    /// and zero-width windows (start == end) are never active.
    pub fn is_active(schedule: &Schedule, now: NaiveDateTime) -> bool {
        if schedule.days.is_empty() || schedule.start == schedule.end {
            return false;
        }

        let time = now.time();
        let today = DayOfWeek::from(now.weekday());

        if schedule.start < schedule.end {
            schedule.days.contains(&today) && schedule.start <= time && time < schedule.end
        } else {
            let yesterday = DayOfWeek::from(now.weekday().pred());
            (time >= schedule.start && schedule.days.contains(&today))
                || (time < schedule.end && schedule.days.contains(&yesterday))
        }
    }

    /// Smallest instant after `now` at which `is_active` flips.
    ///
    /// Returns `None` for schedules that never activate.
    pub fn next_transition(schedule: &Schedule, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if schedule.days.is_empty() || schedule.start == schedule.end {
            return None;
        }

        let active_now = Self::is_active(schedule, now);

        // A window starting yesterday may still be open; a week and a day
        // ahead always contains the next start on some listed day.
        let mut boundaries: Vec<NaiveDateTime> = (-1..=8)
            .map(|offset| now.date() + Duration::days(offset))
            .filter(|date| schedule.days.contains(&DayOfWeek::from(date.weekday())))
            .flat_map(|date| {
                let start = date.and_time(schedule.start);
                let end_date = if schedule.crosses_midnight() {
                    date + Duration::days(1)
                } else {
                    date
                };
                [start, end_date.and_time(schedule.end)]
            })
            .filter(|instant| *instant > now)
            .collect();

        boundaries.sort();
        boundaries.dedup();

        boundaries
            .into_iter()
            .find(|instant| Self::is_active(schedule, *instant) != active_now)
    }
}
