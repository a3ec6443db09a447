use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use crate::focus::mode::AppSelector;

/// Today's activity counters, read once per tick
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsageSnapshot {
    pub date: NaiveDate,

    /// Foreground seconds per app
    #[serde(default)]
    pub app_seconds: BTreeMap<AppSelector, u64>,

    /// Device unlocks
    #[serde(default)]
    pub unlocks: u32,
}

impl UsageSnapshot {
    /// Counters for a day with no recorded activity
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            app_seconds: BTreeMap::new(),
            unlocks: 0,
        }
    }

    /// Counters beyond what a `Duration` can hold saturate
    pub fn usage_of(&self, app: &AppSelector) -> Duration {
        let seconds = self.app_seconds.get(app).copied().unwrap_or(0);
        i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Counters reset at local midnight: a snapshot from another day is empty
    pub fn for_day(self, today: NaiveDate) -> Self {
        if self.date == today {
            self
        } else {
            debug!("Usage snapshot is from {}, treating {} as empty", self.date, today);
            Self::empty(today)
        }
    }
}

/// External activity tracker feeding per-app usage and unlock counts
pub trait UsageSource: Send + Sync {
    fn snapshot(&self, today: NaiveDate) -> Result<UsageSnapshot>;
}

/// JSON file written by an activity tracker
pub struct JsonUsageFile {
    path: PathBuf,
}

impl JsonUsageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UsageSource for JsonUsageFile {
    fn snapshot(&self, today: NaiveDate) -> Result<UsageSnapshot> {
        if !self.path.exists() {
            return Ok(UsageSnapshot::empty(today));
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read usage file: {}", self.path.display()))?;

        let snapshot: UsageSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse usage file: {}", self.path.display()))?;

        Ok(snapshot.for_day(today))
    }
}
