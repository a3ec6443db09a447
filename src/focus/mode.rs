use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::focus::error::{RuleConfigError, ScheduleConfigError};

/// Identifier of an application the enforcement hook understands
/// (bundle id, executable name, desktop file id, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AppSelector(pub String);

impl AppSelector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Day of the week, lowercase in YAML
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub const WEEKDAYS: [DayOfWeek; 5] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    /// Parse a day name or common abbreviation ("mon", "tue", ...)
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|day| day.name() == lower || day.name()[..3] == lower)
    }

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

/// Recurring wall-clock window. If `end < start` the window spans midnight
/// and belongs to the day it starts on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Schedule {
    #[serde(with = "clock_time")]
    pub start: NaiveTime,

    #[serde(with = "clock_time")]
    pub end: NaiveTime,

    pub days: BTreeSet<DayOfWeek>,
}

impl Schedule {
    pub fn new(start: NaiveTime, end: NaiveTime, days: impl IntoIterator<Item = DayOfWeek>) -> Self {
        Self {
            start,
            end,
            days: days.into_iter().collect(),
        }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn validate(&self) -> Result<(), ScheduleConfigError> {
        if self.days.is_empty() {
            return Err(ScheduleConfigError::EmptyDays);
        }
        if self.start == self.end {
            return Err(ScheduleConfigError::ZeroWidthWindow(
                self.start.format("%H:%M").to_string(),
            ));
        }
        Ok(())
    }
}

/// Daily usage ceiling for one app
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppLimit {
    pub app: AppSelector,
    pub limit_minutes: u32,
}

impl AppLimit {
    pub fn time_limit(&self) -> Duration {
        Duration::minutes(self.limit_minutes as i64)
    }
}

/// Daily ceiling on device unlocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PickupLimit {
    pub max_unlocks: u32,
}

/// A single bounded focus interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlowSession {
    pub duration_minutes: u32,

    /// Longest allowed pause before the session resumes on its own
    #[serde(default)]
    pub break_minutes: u32,
}

impl FlowSession {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }

    pub fn break_time(&self) -> Duration {
        Duration::minutes(self.break_minutes as i64)
    }
}

/// What makes a focus mode restrict
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationRule {
    Schedule(Schedule),
    AppLimits { limits: Vec<AppLimit> },
    PickupLimit(PickupLimit),
    FlowSession(FlowSession),
}

impl ActivationRule {
    pub fn kind(&self) -> &'static str {
        match self {
            ActivationRule::Schedule(_) => "schedule",
            ActivationRule::AppLimits { .. } => "app limits",
            ActivationRule::PickupLimit(_) => "pickup limit",
            ActivationRule::FlowSession(_) => "flow session",
        }
    }

    pub fn validate(&self) -> Result<(), RuleConfigError> {
        match self {
            ActivationRule::Schedule(schedule) => schedule.validate()?,
            ActivationRule::AppLimits { limits } => {
                if limits.is_empty() {
                    return Err(RuleConfigError::EmptyAppLimits);
                }
                if let Some(zero) = limits.iter().find(|l| l.limit_minutes == 0) {
                    return Err(RuleConfigError::ZeroAppLimit(zero.app.to_string()));
                }
            }
            ActivationRule::PickupLimit(_) => {}
            ActivationRule::FlowSession(flow) => {
                if flow.duration_minutes == 0 {
                    return Err(RuleConfigError::ZeroFlowDuration);
                }
            }
        }
        Ok(())
    }
}

/// A named restriction policy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FocusMode {
    pub id: Uuid,

    pub name: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Strict modes cannot be paused or cancelled while a session runs
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub blocked_apps: BTreeSet<AppSelector>,

    /// `None` means the mode is inert and never restricts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<ActivationRule>,
}

fn default_icon() -> String {
    "moon".to_string()
}

fn default_true() -> bool {
    true
}

impl FocusMode {
    /// Create an enabled, non-strict mode with a fresh id
    pub fn new(name: impl Into<String>, rule: Option<ActivationRule>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: default_icon(),
            enabled: true,
            strict: false,
            blocked_apps: BTreeSet::new(),
            rule,
        }
    }

    pub fn with_blocked_apps<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_apps = apps.into_iter().map(|a| AppSelector::new(a)).collect();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn flow_session(&self) -> Option<&FlowSession> {
        match &self.rule {
            Some(ActivationRule::FlowSession(flow)) => Some(flow),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), RuleConfigError> {
        if self.name.trim().is_empty() {
            return Err(RuleConfigError::EmptyName);
        }
        if let Some(rule) = &self.rule {
            rule.validate()?;
        }
        Ok(())
    }

    /// Short id used in CLI output
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Serialize `NaiveTime` as "HH:MM", accepting "HH:MM:SS" on input
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}

/// Parse "HH:MM" from the command line
pub fn parse_clock_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|e| anyhow::anyhow!("Invalid time '{}' (expected HH:MM): {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_day_parse_accepts_names_and_abbreviations() {
        assert_eq!(DayOfWeek::parse("Monday"), Some(DayOfWeek::Monday));
        assert_eq!(DayOfWeek::parse("sat"), Some(DayOfWeek::Saturday));
        assert_eq!(DayOfWeek::parse("funday"), None);
    }

    #[test]
    fn test_day_weekday_conversion() {
        for day in DayOfWeek::ALL {
            let weekday: Weekday = day.into();
            assert_eq!(DayOfWeek::from(weekday), day);
        }
    }

    #[test]
    fn test_schedule_validation() {
        let ok = Schedule::new(hm(9, 0), hm(17, 0), DayOfWeek::WEEKDAYS);
        assert!(ok.validate().is_ok());

        let no_days = Schedule::new(hm(9, 0), hm(17, 0), []);
        assert_eq!(no_days.validate(), Err(ScheduleConfigError::EmptyDays));

        let zero = Schedule::new(hm(9, 0), hm(9, 0), [DayOfWeek::Monday]);
        assert!(matches!(zero.validate(), Err(ScheduleConfigError::ZeroWidthWindow(_))));
    }

    #[test]
    fn test_rule_validation() {
        let empty = ActivationRule::AppLimits { limits: vec![] };
        assert_eq!(empty.validate(), Err(RuleConfigError::EmptyAppLimits));

        let zero = ActivationRule::AppLimits {
            limits: vec![AppLimit {
                app: AppSelector::new("slack"),
                limit_minutes: 0,
            }],
        };
        assert_eq!(zero.validate(), Err(RuleConfigError::ZeroAppLimit("slack".to_string())));

        let flow = ActivationRule::FlowSession(FlowSession {
            duration_minutes: 0,
            break_minutes: 5,
        });
        assert_eq!(flow.validate(), Err(RuleConfigError::ZeroFlowDuration));

        assert!(ActivationRule::PickupLimit(PickupLimit { max_unlocks: 0 }).validate().is_ok());
    }

    #[test]
    fn test_mode_without_rule_is_valid_but_inert() {
        let mode = FocusMode::new("Inert", None);
        assert!(mode.validate().is_ok());
        assert!(mode.flow_session().is_none());
    }

    #[test]
    fn test_mode_requires_name() {
        let mode = FocusMode::new("  ", None);
        assert_eq!(mode.validate(), Err(RuleConfigError::EmptyName));
    }

    #[test]
    fn test_mode_yaml_format() {
        let yaml = r#"
id: 6f1c2a4e-8d8b-4a7e-9a55-2b7f0f3d1c11
name: Work Focus
strict: true
blocked_apps: [slack, discord]
rule:
  type: schedule
  start: "22:00"
  end: "06:00"
  days: [monday, friday]
"#;
        let mode: FocusMode = serde_yaml::from_str(yaml).unwrap();
        assert!(mode.enabled);
        assert!(mode.strict);
        assert_eq!(mode.icon, "moon");
        assert_eq!(mode.blocked_apps.len(), 2);

        match &mode.rule {
            Some(ActivationRule::Schedule(schedule)) => {
                assert_eq!(schedule.start, hm(22, 0));
                assert!(schedule.crosses_midnight());
                assert!(schedule.days.contains(&DayOfWeek::Friday));
            }
            other => panic!("unexpected rule: {:?}", other),
        }

        let out = serde_yaml::to_string(&mode).unwrap();
        assert!(out.contains("start: 22:00") || out.contains("start: '22:00'"));
    }

    #[test]
    fn test_app_limits_yaml_format() {
        let yaml = r#"
type: app_limits
limits:
  - app: instagram
    limit_minutes: 30
"#;
        let rule: ActivationRule = serde_yaml::from_str(yaml).unwrap();
        match rule {
            ActivationRule::AppLimits { limits } => {
                assert_eq!(limits[0].time_limit(), Duration::minutes(30));
            }
            other => panic!("unexpected rule: {:?}", other),
        }
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("07:30").unwrap(), hm(7, 30));
        assert!(parse_clock_time("7pm").is_err());
    }
}
