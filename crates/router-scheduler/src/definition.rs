//! Schedule definitions and their configuration forms
//!
//! Durations in configuration are either a human-duration map
//! (`{ minutes: 5, seconds: 30 }`) or an ISO-8601 duration string (`PT5M30S`).
//! A frequency may additionally be a cron expression (`{ cron: "*/5 * * * *" }`)
//! or manual-only (`{ trigger: "manual" }`).

use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How often a task fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frequency {
    /// Fixed interval between the starts of consecutive runs
    Every(Duration),

    /// Cron expression with a leading seconds field
    Cron(String),

    /// Runs only when explicitly triggered
    Manual,
}

impl Frequency {
    /// Build a cron frequency, accepting 5-field (minute resolution) or
    /// 6/7-field expressions
    pub fn cron(expr: &str) -> SchedulerResult<Self> {
        let expr = expr.trim();
        let normalized = if expr.split_whitespace().count() == 5 {
            format!("0 {}", expr)
        } else {
            expr.to_string()
        };

        cron::Schedule::from_str(&normalized).map_err(|e| {
            SchedulerError::InvalidSchedule(format!("invalid cron expression '{}': {}", expr, e))
        })?;

        Ok(Frequency::Cron(normalized))
    }
}

/// Fully resolved schedule for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDefinition {
    pub frequency: Frequency,

    /// Per-run budget; a run exceeding it is cancelled
    pub timeout: Duration,

    /// Delay before the first tick
    pub initial_delay: Duration,
}

impl ScheduleDefinition {
    pub fn every(frequency: Duration, timeout: Duration) -> Self {
        Self {
            frequency: Frequency::Every(frequency),
            timeout,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Resolve and validate a configuration block
    pub fn from_config(config: &ScheduleDefinitionConfig) -> SchedulerResult<Self> {
        let frequency = match &config.frequency {
            FrequencyConfig::Cron { cron } => Frequency::cron(cron)?,
            FrequencyConfig::Trigger { trigger } => {
                if trigger != "manual" {
                    return Err(SchedulerError::InvalidSchedule(format!(
                        "unknown trigger '{}', expected 'manual'",
                        trigger
                    )));
                }
                Frequency::Manual
            }
            FrequencyConfig::Duration(duration) => {
                let every = duration.to_duration()?;
                if every.is_zero() {
                    return Err(SchedulerError::InvalidSchedule(
                        "frequency must be greater than zero".to_string(),
                    ));
                }
                Frequency::Every(every)
            }
        };

        let timeout = config.timeout.to_duration()?;
        if timeout.is_zero() {
            return Err(SchedulerError::InvalidSchedule(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let initial_delay = match &config.initial_delay {
            Some(delay) => delay.to_duration()?,
            None => Duration::ZERO,
        };

        Ok(Self {
            frequency,
            timeout,
            initial_delay,
        })
    }
}

/// Schedule block as it appears in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDefinitionConfig {
    pub frequency: FrequencyConfig,
    pub timeout: DurationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay: Option<DurationConfig>,
}

/// Frequency as it appears in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrequencyConfig {
    Cron { cron: String },
    Trigger { trigger: String },
    Duration(DurationConfig),
}

/// Duration as it appears in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationConfig {
    Iso(String),
    Human(HumanDuration),
}

impl DurationConfig {
    pub fn to_duration(&self) -> SchedulerResult<Duration> {
        match self {
            DurationConfig::Iso(text) => parse_iso_duration(text),
            DurationConfig::Human(human) => human.to_duration(),
        }
    }
}

impl From<HumanDuration> for DurationConfig {
    fn from(human: HumanDuration) -> Self {
        DurationConfig::Human(human)
    }
}

/// Human-readable duration map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanDuration {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub days: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hours: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub minutes: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub seconds: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub milliseconds: u64,
}

impl HumanDuration {
    pub fn seconds(seconds: u64) -> Self {
        Self {
            seconds,
            ..Default::default()
        }
    }

    pub fn minutes(minutes: u64) -> Self {
        Self {
            minutes,
            ..Default::default()
        }
    }

    /// Total length; rejects values that do not fit in a [`Duration`]
    pub fn to_duration(&self) -> SchedulerResult<Duration> {
        let secs = [
            (self.days, 86_400),
            (self.hours, 3_600),
            (self.minutes, 60),
            (self.seconds, 1),
        ]
        .into_iter()
        .try_fold(0u64, |acc, (value, scale)| {
            value.checked_mul(scale).and_then(|s| acc.checked_add(s))
        });

        secs.and_then(|secs| {
            Duration::from_secs(secs).checked_add(Duration::from_millis(self.milliseconds))
        })
        .ok_or_else(|| SchedulerError::InvalidSchedule(format!("duration {:?} is too large", self)))
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Parse an ISO-8601 duration (`P1DT2H`, `PT30S`, `PT0.5S`, `P2W`)
///
/// Years and months are rejected since they have no fixed length.
pub fn parse_iso_duration(text: &str) -> SchedulerResult<Duration> {
    let invalid = || SchedulerError::InvalidSchedule(format!("invalid ISO-8601 duration '{}'", text));

    let rest = text.trim().strip_prefix('P').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            unit => {
                let value: f64 = number.parse().map_err(|_| invalid())?;
                number.clear();
                let scale = match (in_time, unit) {
                    (false, 'W') => 604_800.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return Err(invalid()),
                };
                total += value * scale;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return Err(invalid());
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}
