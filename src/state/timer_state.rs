//! Timer state and settings records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which kind of countdown is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Focus,
    Rest,
}

impl TimerMode {
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::Rest => "rest",
        }
    }
}

/// Coarse view of the state machine, derived from the run flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "mode", rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running(TimerMode),
    Paused(TimerMode),
}

/// User configuration for the timer, persisted under `timerSettings`.
///
/// Deserialization never fails: missing, non-numeric or non-positive fields
/// fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct TimerSettings {
    pub focus_minutes: u32,
    pub rest_minutes: u32,
    pub total_cycles: u32,
}

impl TimerSettings {
    pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
    pub const DEFAULT_REST_MINUTES: u32 = 5;
    pub const DEFAULT_TOTAL_CYCLES: u32 = 4;

    pub fn new(focus_minutes: u32, rest_minutes: u32, total_cycles: u32) -> Self {
        Self {
            focus_minutes: positive_or(focus_minutes, Self::DEFAULT_FOCUS_MINUTES),
            rest_minutes: positive_or(rest_minutes, Self::DEFAULT_REST_MINUTES),
            total_cycles: positive_or(total_cycles, Self::DEFAULT_TOTAL_CYCLES),
        }
    }

    /// Build settings from raw configuration inputs
    pub fn from_inputs(focus: &str, rest: &str, cycles: &str) -> Self {
        Self {
            focus_minutes: parse_lenient(&Value::String(focus.to_string()))
                .unwrap_or(Self::DEFAULT_FOCUS_MINUTES),
            rest_minutes: parse_lenient(&Value::String(rest.to_string()))
                .unwrap_or(Self::DEFAULT_REST_MINUTES),
            total_cycles: parse_lenient(&Value::String(cycles.to_string()))
                .unwrap_or(Self::DEFAULT_TOTAL_CYCLES),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str, default: u32| {
            value.get(name).and_then(parse_lenient).unwrap_or(default)
        };

        Self {
            focus_minutes: field("focusMinutes", Self::DEFAULT_FOCUS_MINUTES),
            rest_minutes: field("restMinutes", Self::DEFAULT_REST_MINUTES),
            total_cycles: field("totalCycles", Self::DEFAULT_TOTAL_CYCLES),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: Self::DEFAULT_FOCUS_MINUTES,
            rest_minutes: Self::DEFAULT_REST_MINUTES,
            total_cycles: Self::DEFAULT_TOTAL_CYCLES,
        }
    }
}

impl From<Value> for TimerSettings {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

fn positive_or(value: u32, default: u32) -> u32 {
    if value > 0 { value } else { default }
}

/// Accept positive integers given as numbers or numeric strings.
/// Fractions are truncated; anything below 1 is rejected.
fn parse_lenient(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return None;
            }
            digits.parse::<f64>().ok()?
        }
        _ => return None,
    };

    if number.is_finite() && number >= 1.0 && number <= u32::MAX as f64 {
        Some(number.trunc() as u32)
    } else {
        None
    }
}

/// The one timer instance, owned by the foreground controller and mirrored
/// to the store under `timerState`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    pub is_paused: bool,
    pub mode: TimerMode,
    pub current_cycle: u32,
    pub total_cycles: u32,
    pub focus_minutes: u32,
    pub rest_minutes: u32,
    /// Seconds left in the current phase
    pub time_left: u64,
    /// Length of the current phase in seconds
    pub total_time: u64,
    /// Absolute deadline in epoch milliseconds, only set while running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl TimerState {
    /// Create an idle timer seeded from settings
    pub fn new(settings: &TimerSettings) -> Self {
        let focus_seconds = u64::from(settings.focus_minutes) * 60;
        Self {
            is_running: false,
            is_paused: false,
            mode: TimerMode::Focus,
            current_cycle: 1,
            total_cycles: settings.total_cycles,
            focus_minutes: settings.focus_minutes,
            rest_minutes: settings.rest_minutes,
            time_left: focus_seconds,
            total_time: focus_seconds,
            end_time: None,
        }
    }

    pub fn status(&self) -> TimerStatus {
        if self.is_running {
            TimerStatus::Running(self.mode)
        } else if self.is_paused {
            TimerStatus::Paused(self.mode)
        } else {
            TimerStatus::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status() == TimerStatus::Idle
    }

    /// Phase length in seconds for the given mode
    pub fn phase_seconds(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => u64::from(self.focus_minutes) * 60,
            TimerMode::Rest => u64::from(self.rest_minutes) * 60,
        }
    }

    /// Whole seconds until `end_time`, never negative
    pub fn remaining_at(&self, now_ms: i64) -> Option<u64> {
        self.end_time
            .map(|end| (end.saturating_sub(now_ms)).max(0) as u64 / 1000)
    }

    /// Whether a running timer's deadline has passed
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.is_running && self.end_time.is_some_and(|end| now_ms >= end)
    }

    /// Repair a record read back from storage so the invariants hold
    pub fn sanitized(mut self) -> Self {
        self.focus_minutes = positive_or(self.focus_minutes, TimerSettings::DEFAULT_FOCUS_MINUTES);
        self.rest_minutes = positive_or(self.rest_minutes, TimerSettings::DEFAULT_REST_MINUTES);
        self.total_cycles = positive_or(self.total_cycles, TimerSettings::DEFAULT_TOTAL_CYCLES);
        self.current_cycle = self.current_cycle.clamp(1, self.total_cycles);
        if self.total_time == 0 {
            self.total_time = self.phase_seconds(self.mode);
        }
        self.time_left = self.time_left.min(self.total_time);
        if self.is_running {
            self.is_paused = false;
            if self.end_time.is_none() {
                self.is_running = false;
                self.is_paused = true;
            }
        } else {
            self.end_time = None;
        }
        self
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(&TimerSettings::default())
    }
}
