//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    state::{TimerState, TimerStatus},
    utils::format_time_left,
};

/// API response structure for actions without a richer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Create a success response
    pub fn ok(message: String) -> Self {
        Self::new("ok".to_string(), message)
    }
}

/// Timer snapshot as shown by the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub status: TimerStatus,
    /// `MM:SS` rendering of the time left
    pub display: String,
    pub timer: TimerState,
    pub timestamp: DateTime<Utc>,
}

impl From<TimerState> for TimerView {
    fn from(timer: TimerState) -> Self {
        Self {
            status: timer.status(),
            display: format_time_left(timer.time_left),
            timer,
            timestamp: Utc::now(),
        }
    }
}

/// Would a URL be blocked right now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockCheckResponse {
    pub url: String,
    pub host: Option<String>,
    pub blocked: bool,
}

/// Service status with surface and timer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub surface_attached: bool,
    pub timer: Option<TimerView>,
    pub alert_viewers: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
