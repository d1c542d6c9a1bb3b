//! Message and response payloads exchanged over the bridge

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::TimerMode;

/// Messages the foreground sends to the background supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// A phase started (or resumed) and will end at `end_time`
    StartTimer {
        #[serde(rename = "endTime")]
        end_time: i64,
    },
    /// The timer was paused or reset; stop watching
    ClearTimer {},
    /// A focus phase completed in the foreground
    TimerComplete { mode: TimerMode, cycle: u32 },
    /// The final rest phase completed in the foreground
    AllCyclesComplete {
        #[serde(rename = "totalCycles")]
        total_cycles: u32,
    },
    /// A UI surface attached; its controller now owns expiry
    SurfaceOpened {},
    /// The UI surface went away; expiry is the background's job again
    SurfaceClosed {},
}

impl Message {
    pub const KINDS: [&'static str; 6] = [
        "startTimer",
        "clearTimer",
        "timerComplete",
        "allCyclesComplete",
        "surfaceOpened",
        "surfaceClosed",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            Message::StartTimer { .. } => "startTimer",
            Message::ClearTimer {} => "clearTimer",
            Message::TimerComplete { .. } => "timerComplete",
            Message::AllCyclesComplete { .. } => "allCyclesComplete",
            Message::SurfaceOpened {} => "surfaceOpened",
            Message::SurfaceClosed {} => "surfaceClosed",
        }
    }

    /// Decode a raw payload, telling unknown kinds apart from malformed
    /// known ones
    pub fn decode(value: Value) -> Result<Self, Rejection> {
        let kind = value.get("type").and_then(Value::as_str).map(str::to_string);
        match kind {
            Some(kind) if Self::KINDS.iter().any(|k| *k == kind) => {
                serde_json::from_value(value).map_err(|e| Rejection::Malformed {
                    kind,
                    reason: e.to_string(),
                })
            }
            other => Err(Rejection::UnknownType(other)),
        }
    }
}

/// Why an incoming payload was not handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnknownType(Option<String>),
    Malformed { kind: String, reason: String },
}

/// Reply to every message, even ones handled asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub const UNKNOWN_TYPE: &'static str = "Unknown message type";

    /// Create a successful response
    pub fn ok(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: None,
            error: Some(message.into()),
        }
    }

    pub fn unknown_type() -> Self {
        Self::error(Self::UNKNOWN_TYPE)
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Rejection> for Response {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::UnknownType(_) => Response::unknown_type(),
            Rejection::Malformed { kind, reason } => {
                Response::error(format!("Malformed {} message: {}", kind, reason))
            }
        }
    }
}
