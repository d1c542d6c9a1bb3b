//! On-page alert overlays for the currently viewed surface

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Overlay to show on top of whatever the user is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Alert {
    /// The watchdog saw a deadline pass with no foreground attached
    TimeUp,
    FocusComplete {
        cycle: u32,
    },
    AllCyclesComplete {
        #[serde(rename = "totalCycles")]
        total_cycles: u32,
    },
}

impl Alert {
    pub fn title(&self) -> &'static str {
        match self {
            Alert::TimeUp => "Time's Up!",
            Alert::FocusComplete { .. } => "Focus complete!",
            Alert::AllCyclesComplete { .. } => "All cycles complete!",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Alert::TimeUp => "Your timer has ended!".to_string(),
            Alert::FocusComplete { cycle } => {
                format!("Cycle {} focus session done. Time for a break.", cycle)
            }
            Alert::AllCyclesComplete { total_cycles } => {
                format!("You finished all {} cycles. Great work!", total_cycles)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("no eligible surface to show the alert on")]
    TargetUnavailable,
}

/// Something that can overlay an alert on the active surface
pub trait AlertSurface: Send + Sync {
    fn show_alert(&self, alert: Alert) -> Result<(), AlertError>;
}

/// Fans alerts out to every attached viewer
#[derive(Debug, Clone)]
pub struct BroadcastAlerts {
    tx: broadcast::Sender<Alert>,
}

impl BroadcastAlerts {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    pub fn viewers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastAlerts {
    fn default() -> Self {
        Self::new(16)
    }
}

impl AlertSurface for BroadcastAlerts {
    fn show_alert(&self, alert: Alert) -> Result<(), AlertError> {
        let delivered = self
            .tx
            .send(alert)
            .map_err(|_| AlertError::TargetUnavailable)?;
        debug!("Alert {:?} delivered to {} viewer(s)", alert, delivered);
        Ok(())
    }
}
