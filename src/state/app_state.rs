//! Shared state for the UI binding layer

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use super::{foreground::Collaborators, Foreground, ForegroundError};
use crate::{services::BroadcastAlerts, store::Store};

/// State behind the HTTP API: the collaborators a surface is attached with,
/// the currently attached foreground controller (if any), and server metadata
pub struct AppState {
    /// Collaborators handed to each newly attached controller
    pub deps: Collaborators,
    /// Alert overlay fan-out for attached viewers
    pub alerts: Arc<BroadcastAlerts>,
    /// Controller of the open UI surface
    surface: Mutex<Option<Arc<Foreground>>>,
    /// Held while a controller loads and reconciles, so only one ever does
    attaching: AsyncMutex<()>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Create a new AppState with no surface attached
    pub fn new(deps: Collaborators, alerts: Arc<BroadcastAlerts>, port: u16, host: String) -> Self {
        Self {
            deps,
            alerts,
            surface: Mutex::new(None),
            attaching: AsyncMutex::new(()),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.deps.store.as_ref()
    }

    /// Attach a UI surface. An already attached surface is kept as is.
    pub async fn open_surface(&self) -> Result<Arc<Foreground>, ForegroundError> {
        let _attaching = self.attaching.lock().await;
        if let Some(existing) = self.foreground() {
            return Ok(existing);
        }

        let foreground = Foreground::attach(self.deps.clone()).await?;
        let mut surface = self.surface.lock().map_err(|_| ForegroundError::Poisoned)?;
        *surface = Some(Arc::clone(&foreground));
        drop(surface);

        self.record_action("surface-open");
        info!("UI surface attached");
        Ok(foreground)
    }

    /// Tear the UI surface down; returns whether one was attached
    pub fn close_surface(&self) -> bool {
        let closed = match self.surface.lock() {
            Ok(mut surface) => surface.take(),
            Err(e) => {
                warn!("Failed to lock surface: {}", e);
                None
            }
        };

        match closed {
            Some(foreground) => {
                foreground.detach();
                self.record_action("surface-close");
                true
            }
            None => false,
        }
    }

    /// Controller of the attached surface, if any
    pub fn foreground(&self) -> Option<Arc<Foreground>> {
        self.surface.lock().ok().and_then(|s| s.clone())
    }

    /// Remember the latest user action for the status endpoint
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
