//! Typed access to the timer records in the store
//!
//! Reads never fail: a storage error or an unreadable record is logged and
//! treated as absent data.

use serde_json::Value;
use tracing::{debug, warn};

use super::{keys, record, Store, StoreError};
use crate::state::{TimerSettings, TimerState};

/// Load the persisted run state, if any
pub async fn load_timer_state(store: &dyn Store) -> Option<TimerState> {
    let value = read_key(store, keys::TIMER_STATE).await?;
    match serde_json::from_value::<TimerState>(value) {
        Ok(state) => Some(state.sanitized()),
        Err(e) => {
            warn!("Ignoring unreadable timer state: {}", e);
            None
        }
    }
}

pub async fn save_timer_state(store: &dyn Store, state: &TimerState) -> Result<(), StoreError> {
    let value = serde_json::to_value(state)?;
    store.set(record(keys::TIMER_STATE, value)).await?;
    debug!(
        "Persisted timer state: running={}, paused={}, mode={}, cycle={}/{}",
        state.is_running,
        state.is_paused,
        state.mode.label(),
        state.current_cycle,
        state.total_cycles
    );
    Ok(())
}

pub async fn clear_timer_state(store: &dyn Store) -> Result<(), StoreError> {
    store.remove(&[keys::TIMER_STATE]).await
}

/// Load settings, substituting defaults for anything missing or malformed
pub async fn load_settings(store: &dyn Store) -> TimerSettings {
    read_key(store, keys::TIMER_SETTINGS)
        .await
        .map(TimerSettings::from)
        .unwrap_or_default()
}

pub async fn save_settings(store: &dyn Store, settings: &TimerSettings) -> Result<(), StoreError> {
    let value = serde_json::to_value(settings)?;
    store.set(record(keys::TIMER_SETTINGS, value)).await
}

pub(crate) async fn read_key(store: &dyn Store, key: &str) -> Option<Value> {
    match store.get(&[key]).await {
        Ok(mut found) => found.remove(key).filter(|v| !v.is_null()),
        Err(e) => {
            warn!("Failed to read {} from store: {}", key, e);
            None
        }
    }
}
