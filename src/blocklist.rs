//! Website blocklist stored alongside the timer
//!
//! Password gating of blocklist edits is not handled here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::store::{keys, record, timer::read_key, Store, StoreError};

/// Persisted blocklist view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocklist {
    pub blocked_websites: Vec<String>,
    pub blocking_enabled: bool,
}

impl Blocklist {
    /// Whether a page on `host` should be blocked
    pub fn blocks(&self, host: &str) -> bool {
        if !self.blocking_enabled {
            return false;
        }
        let Some(host) = normalize_domain(host) else {
            return false;
        };
        self.blocked_websites
            .iter()
            .any(|blocked| host.contains(blocked.as_str()) || blocked.contains(host.as_str()))
    }
}

/// Reduce user input like `https://www.Example.com:443/path` to `example.com`
pub fn normalize_domain(input: &str) -> Option<String> {
    let trimmed = input.trim().to_lowercase();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed.as_str());
    let host = without_scheme
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host);
    let host = host.split(':').next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host).trim_end_matches('.');

    let valid = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    valid.then(|| host.to_string())
}

pub async fn load(store: &dyn Store) -> Blocklist {
    let blocked_websites = read_key(store, keys::BLOCKED_WEBSITES)
        .await
        .and_then(|v| match v {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(normalize_domain)
                    .collect(),
            ),
            other => {
                warn!("Ignoring malformed blocklist: {}", other);
                None
            }
        })
        .unwrap_or_default();
    let blocking_enabled = read_key(store, keys::BLOCKING_ENABLED)
        .await
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Blocklist {
        blocked_websites,
        blocking_enabled,
    }
}

/// Add a domain; returns `Ok(false)` when it was already listed
pub async fn add(store: &dyn Store, domain: &str) -> Result<bool, AddError> {
    let domain = normalize_domain(domain).ok_or(AddError::InvalidDomain)?;
    let mut list = load(store).await;
    if list.blocked_websites.contains(&domain) {
        return Ok(false);
    }

    list.blocked_websites.push(domain.clone());
    save_websites(store, &list.blocked_websites).await?;
    info!("Blocked {}", domain);
    Ok(true)
}

/// Remove a domain; returns whether it was listed
pub async fn remove(store: &dyn Store, domain: &str) -> Result<bool, StoreError> {
    let Some(domain) = normalize_domain(domain) else {
        return Ok(false);
    };
    let mut list = load(store).await;
    let before = list.blocked_websites.len();
    list.blocked_websites.retain(|d| *d != domain);
    if list.blocked_websites.len() == before {
        return Ok(false);
    }

    save_websites(store, &list.blocked_websites).await?;
    info!("Unblocked {}", domain);
    Ok(true)
}

pub async fn set_enabled(store: &dyn Store, enabled: bool) -> Result<(), StoreError> {
    store
        .set(record(keys::BLOCKING_ENABLED, Value::Bool(enabled)))
        .await?;
    info!("Website blocking {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

async fn save_websites(store: &dyn Store, websites: &[String]) -> Result<(), StoreError> {
    store
        .set(record(keys::BLOCKED_WEBSITES, serde_json::to_value(websites)?))
        .await
}

#[derive(Debug, thiserror::Error)]
pub enum AddError {
    #[error("not a valid domain")]
    InvalidDomain,
    #[error(transparent)]
    Store(#[from] StoreError),
}
