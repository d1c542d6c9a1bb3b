//! JSON-file backed store

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Record, Store, StoreError};

/// Store persisted as a single JSON object on disk.
///
/// The whole object is cached in memory and rewritten after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: Mutex<Record>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// or corrupt file is logged and replaced on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match Self::load(&path).await {
            Ok(data) => {
                info!("Loaded store from {} ({} keys)", path.display(), data.len());
                data
            }
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty", path.display());
                Record::new()
            }
            Err(e) => {
                warn!("Failed to load store from {}: {}, starting empty", path.display(), e);
                Record::new()
            }
        };

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<Record, StoreError> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn flush(&self, data: &Record) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Flushed store to {}", self.path.display());
        Ok(())
    }
}

impl Store for FileStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<Record, StoreError>> {
        async move {
            let data = self.data.lock().await;
            Ok(keys
                .iter()
                .filter_map(|key| data.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect())
        }
        .boxed()
    }

    fn set(&self, record: Record) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let mut data = self.data.lock().await;
            data.extend(record);
            self.flush(&data).await
        }
        .boxed()
    }

    fn remove<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let mut data = self.data.lock().await;
            let before = data.len();
            for key in keys {
                data.remove(*key);
            }
            if data.len() == before {
                return Ok(());
            }
            self.flush(&data).await
        }
        .boxed()
    }
}
