//! In-memory store

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;

use super::{Record, Store, StoreError};

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<Record, StoreError>> {
        async move {
            let data = self.data.read().await;
            Ok(keys
                .iter()
                .filter_map(|key| data.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect())
        }
        .boxed()
    }

    fn set(&self, record: Record) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.data.write().await.extend(record);
            Ok(())
        }
        .boxed()
    }

    fn remove<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let mut data = self.data.write().await;
            for key in keys {
                data.remove(*key);
            }
            Ok(())
        }
        .boxed()
    }
}
