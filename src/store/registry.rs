//! Typed, transactional access to one document.

use crate::error::DatabaseError;
use crate::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::DocumentStore;

/// A mapping from identifier to record, persisted as one document
///
/// Every operation holds the registry lock for its whole load/mutate/save
/// cycle, so concurrent updates are applied one after another and none is
/// lost.
pub struct Registry<K, V> {
    document: &'static str,
    store: Arc<dyn DocumentStore>,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Registry<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned + Send + Sync,
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a registry over the named document
    pub fn new(document: &'static str, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            document,
            store,
            lock: Mutex::new(()),
            _records: PhantomData,
        }
    }

    /// Document name
    pub fn document(&self) -> &'static str {
        self.document
    }

    /// Consistent copy of every record
    pub async fn snapshot(&self) -> Result<BTreeMap<K, V>> {
        let _guard = self.lock.lock().await;
        self.load_locked().await
    }

    /// Copy of one record
    pub async fn get(&self, id: &K) -> Result<Option<V>> {
        Ok(self.snapshot().await?.remove(id))
    }

    /// Apply `f` to one record and persist the result
    ///
    /// Returns `Ok(None)` without saving when the record does not exist. If
    /// `f` fails nothing is saved.
    pub async fn update<T, F>(&self, id: &K, f: F) -> Result<Option<T>>
    where
        T: Send,
        F: FnOnce(&mut V) -> Result<T> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load_locked().await?;
        let Some(record) = records.get_mut(id) else {
            return Ok(None);
        };
        let out = f(record)?;
        self.save_locked(&records).await?;
        Ok(Some(out))
    }

    /// Apply `f` to the whole mapping and persist the result
    ///
    /// If `f` fails nothing is saved.
    pub async fn transact<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut BTreeMap<K, V>) -> Result<T> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load_locked().await?;
        let out = f(&mut records)?;
        self.save_locked(&records).await?;
        Ok(out)
    }

    /// Insert or replace one record
    pub async fn insert(&self, id: K, record: V) -> Result<()> {
        self.transact(|records| {
            records.insert(id, record);
            Ok(())
        })
        .await
    }

    /// Remove one record, returning it if it existed
    pub async fn remove(&self, id: &K) -> Result<Option<V>> {
        let _guard = self.lock.lock().await;
        let mut records = self.load_locked().await?;
        let removed = records.remove(id);
        if removed.is_some() {
            self.save_locked(&records).await?;
        }
        Ok(removed)
    }

    async fn load_locked(&self) -> Result<BTreeMap<K, V>> {
        match self.store.load(self.document).await? {
            None => Ok(BTreeMap::new()),
            Some(body) if body.trim().is_empty() => Ok(BTreeMap::new()),
            Some(body) => serde_json::from_str(&body).map_err(|e| {
                Error::Database(DatabaseError::CorruptDocument {
                    name: self.document.to_string(),
                    reason: e.to_string(),
                })
            }),
        }
    }

    async fn save_locked(&self, records: &BTreeMap<K, V>) -> Result<()> {
        let body = serde_json::to_string_pretty(records)?;
        self.store.save(self.document, &body).await
    }
}
