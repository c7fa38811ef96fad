//! Key management: creation, deletion, lookup and the admin bootstrap.

use crate::error::{Error, Result};
use crate::types::{KeyInfo, KeyRecord, Permission};
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::BTreeSet;

use super::AdmissionController;

/// Length of generated tokens (about 256 bits of entropy)
const TOKEN_LENGTH: usize = 43;

/// Name of the key created on first start
pub(crate) const ADMIN_KEY_NAME: &str = "admin";

/// Generate a fresh random URL-safe token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Name under which a requested key name is stored
pub fn normalize_key_name(name: &str) -> &str {
    name.trim()
}

impl AdmissionController {
    /// Create a key and return its token
    ///
    /// The key is stored under [`normalize_key_name`] of `name`.
    pub async fn create_key(&self, name: &str, permissions: BTreeSet<Permission>) -> Result<String> {
        let name = normalize_key_name(name);
        if name.is_empty() {
            return Err(Error::InvalidRequest("key name must not be empty".into()));
        }

        let token = generate_token();
        let record = KeyRecord {
            name: name.to_string(),
            key: token.clone(),
            permissions,
            memory_usage: Vec::new(),
        };

        self.store
            .keys
            .transact(|keys| {
                if keys.contains_key(&record.name) {
                    return Err(Error::KeyExists(record.name.clone()));
                }
                keys.insert(record.name.clone(), record);
                Ok(())
            })
            .await?;

        tracing::info!(key = %name, "API key created");
        Ok(token)
    }

    /// Delete a key by name
    ///
    /// Tasks the key already submitted are left alone.
    pub async fn delete_key(&self, name: &str) -> Result<()> {
        match self.store.keys.remove(&name.to_string()).await? {
            Some(_) => {
                tracing::info!(key = %name, "API key deleted");
                Ok(())
            }
            None => Err(Error::KeyNotFound(name.to_string())),
        }
    }

    /// Public view of one key
    pub async fn get_key(&self, name: &str) -> Result<KeyInfo> {
        let key = self
            .store
            .keys
            .get(&name.to_string())
            .await?
            .ok_or_else(|| Error::KeyNotFound(name.to_string()))?;
        Ok(self.key_info(&key))
    }

    /// Public view of every key, ordered by name
    pub async fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let keys = self.store.keys.snapshot().await?;
        Ok(keys.values().map(|key| self.key_info(key)).collect())
    }

    /// Create the `admin` key when the key registry is empty
    ///
    /// Returns the new token, which is also logged once at warn level.
    pub async fn bootstrap_admin(&self) -> Result<Option<String>> {
        let token = generate_token();
        let record = KeyRecord {
            name: ADMIN_KEY_NAME.to_string(),
            key: token.clone(),
            permissions: Permission::ALL.into_iter().collect(),
            memory_usage: Vec::new(),
        };

        let created = self
            .store
            .keys
            .transact(|keys| {
                if !keys.is_empty() {
                    return Ok(false);
                }
                keys.insert(record.name.clone(), record);
                Ok(true)
            })
            .await?;

        if !created {
            return Ok(None);
        }

        tracing::warn!(
            key = ADMIN_KEY_NAME,
            token = %token,
            "no API keys found, created admin key; store this token, it is not shown again"
        );
        Ok(Some(token))
    }

    fn key_info(&self, key: &KeyRecord) -> KeyInfo {
        KeyInfo {
            name: key.name.clone(),
            permissions: key.permissions.iter().copied().collect(),
            memory_in_use: self.memory_in_use(key, Utc::now()),
        }
    }
}
