//! Admission control
//!
//! Every entry point runs the same ordered gate before anything is recorded:
//!
//! 1. no token presented → [`DenyReason::Unauthenticated`]
//! 2. token matches no key → [`DenyReason::InvalidKey`]
//! 3. the resolved key owns `request_limit` live tasks → [`DenyReason::RateLimitExceeded`]
//! 4. key lacks the permission → [`DenyReason::Forbidden`]
//!
//! Memory reservations are checked separately, once the size of a job is
//! known, through [`AdmissionController::reserve_memory`].

use crate::config::{QuotaConfig, RetentionConfig};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{KeyRecord, MemorySample, Permission, TaskId, TaskRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

mod keys;

pub use keys::{generate_token, normalize_key_name};

/// Outcome of an admission check
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Admitted, with the resolved key
    Allow(KeyRecord),
    /// Rejected
    Deny(DenyReason),
}

impl Decision {
    /// Convert into a `Result`, mapping the deny reason onto the error taxonomy
    pub fn into_result(self) -> Result<KeyRecord> {
        match self {
            Decision::Allow(key) => Ok(key),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }

    /// Whether the request was admitted
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Why admission was refused
#[derive(Clone, Debug, PartialEq)]
pub enum DenyReason {
    /// No token presented
    Unauthenticated,
    /// Token matches no key
    InvalidKey,
    /// Key lacks the required permission
    Forbidden(Permission),
    /// Key owns too many live tasks
    RateLimitExceeded {
        /// Configured request ceiling
        limit: usize,
        /// Rate window in minutes
        window_minutes: u64,
    },
    /// Reservation would exceed the memory quota
    MemoryLimitExceeded {
        /// Bytes already reserved inside the window
        used: u64,
        /// Bytes requested
        requested: u64,
        /// Configured quota
        limit: u64,
        /// Memory window in minutes
        window_minutes: u64,
    },
}

impl From<DenyReason> for Error {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => Error::Unauthenticated,
            DenyReason::InvalidKey => Error::InvalidKey,
            DenyReason::Forbidden(permission) => Error::Forbidden { permission },
            DenyReason::RateLimitExceeded {
                limit,
                window_minutes,
            } => Error::RateLimitExceeded {
                limit,
                window_minutes,
            },
            DenyReason::MemoryLimitExceeded {
                used,
                requested,
                limit,
                window_minutes,
            } => Error::MemoryLimitExceeded {
                used,
                requested,
                limit,
                window_minutes,
            },
        }
    }
}

/// Enforces authentication, permissions and per-key quotas
///
/// Sole writer of memory samples on key records.
#[derive(Clone)]
pub struct AdmissionController {
    store: Store,
    quota: QuotaConfig,
    rate_window: Duration,
}

impl AdmissionController {
    /// Create a controller over the store's key and task registries
    ///
    /// Task records count toward the request limit until the retention sweep
    /// removes them, so the rate window is the retention window.
    pub fn new(store: Store, quota: QuotaConfig, retention: &RetentionConfig) -> Self {
        Self {
            store,
            quota,
            rate_window: retention.task_retention,
        }
    }

    /// Run the ordered gate for an entry point requiring `permission`
    pub async fn gate(&self, token: Option<&str>, permission: Permission) -> Result<Decision> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        };

        let Some(key) = self.store.keys.find_by_token(token).await? else {
            return Ok(Decision::Deny(DenyReason::InvalidKey));
        };

        if let Err(reason) = self.check_rate(&key.name).await? {
            return Ok(Decision::Deny(reason));
        }

        if !key.allows(permission) {
            return Ok(Decision::Deny(DenyReason::Forbidden(permission)));
        }

        Ok(Decision::Allow(key))
    }

    /// `admit(token, estimated_size)`: authenticate, then reserve memory
    ///
    /// Checks rate and memory quotas but no permission.
    pub async fn admit(&self, token: Option<&str>, estimated_size: u64) -> Result<Decision> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        };
        let Some(key) = self.store.keys.find_by_token(token).await? else {
            return Ok(Decision::Deny(DenyReason::InvalidKey));
        };
        if let Err(reason) = self.check_rate(&key.name).await? {
            return Ok(Decision::Deny(reason));
        }
        match self.reserve_memory(&key.name, estimated_size, Utc::now()).await {
            Ok(()) => Ok(Decision::Allow(key)),
            Err(Error::MemoryLimitExceeded {
                used,
                requested,
                limit,
                window_minutes,
            }) => Ok(Decision::Deny(DenyReason::MemoryLimitExceeded {
                used,
                requested,
                limit,
                window_minutes,
            })),
            Err(e) => Err(e),
        }
    }

    /// Rate check against the current task registry
    ///
    /// The outer `Result` carries store failures, the inner one the decision.
    pub async fn check_rate(
        &self,
        key_name: &str,
    ) -> Result<std::result::Result<(), DenyReason>> {
        let owned = self.store.tasks.count_owned_by(key_name).await?;
        Ok(self.rate_decision(owned))
    }

    /// Rate check over a task mapping already loaded inside a transaction
    pub fn check_rate_in(
        &self,
        tasks: &BTreeMap<TaskId, TaskRecord>,
        key_name: &str,
    ) -> std::result::Result<(), DenyReason> {
        let owned = tasks
            .values()
            .filter(|record| record.key_name == key_name)
            .count();
        self.rate_decision(owned)
    }

    fn rate_decision(&self, owned: usize) -> std::result::Result<(), DenyReason> {
        if owned >= self.quota.request_limit {
            Err(DenyReason::RateLimitExceeded {
                limit: self.quota.request_limit,
                window_minutes: self.rate_window.as_secs() / 60,
            })
        } else {
            Ok(())
        }
    }

    /// Reserve `size` bytes against a key's rolling memory quota
    ///
    /// Prunes samples older than the memory window, checks the sum plus
    /// `size` against the limit, and appends a sample when `size > 0`, all in
    /// one update of the key record. Fails with [`Error::MemoryLimitExceeded`]
    /// (nothing recorded) or [`Error::KeyNotFound`].
    pub async fn reserve_memory(&self, key_name: &str, size: u64, now: DateTime<Utc>) -> Result<()> {
        let limit = self.quota.memory_limit_bytes;
        let window_minutes = self.quota.memory_window.as_secs() / 60;
        let cutoff = self.memory_cutoff(now);

        self.store
            .keys
            .update(&key_name.to_string(), |key| {
                key.memory_usage.retain(|sample| sample.timestamp > cutoff);
                let used: u64 = key.memory_usage.iter().map(|sample| sample.size).sum();

                if used.saturating_add(size) > limit {
                    return Err(Error::MemoryLimitExceeded {
                        used,
                        requested: size,
                        limit,
                        window_minutes,
                    });
                }
                if size > 0 {
                    key.memory_usage.push(MemorySample {
                        timestamp: now,
                        size,
                    });
                }
                Ok(())
            })
            .await?
            .ok_or_else(|| Error::KeyNotFound(key_name.to_string()))
    }

    /// Bytes a key has reserved inside the memory window ending at `now`
    pub fn memory_in_use(&self, key: &KeyRecord, now: DateTime<Utc>) -> u64 {
        let cutoff = self.memory_cutoff(now);
        key.memory_usage
            .iter()
            .filter(|sample| sample.timestamp > cutoff)
            .map(|sample| sample.size)
            .sum()
    }

    fn memory_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window = chrono::Duration::from_std(self.quota.memory_window)
            .unwrap_or_else(|_| chrono::Duration::zero());
        now - window
    }

    /// Quota settings in effect
    pub fn quota(&self) -> &QuotaConfig {
        &self.quota
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
