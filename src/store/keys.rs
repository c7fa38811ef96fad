//! Token lookup on the key registry.

use crate::Result;
use crate::types::KeyRecord;

use super::KeyRegistry;

impl KeyRegistry {
    /// Resolve a presented token to its key record
    pub async fn find_by_token(&self, token: &str) -> Result<Option<KeyRecord>> {
        let keys = self.snapshot().await?;
        Ok(keys
            .into_values()
            .find(|key| constant_time_eq(key.key.as_bytes(), token.as_bytes())))
    }
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
