//! Cache Entry Module
//!
//! Defines the structure for individual in-process cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A serialized value with its absolute expiration.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored (already serialized) value
    pub value: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// A zero `ttl` produces an entry that never expires.
    pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
        let expires_at = (!ttl.is_zero()).then(|| {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            current_timestamp_ms().saturating_add(ttl_ms)
        });

        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// time. Entries without expiration never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a given clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(b"test_value".to_vec(), Duration::ZERO);

        assert_eq!(entry.value, b"test_value");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(b"test_value".to_vec(), Duration::from_secs(60));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(b"test_value".to_vec(), Duration::from_millis(50));

        assert!(!entry.is_expired());

        // Wait for expiration
        sleep(Duration::from_millis(100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let entry = CacheEntry::new(b"v".to_vec(), Duration::ZERO);
        assert!(!entry.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new(b"v".to_vec(), Duration::MAX);
        assert_eq!(entry.expires_at, Some(u64::MAX));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: b"test".to_vec(),
            expires_at: Some(now), // Expires exactly at creation time
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - 1));
    }
}
