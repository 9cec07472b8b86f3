//! Cache key derivation

use sha2::{Digest, Sha256};

use crate::models::ListQuery;

/// Key under which a single item is cached.
pub fn item_cache_key(name: &str, account_id: &str) -> String {
    format!("item:{}:{}", name, account_id)
}

/// Key under which a tenant's list result is cached.
///
/// The query's JSON encoding followed by the account id is hashed with
/// SHA-256, so the key is a pure function of `(sort, order_by, limit,
/// account_id)` and has a fixed length.
pub fn list_cache_key(query: &ListQuery, account_id: &str) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(query)?);
    hasher.update(account_id.as_bytes());
    Ok(format!("items:{}", hex::encode(hasher.finalize())))
}
