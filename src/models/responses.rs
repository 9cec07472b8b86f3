//! Response DTOs for the item service API
//!
//! Items are serialized directly; these cover the remaining bodies.

use serde::Serialize;

/// Response body for the readiness endpoint (GET /health-check)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "up" or "down"
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a HealthResponse for the given store status
    pub fn from_status(up: bool) -> Self {
        Self {
            status: if up { "up" } else { "down" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
