//! Background Tasks Module
//!
//! # Tasks
//! - Health Monitor: probes the repository and publishes readiness
//! - TTL Cleanup: removes expired in-process cache entries at configured intervals

mod cleanup;
mod health;

pub use cleanup::spawn_cleanup_task;
pub use health::{spawn_health_monitor, HealthMonitorConfig, HealthStatus};
