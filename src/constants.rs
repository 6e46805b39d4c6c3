//! # System Constants
//!
//! Defaults and fixed naming rules shared by the lease manager, the entity
//! accessor and the transition coordinator.

/// Lease timing defaults
pub mod lease {
    /// Lease time-to-live
    pub const DEFAULT_TTL_MS: u64 = 4_000;
    /// How long to keep polling for a contended lease
    pub const DEFAULT_ACQUISITION_TIMEOUT_MS: u64 = 8_000;
    /// Pause between acquisition attempts
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
    /// Prefix of every lease key in the lock store
    pub const DEFAULT_KEY_PREFIX: &str = "status_workflow";
}

/// Status naming rules
pub mod status {
    /// Appended to the current status when an action fails
    pub const ERROR_SUFFIX: &str = "_error";

    /// Sentinel status written when an action fails while in `current`
    pub fn error_status(current: Option<&str>) -> String {
        format!("{}{ERROR_SUFFIX}", current.unwrap_or_default())
    }
}

/// Environment variables read by configuration and logging
pub mod env {
    pub const CONFIG_PREFIX: &str = "STATUS_WORKFLOW";
    pub const ENVIRONMENT: &str = "STATUS_WORKFLOW_ENV";
    pub const LOG_FORMAT: &str = "STATUS_WORKFLOW_LOG_FORMAT";
}
