//! Result and error types for Scrollprobe.

use thiserror::Error;

/// Result type for Scrollprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while verifying a page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Sampling attempted before the page reported its essential marker
    #[error("Page {page_id} not loaded: marker {marker} not present")]
    NotLoaded {
        /// Page that was sampled too early
        page_id: String,
        /// Marker selector that was missing
        marker: String,
    },

    /// The page driver reports the page unreachable or closed
    #[error("Session lost: {message}")]
    SessionLost {
        /// Error message
        message: String,
    },

    /// An actor's animation state could not be classified
    #[error("Could not classify animation state of {selector}")]
    ClassificationGap {
        /// Actor selector
        selector: String,
    },

    /// No page driver could be constructed
    #[error("Page driver unavailable: {message}")]
    DriverUnavailable {
        /// Error message
        message: String,
    },

    /// The overall run deadline elapsed while the session was in flight
    #[error("Cancelled by run deadline after {ms}ms")]
    Cancelled {
        /// Deadline in milliseconds
        ms: u64,
    },

    /// Invalid harness or target configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a session-lost error
    #[must_use]
    pub fn session_lost(message: impl Into<String>) -> Self {
        Self::SessionLost {
            message: message.into(),
        }
    }

    /// Create a driver-unavailable error
    #[must_use]
    pub fn driver_unavailable(message: impl Into<String>) -> Self {
        Self::DriverUnavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable taxonomy name, used in `session-error: <kind>` anomalies
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotLoaded { .. } => "NotLoaded",
            Self::SessionLost { .. } => "SessionLost",
            Self::ClassificationGap { .. } => "ClassificationGap",
            Self::DriverUnavailable { .. } => "DriverUnavailable",
            Self::Cancelled { .. } => "Cancelled",
            Self::Config { .. } => "Config",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Yaml(_) => "Yaml",
        }
    }

    /// Whether this error is confined to one page session.
    ///
    /// Session-scoped errors become a failed verdict; the rest escape the runner.
    #[must_use]
    pub const fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            Self::NotLoaded { .. }
                | Self::SessionLost { .. }
                | Self::ClassificationGap { .. }
                | Self::Cancelled { .. }
        )
    }
}
