//! Error types for AnimAlert.
//!
//! Validation and transport failures surface from `notify` to whoever
//! triggered it. Sync failures are caught at the runner boundary and only
//! logged. Empty catalogs and empty contact lists are not errors.

use thiserror::Error;

/// Errors returned by `NotificationDispatcher::notify`.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The payload was rejected before any I/O. Never retried automatically.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The SMS transport failed for at least one contact. The sighting is not
    /// marked as notified, so a later call may retry it.
    #[error("sms transport failed for {phone}: {source}")]
    Transport {
        /// Masked phone number of the first contact that failed.
        phone: String,
        #[source]
        source: anyhow::Error,
    },

    /// The dedup store could not be read or written.
    #[error("dedup store failure: {0}")]
    Dedup(#[source] anyhow::Error),
}

impl NotifyError {
    pub fn invalid(message: impl Into<String>) -> Self {
        NotifyError::InvalidPayload(message.into())
    }

    pub fn is_invalid_payload(&self) -> bool {
        matches!(self, NotifyError::InvalidPayload(_))
    }
}

/// Errors raised while loading or validating the zone catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("zone {zone}: {reason}")]
    InvalidZone { zone: String, reason: String },

    #[error("duplicate zone id {0}")]
    DuplicateZone(String),
}

/// Errors raised by external sighting sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse source data: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_payload_message() {
        let err = NotifyError::invalid("Bear sighting payload requires an id");
        assert!(err.is_invalid_payload());
        assert_eq!(
            err.to_string(),
            "invalid payload: Bear sighting payload requires an id"
        );
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = NotifyError::Transport {
            phone: "***1234".to_string(),
            source: anyhow::anyhow!("gateway timeout"),
        };
        assert!(!err.is_invalid_payload());
        assert!(err.to_string().contains("***1234"));
        assert!(err.to_string().contains("gateway timeout"));
    }
}
