//! Error types for the reconciliation engine.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// No provider registered under the requested name
    #[error("provider {0:?} not found")]
    ProviderNotFound(String),

    /// Hostname does not match any of the provider's zone filters
    #[error("hostname {hostname:?} does not match zone filters for provider {provider:?}")]
    ZoneUnauthorized {
        /// The hostname that failed authorization
        hostname: String,
        /// The provider whose filters were consulted
        provider: String,
    },

    /// No owning zone could be resolved for the hostname.
    ///
    /// Unreachable when authorization has already passed; kept as a
    /// defensive variant so the resolution path never panics.
    #[error("could not determine zone for hostname {0:?}")]
    ZoneUndetermined(String),

    /// Record target is not an IP literal
    #[error("invalid record target {0:?}: not an IP address")]
    InvalidTarget(String),

    /// The tracked record is owned by a different workload
    #[error("record {key:?} does not belong to source {source_id:?}")]
    OwnershipMismatch {
        /// Inventory key of the contested record
        key: String,
        /// The source id that attempted the deletion
        source_id: String,
    },

    /// A provider adapter call failed
    #[error("provider {provider} {operation} failed: {message}")]
    Adapter {
        /// Provider name
        provider: String,
        /// Which capability was invoked (append, set, delete)
        operation: String,
        /// Vendor error rendered as text
        message: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Event watcher errors
    #[error("watcher error: {0}")]
    Watcher(String),

    /// Joint report of a best-effort batch operation
    #[error("{} operation(s) failed: {}", .0.len(), format_aggregate(.0))]
    Aggregate(Vec<Error>),
}

impl Error {
    /// Create a provider-not-found error
    pub fn provider_not_found(name: impl Into<String>) -> Self {
        Self::ProviderNotFound(name.into())
    }

    /// Create a zone-authorization error
    pub fn zone_unauthorized(hostname: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::ZoneUnauthorized {
            hostname: hostname.into(),
            provider: provider.into(),
        }
    }

    /// Create an adapter error tagged with provider and operation
    pub fn adapter(
        provider: impl Into<String>,
        operation: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::Adapter {
            provider: provider.into(),
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a watcher error
    pub fn watcher(msg: impl Into<String>) -> Self {
        Self::Watcher(msg.into())
    }

    /// Collapse a list of errors into a single result.
    ///
    /// Empty list is success; a single error is returned as-is; anything
    /// more becomes [`Error::Aggregate`].
    pub fn from_batch(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Aggregate(errors)),
        }
    }
}

fn format_aggregate(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
