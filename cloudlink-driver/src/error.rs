use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of cloud resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Node,
    Image,
    Size,
    Location,
    Volume,
    Snapshot,
    KeyPair,
    Balancer,
    Member,
    Zone,
    Record,
    Project,
    Job,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Node => "Node",
            Self::Image => "Image",
            Self::Size => "Size",
            Self::Location => "Location",
            Self::Volume => "Volume",
            Self::Snapshot => "Snapshot",
            Self::KeyPair => "Key pair",
            Self::Balancer => "Load balancer",
            Self::Member => "Member",
            Self::Zone => "Zone",
            Self::Record => "Record",
            Self::Project => "Project",
            Self::Job => "Job",
        };
        f.write_str(name)
    }
}

/// Unified error type for all driver operations.
///
/// Each variant carries the `provider` that produced it plus variant-specific
/// context. All variants are serializable for structured error reporting.
///
/// # Retryable Errors
///
/// [`NetworkError`](Self::NetworkError), [`Timeout`](Self::Timeout) and
/// [`RateLimited`](Self::RateLimited) are transient. The HTTP layer only
/// retries them when the driver was configured with `max_retries > 0`;
/// otherwise every error surfaces directly to the caller.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum DriverError {
    /// A network-level error occurred (DNS resolution failure, connection refused, 5xx gateway).
    #[error("[{provider}] Network error: {detail}")]
    NetworkError { provider: String, detail: String },

    /// The HTTP request, or a polling wait, timed out.
    #[error("[{provider}] Request timeout: {detail}")]
    Timeout { provider: String, detail: String },

    /// The credentials were rejected or have expired.
    #[error("[{provider}] Invalid credentials{}", fmt_raw(.raw_message))]
    InvalidCredentials {
        provider: String,
        raw_message: Option<String>,
    },

    /// The provider answered with a body that could not be decoded.
    #[error("[{provider}] Malformed response: {detail}")]
    MalformedResponse {
        provider: String,
        detail: String,
        body: Option<String>,
    },

    /// A request payload could not be serialized.
    #[error("[{provider}] Serialization error: {detail}")]
    SerializationError { provider: String, detail: String },

    /// API rate limit exceeded (HTTP 429 or equivalent).
    #[error("[{provider}] Rate limited{}", fmt_retry_after(.retry_after))]
    RateLimited {
        provider: String,
        retry_after: Option<u64>,
        raw_message: Option<String>,
    },

    /// The referenced resource does not exist.
    #[error("[{provider}] {resource} '{id}' not found")]
    NotFound {
        provider: String,
        resource: ResourceKind,
        id: String,
        raw_message: Option<String>,
    },

    /// A resource with the same name already exists.
    #[error("[{provider}] {resource} '{name}' already exists")]
    AlreadyExists {
        provider: String,
        resource: ResourceKind,
        name: String,
        raw_message: Option<String>,
    },

    /// A request parameter was rejected.
    #[error("[{provider}] Invalid parameter '{param}': {detail}")]
    InvalidParameter {
        provider: String,
        param: String,
        detail: String,
    },

    /// Account quota exhausted. Not transient.
    #[error("[{provider}] Quota exceeded")]
    QuotaExceeded {
        provider: String,
        raw_message: Option<String>,
    },

    /// Credentials are valid but lack permission for the operation.
    #[error("[{provider}] Permission denied{}", fmt_raw(.raw_message))]
    PermissionDenied {
        provider: String,
        raw_message: Option<String>,
    },

    /// The driver does not implement this operation.
    #[error("[{provider}] Operation '{operation}' is not supported")]
    NotSupported { provider: String, operation: String },

    /// No driver is registered under the requested identifier.
    #[error("No {kind} driver registered for provider '{id}'")]
    UnknownProvider { kind: String, id: String },

    /// A provider-side asynchronous job finished with an error.
    #[error("[{provider}] Job '{job_id}' failed: {detail}")]
    JobFailed {
        provider: String,
        job_id: String,
        detail: String,
    },

    /// Fallback for provider errors with no dedicated variant.
    #[error("[{provider}] {raw_message}")]
    Unknown {
        provider: String,
        raw_code: Option<String>,
        raw_message: String,
    },
}

fn fmt_raw(raw: &Option<String>) -> String {
    raw.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
}

fn fmt_retry_after(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|s| format!(" (retry after {s}s)"))
        .unwrap_or_default()
}

impl DriverError {
    /// Whether the error is transient and the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }

    /// Whether the error is an expected, user-facing condition rather than a fault.
    ///
    /// Useful for choosing a log level: expected errors are logged at `warn`,
    /// everything else at `error`.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::NotFound { .. }
                | Self::AlreadyExists { .. }
                | Self::InvalidParameter { .. }
                | Self::QuotaExceeded { .. }
                | Self::PermissionDenied { .. }
                | Self::NotSupported { .. }
                | Self::UnknownProvider { .. }
        )
    }

    /// The provider identifier attached to this error, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::NetworkError { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::InvalidCredentials { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::SerializationError { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::NotFound { provider, .. }
            | Self::AlreadyExists { provider, .. }
            | Self::InvalidParameter { provider, .. }
            | Self::QuotaExceeded { provider, .. }
            | Self::PermissionDenied { provider, .. }
            | Self::NotSupported { provider, .. }
            | Self::JobFailed { provider, .. }
            | Self::Unknown { provider, .. } => Some(provider),
            Self::UnknownProvider { .. } => None,
        }
    }

    pub(crate) fn not_supported(provider: &str, operation: &str) -> Self {
        Self::NotSupported {
            provider: provider.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Credentials that cannot be used by the driver at all (wrong scheme, bad format).
    pub(crate) fn unusable_credentials(
        provider: &str,
        error: &crate::types::CredentialValidationError,
    ) -> Self {
        Self::InvalidCredentials {
            provider: provider.to_string(),
            raw_message: Some(error.to_string()),
        }
    }

    pub(crate) fn not_found(provider: &str, resource: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            provider: provider.to_string(),
            resource,
            id: id.into(),
            raw_message: None,
        }
    }
}

/// Convenience type alias for `Result<T, DriverError>`.
pub type Result<T> = std::result::Result<T, DriverError>;
