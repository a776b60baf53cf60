//! Error types for the Synology webhook.

use thiserror::Error;

/// Failures talking to the DSM web API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, TLS, timeout, body decode).
    #[error("HTTP error calling DSM: {0}")]
    Http(#[from] reqwest::Error),

    /// DSM answered with `"success": false`.
    #[error("DSM API {api} method {method} failed with error code {code}")]
    Api {
        api: &'static str,
        method: &'static str,
        code: i64,
    },

    /// DSM answered with something that is not a usable envelope.
    #[error("unexpected DSM response from {api}: {reason}")]
    UnexpectedResponse { api: &'static str, reason: String },

    /// Login was refused or returned no session id.
    #[error("DSM login as '{user}' failed: {reason}")]
    Login { user: String, reason: String },
}

/// Errors surfaced to whoever drives the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote appliance could not be read.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// `updateOld` and `updateNew` must pair up by position.
    #[error("change set has {old} updateOld entries but {new} updateNew entries")]
    UnpairedUpdate { old: usize, new: usize },

    /// The caller went away or the deadline passed before the work finished.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;
