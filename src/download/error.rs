//! Error types for the download module.
//!
//! Every failure of [`EdlClient::download`](super::EdlClient::download) is one
//! of these variants. [`DownloadError::kind`] folds them into the coarse
//! taxonomy callers usually branch on.

use thiserror::Error;

/// Coarse classification of a [`DownloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The identity provider rejected the bearer token.
    AuthValidation,
    /// The resource server refused access and no fallback was available.
    Authorization,
    /// Fatal status or exhausted retries.
    Download,
    /// The network or the sink failed.
    Transport,
    /// The request was rejected before any I/O.
    Request,
}

/// Errors that can occur during authenticated downloads.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The identity provider rejected the bearer token during validation.
    #[error("bearer token rejected by identity provider: {error}: {description}")]
    AuthValidation {
        /// Provider error code, e.g. `invalid_token`.
        error: String,
        /// Provider's human-readable reason.
        description: String,
    },

    /// The resource server returned 401 and no fallback authentication exists.
    #[error("unauthorized (HTTP {status}) downloading {url}")]
    Authorization {
        /// The URL that refused access.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// No bearer token was supplied and Basic fallback is disabled.
    #[error("no bearer token supplied and fallback authentication is disabled for {url}")]
    MissingCredentials {
        /// The requested URL.
        url: String,
    },

    /// A non-transient, non-success status was returned.
    #[error("Download failed with status {status} for {url}")]
    Status {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A transient status persisted through every retry.
    #[error("Download failed with status {status} after multiple retry attempts")]
    RetriesExhausted {
        /// The URL being retried.
        url: String,
        /// The last status code seen.
        status: u16,
        /// Total attempts made, including the first.
        attempts: u32,
    },

    /// The redirect chain exceeded the hop limit.
    #[error("too many redirects (limit {limit}) downloading {url}")]
    TooManyRedirects {
        /// The originally requested URL.
        url: String,
        /// The hop limit.
        limit: usize,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The provided URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The URL is not http(s).
    #[error("unsupported URL scheme (only http and https are downloaded): {url}")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
    },

    /// Writing to the caller's sink failed.
    #[error("failed writing response body of {url} to sink: {source}")]
    Write {
        /// The URL whose body was being written.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Credentials cannot be rendered as an `Authorization` header.
    #[error("{scheme} credentials contain bytes that are not allowed in an HTTP header")]
    InvalidCredentials {
        /// Credential scheme, e.g. `bearer`. Never the secret itself.
        scheme: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a token validation error.
    pub fn auth_validation(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::AuthValidation {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Creates an authorization error.
    pub fn authorization(url: impl Into<String>, status: u16) -> Self {
        Self::Authorization {
            url: url.into(),
            status,
        }
    }

    /// Creates a missing-credentials error.
    pub fn missing_credentials(url: impl Into<String>) -> Self {
        Self::MissingCredentials { url: url.into() }
    }

    /// Creates a fatal status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a retries-exhausted error.
    pub fn retries_exhausted(url: impl Into<String>, status: u16, attempts: u32) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            status,
            attempts,
        }
    }

    /// Creates a redirect-limit error.
    pub fn too_many_redirects(url: impl Into<String>, limit: usize) -> Self {
        Self::TooManyRedirects {
            url: url.into(),
            limit,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Maps a transport error to [`Timeout`](Self::Timeout) or [`Network`](Self::Network).
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unsupported-scheme error.
    pub fn unsupported_scheme(url: impl Into<String>) -> Self {
        Self::UnsupportedScheme { url: url.into() }
    }

    /// Creates an invalid-credentials error.
    pub fn invalid_credentials(scheme: &'static str) -> Self {
        Self::InvalidCredentials { scheme }
    }

    /// Creates a sink write error.
    pub fn write(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Write {
            url: url.into(),
            source,
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthValidation { .. } => ErrorKind::AuthValidation,
            Self::Authorization { .. } | Self::MissingCredentials { .. } => {
                ErrorKind::Authorization
            }
            Self::Status { .. } | Self::RetriesExhausted { .. } | Self::TooManyRedirects { .. } => {
                ErrorKind::Download
            }
            Self::Network { .. } | Self::Timeout { .. } | Self::Write { .. } => {
                ErrorKind::Transport
            }
            Self::InvalidUrl { .. }
            | Self::UnsupportedScheme { .. }
            | Self::InvalidCredentials { .. }
            | Self::ClientBuild { .. } => ErrorKind::Request,
        }
    }

    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Authorization { status, .. }
            | Self::Status { status, .. }
            | Self::RetriesExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// No From<reqwest::Error> or From<std::io::Error>: every variant needs the URL
// for context, which the source errors do not carry.
