//! Authenticated, redirect-following downloads.
//!
//! This module drives a single request through the resource server and
//! identity provider, retries transient failures and streams the final
//! payload into a caller-owned sink.
//!
//! # Features
//!
//! - Manual redirect following with per-hop credential selection
//! - Bearer token validation with a process-wide cache
//! - Basic authentication fallback on 401
//! - Bounded retries with exponential backoff for transient statuses
//! - Streaming writes (memory-efficient for large files)
//!
//! # Example
//!
//! ```no_run
//! use edl_downloader_core::download::{DownloadRequest, EdlClient};
//! use edl_downloader_core::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("https://urs.earthdata.nasa.gov", "id", "secret")?;
//! let client = EdlClient::new(config)?;
//! let mut out = Vec::new();
//! let request = DownloadRequest::new("https://example.com/g.nc").with_bearer_token("t");
//! client.download(&request, &mut out).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod request;
mod retry;
mod stream;

pub use client::{DownloadResponse, EdlClient, MAX_REDIRECTS};
pub use error::{DownloadError, ErrorKind};
pub use request::{DownloadRequest, Method};
pub use retry::{
    DEFAULT_TOTAL_RETRIES, RETRY_ERROR_CODES, RetryDecision, RetryPolicy, RetryState, StatusClass,
    classify_status, is_retryable_status,
};
pub use stream::stream_to_sink;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
