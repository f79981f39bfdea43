//! EDL Downloader Core Library
//!
//! This library fetches resources that sit behind an Earthdata Login style
//! identity provider. A download may bounce from the resource server to the
//! provider and back before the payload is served, and every hop needs a
//! different set of credentials.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`urls`] - URL classification and local hostname rewriting
//! - [`auth`] - Credentials, per-hop auth strategy selection, token validation
//! - [`download`] - Redirect-following downloader, retry governor, stream writer
//! - [`config`] - Caller-supplied configuration
//! - [`filename`] - Output filename generation for downloaded resources

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod download;
pub mod filename;
#[cfg(test)]
pub mod test_support;
pub mod urls;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use auth::{
    AuthMode, CommaSeparatedComposite, CompositeEncoding, Credentials, Endpoint, HopKind,
    TokenValidator, classify_endpoint, select_credentials,
};
pub use config::{Config, ConfigError};
pub use download::{
    DEFAULT_TOTAL_RETRIES, DownloadError, DownloadRequest, DownloadResponse, EdlClient,
    ErrorKind, MAX_REDIRECTS, Method, RETRY_ERROR_CODES, RetryDecision, RetryPolicy, RetryState,
    is_retryable_status, stream_to_sink,
};
pub use filename::generate_output_filename;
pub use urls::{is_network_url, rewrite_local_host};
