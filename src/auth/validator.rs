//! Bearer token validation against the identity provider.
//!
//! A token is introspected at most once per [`TokenValidator`] instance: the
//! first caller for a token performs the `POST /oauth/tokens/user` round trip
//! and records the outcome, concurrent callers for the same token wait for
//! that result, and later callers read it from the cache. Transport failures
//! are not outcomes and are never cached.

use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::download::DownloadError;
use crate::user_agent;

/// Path of the provider's token introspection endpoint.
const TOKEN_VALIDATION_PATH: &str = "/oauth/tokens/user";

/// Outcome of one validation round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenStatus {
    Valid,
    Rejected { error: String, description: String },
}

/// Error document returned by the provider for rejected tokens.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Validates bearer tokens and memoizes the results for its own lifetime.
///
/// Create one per process (or per client) and share it; cloning an
/// [`EdlClient`](crate::download::EdlClient) shares its validator.
#[derive(Debug)]
pub struct TokenValidator {
    client: Client,
    cache: DashMap<String, Arc<OnceCell<TokenStatus>>>,
}

impl TokenValidator {
    /// Creates a validator that issues introspection requests through `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }

    /// Validates `access_token` for `client_id`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::AuthValidation`] when the provider rejects the token
    ///   (this outcome is cached and returned again for the same token);
    /// - [`DownloadError::Network`] / [`DownloadError::Timeout`] when the provider
    ///   cannot be reached.
    #[instrument(skip_all, fields(provider = %config.edl_url()))]
    pub async fn validate(
        &self,
        config: &Config,
        access_token: &str,
        client_id: &str,
    ) -> Result<(), DownloadError> {
        // Clone the cell out so the shard lock is released before awaiting.
        let cell = Arc::clone(
            self.cache
                .entry(access_token.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let status = cell
            .get_or_try_init(|| self.introspect(config, access_token, client_id))
            .await?;

        match status {
            TokenStatus::Valid => Ok(()),
            TokenStatus::Rejected { error, description } => Err(DownloadError::auth_validation(
                error.clone(),
                description.clone(),
            )),
        }
    }

    /// Returns true if a validation outcome is recorded for `access_token`.
    #[must_use]
    pub fn is_cached(&self, access_token: &str) -> bool {
        self.cache
            .get(access_token)
            .is_some_and(|cell| cell.initialized())
    }

    async fn introspect(
        &self,
        config: &Config,
        access_token: &str,
        client_id: &str,
    ) -> Result<TokenStatus, DownloadError> {
        let url = validation_url(config.edl_url(), access_token, client_id)?;
        debug!("validating bearer token with identity provider");

        let response = self
            .client
            .post(url.clone())
            .header(USER_AGENT, user_agent::default_user_agent(config))
            .send()
            .await
            .map_err(|e| DownloadError::from_transport(redact(&url), e))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "bearer token accepted");
            return Ok(TokenStatus::Valid);
        }

        let body = response
            .json::<ProviderErrorBody>()
            .await
            .unwrap_or_default();
        let error = body
            .error
            .unwrap_or_else(|| format!("http_{}", status.as_u16()));
        let description = body
            .error_description
            .unwrap_or_else(|| "token validation failed".to_string());
        warn!(status = status.as_u16(), error = %error, "bearer token rejected");
        Ok(TokenStatus::Rejected { error, description })
    }
}

fn validation_url(
    edl_url: &Url,
    access_token: &str,
    client_id: &str,
) -> Result<Url, DownloadError> {
    let base = edl_url.as_str().trim_end_matches('/');
    let raw = format!("{base}{TOKEN_VALIDATION_PATH}");
    let mut url = Url::parse(&raw).map_err(|_| DownloadError::invalid_url(raw))?;
    url.query_pairs_mut()
        .append_pair("token", access_token)
        .append_pair("client_id", client_id);
    Ok(url)
}

/// The validation URL carries the token; errors only report the endpoint.
fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}
