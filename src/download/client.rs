//! Redirect-following downloader.
//!
//! [`EdlClient`] drives one download through a redirect chain that may cross
//! from the resource server to the identity provider and back. Redirects are
//! followed by hand so that credentials are chosen afresh for every hop; the
//! transport's own redirect handling is disabled.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, LOCATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWrite;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DownloadError;
use super::request::{DownloadRequest, Method};
use super::retry::{
    DEFAULT_TOTAL_RETRIES, RetryDecision, RetryPolicy, RetryState, StatusClass, classify_status,
    is_transient_transport,
};
use super::stream::stream_to_sink;
use crate::auth::{
    AuthMode, CommaSeparatedComposite, CompositeEncoding, Credentials, Endpoint, HopKind,
    TokenValidator, classify_endpoint, same_origin, select_credentials,
};
use crate::config::Config;
use crate::urls::{is_network_url, rewrite_local_host};
use crate::user_agent;

/// Maximum number of redirects followed in one chain.
pub const MAX_REDIRECTS: usize = 10;

/// Metadata of the terminal response. The body has already been written to the sink.
#[derive(Debug, Clone)]
pub struct DownloadResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// URL that produced the terminal response.
    pub url: Url,
    /// Bytes written to the sink.
    pub bytes_written: u64,
}

impl DownloadResponse {
    /// Returns true for 2xx responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where a redirect chain stopped.
enum ChainEnd {
    /// A response to hand back to the caller.
    Terminal(reqwest::Response),
    /// A 401 that the caller may answer with Basic credentials.
    Unauthorized { url: String, status: u16 },
}

/// Client for identity-provider gated downloads.
///
/// Cheap to clone; clones share the connection pool and the token validation cache.
///
/// # Example
///
/// ```no_run
/// use edl_downloader_core::{Config, DownloadRequest, EdlClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::new("https://urs.earthdata.nasa.gov", "client-id", "client-secret")?
///     .with_fallback_authn(true);
/// let client = EdlClient::new(config)?;
/// let request = DownloadRequest::new("https://data.example.com/granule.nc")
///     .with_bearer_token("user-token");
/// let mut sink = tokio::fs::File::create("granule.nc").await?;
/// let response = client.download(&request, &mut sink).await?;
/// println!("HTTP {} ({} bytes)", response.status, response.bytes_written);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EdlClient {
    client: Client,
    config: Arc<Config>,
    validator: Arc<TokenValidator>,
    retry_policy: RetryPolicy,
    composite: Arc<dyn CompositeEncoding>,
}

impl std::fmt::Debug for EdlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdlClient")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl EdlClient {
    /// Creates a client with its own validation cache.
    ///
    /// The retry limit comes from [`Config::max_retries`], defaulting to
    /// [`DEFAULT_TOTAL_RETRIES`].
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, DownloadError> {
        let client = build_client(&config)?;
        let retry_policy =
            RetryPolicy::with_max_retries(config.max_retries().unwrap_or(DEFAULT_TOTAL_RETRIES));
        Ok(Self {
            validator: Arc::new(TokenValidator::new(client.clone())),
            client,
            config: Arc::new(config),
            retry_policy,
            composite: Arc::new(CommaSeparatedComposite),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Shares an existing validation cache, e.g. one per process.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<TokenValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the identity-provider composite credential encoding.
    #[must_use]
    pub fn with_composite_encoding(mut self, composite: Arc<dyn CompositeEncoding>) -> Self {
        self.composite = composite;
        self
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The token validator used by this client.
    #[must_use]
    pub fn validator(&self) -> &Arc<TokenValidator> {
        &self.validator
    }

    /// Downloads `request.url()` into `sink`.
    ///
    /// A 2xx terminal response is streamed into the sink. A redirect without a
    /// `Location` header, or any other 3xx, is returned as-is with nothing written.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::UnsupportedScheme`] / [`DownloadError::InvalidUrl`] before any I/O;
    /// - [`DownloadError::AuthValidation`] when the provider rejects the bearer token;
    /// - [`DownloadError::Authorization`] on a 401 with no fallback left;
    /// - [`DownloadError::MissingCredentials`] with no token and fallback disabled;
    /// - [`DownloadError::RetriesExhausted`] / [`DownloadError::Status`] for failing statuses;
    /// - transport, redirect-limit and sink errors.
    #[instrument(
        skip(self, request, sink),
        fields(url = %request.url(), method = ?request.method())
    )]
    pub async fn download<W>(
        &self,
        request: &DownloadRequest,
        sink: &mut W,
    ) -> Result<DownloadResponse, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.resolve_url(request.url())?;
        if let Some(token) = request.bearer_token() {
            self.check_token(token)?;
        }
        let mut retry = RetryState::new(self.retry_policy.max_retries());

        let mode = self.initial_mode(request, &url).await?;
        let mut end = self.follow_chain(&url, request, &mode, &mut retry).await?;

        if let ChainEnd::Unauthorized { url: denied, status } = &end {
            let can_fall_back =
                matches!(mode, AuthMode::Bearer(_)) && self.config.fallback_authn_enabled();
            if !can_fall_back {
                return Err(DownloadError::authorization(denied.clone(), *status));
            }
            warn!(
                url = %denied,
                "bearer authentication rejected; retrying with Basic credentials"
            );
            end = self
                .follow_chain(&url, request, &AuthMode::Basic, &mut retry)
                .await?;
        }

        match end {
            ChainEnd::Terminal(response) => finish(response, sink).await,
            ChainEnd::Unauthorized { url, status } => {
                Err(DownloadError::authorization(url, status))
            }
        }
    }

    fn resolve_url(&self, raw: &str) -> Result<Url, DownloadError> {
        let raw = match self.config.local_hostname() {
            Some(local_hostname) => rewrite_local_host(raw, local_hostname),
            None => raw.to_string(),
        };
        if !is_network_url(&raw) {
            return Err(DownloadError::unsupported_scheme(raw));
        }
        Url::parse(&raw).map_err(|_| DownloadError::invalid_url(raw))
    }

    /// Rejects a token that cannot travel in an `Authorization` header, before any I/O.
    fn check_token(&self, token: &str) -> Result<(), DownloadError> {
        let composite = Credentials::Composite {
            client_id: self.config.oauth_client_id().to_string(),
            client_secret: self.config.oauth_client_secret().to_string(),
            token: token.to_string(),
        };
        Credentials::Bearer(token.to_string()).header_value(self.composite.as_ref())?;
        composite.header_value(self.composite.as_ref())?;
        Ok(())
    }

    /// Picks bearer or Basic mode, validating the token when the first hop is the resource server.
    async fn initial_mode(
        &self,
        request: &DownloadRequest,
        url: &Url,
    ) -> Result<AuthMode, DownloadError> {
        let fallback = self.config.fallback_authn_enabled();
        let Some(token) = request.bearer_token() else {
            if fallback {
                debug!("no bearer token supplied; using Basic credentials");
                return Ok(AuthMode::Basic);
            }
            return Err(DownloadError::missing_credentials(url.as_str()));
        };

        // When the provider is the first hop its own 302/401 handling is the validation.
        if classify_endpoint(url, self.config.edl_url()) == Endpoint::ResourceServer {
            match self
                .validator
                .validate(&self.config, token, self.config.oauth_client_id())
                .await
            {
                Ok(()) => {}
                Err(error @ (DownloadError::Network { .. } | DownloadError::Timeout { .. }))
                    if fallback =>
                {
                    warn!(error = %error, "token validation unavailable; using Basic credentials");
                    return Ok(AuthMode::Basic);
                }
                Err(error) => return Err(error),
            }
        }
        Ok(AuthMode::Bearer(token.to_string()))
    }

    async fn follow_chain(
        &self,
        start: &Url,
        request: &DownloadRequest,
        mode: &AuthMode,
        retry: &mut RetryState,
    ) -> Result<ChainEnd, DownloadError> {
        let user_agent = user_agent::request_user_agent(&self.config, request.user_agent());
        let mut current = start.clone();
        let mut method = request.method();
        let mut body = request.encoded_form();
        let mut hop = HopKind::Initial;
        let mut via_identity_provider = false;

        for hop_index in 0..=MAX_REDIRECTS {
            let endpoint = classify_endpoint(&current, self.config.edl_url());
            let credentials = select_credentials(&self.config, endpoint, mode, hop);
            debug!(
                hop = hop_index,
                url = %current,
                ?endpoint,
                credentials = credentials.scheme_name(),
                "sending request"
            );

            let response = self
                .send_with_retry(
                    &current,
                    method,
                    body.as_deref(),
                    &credentials,
                    &user_agent,
                    endpoint,
                    retry,
                )
                .await?;
            let status = response.status().as_u16();
            debug!(hop = hop_index, status, "received response");

            match classify_status(status) {
                StatusClass::Success | StatusClass::OtherRedirection => {
                    return Ok(ChainEnd::Terminal(response));
                }
                StatusClass::Unauthorized => {
                    return Ok(ChainEnd::Unauthorized {
                        url: current.to_string(),
                        status,
                    });
                }
                StatusClass::Transient | StatusClass::Fatal => {
                    return Err(DownloadError::status(current.as_str(), status));
                }
                StatusClass::Redirect => {
                    let Some(next) = redirect_target(&current, &response)? else {
                        debug!(status, "redirect without Location; treating as terminal");
                        return Ok(ChainEnd::Terminal(response));
                    };
                    if endpoint == Endpoint::IdentityProvider {
                        via_identity_provider = true;
                    }
                    if method == Method::Post && redirect_drops_body(response.status()) {
                        method = Method::Get;
                        body = None;
                    }
                    hop = HopKind::Redirect {
                        same_origin_as_initial: same_origin(&next, start),
                        via_identity_provider,
                    };
                    current = next;
                }
            }
        }

        Err(DownloadError::too_many_redirects(start.as_str(), MAX_REDIRECTS))
    }

    /// Sends one hop, re-issuing it on transient failures against the resource server.
    #[allow(clippy::too_many_arguments)]
    async fn send_with_retry(
        &self,
        url: &Url,
        method: Method,
        body: Option<&str>,
        credentials: &Credentials,
        user_agent: &str,
        endpoint: Endpoint,
        retry: &mut RetryState,
    ) -> Result<reqwest::Response, DownloadError> {
        loop {
            let result = self
                .send_once(url, method, body, credentials, user_agent)
                .await;

            let transient_status = match &result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if classify_status(status) != StatusClass::Transient {
                        return result;
                    }
                    Some(status)
                }
                Err(DownloadError::Network { source, .. }) if is_transient_transport(source) => {
                    None
                }
                Err(DownloadError::Timeout { .. }) => None,
                Err(_) => return result,
            };

            // The identity provider hop is never retried.
            if endpoint == Endpoint::IdentityProvider {
                return result;
            }

            retry.record_attempt(transient_status);
            match self.retry_policy.should_retry(retry) {
                RetryDecision::Retry { delay, attempt } => {
                    warn!(
                        url = %url,
                        status = ?transient_status,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "transient failure; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(url = %url, status = ?transient_status, %reason, "giving up");
                    return match transient_status {
                        Some(status) => Err(DownloadError::retries_exhausted(
                            url.as_str(),
                            status,
                            retry.attempts_made(),
                        )),
                        None => result,
                    };
                }
            }
        }
    }

    async fn send_once(
        &self,
        url: &Url,
        method: Method,
        body: Option<&str>,
        credentials: &Credentials,
        user_agent: &str,
    ) -> Result<reqwest::Response, DownloadError> {
        let mut builder = self
            .client
            .request(method.as_reqwest(), url.clone())
            .header(USER_AGENT, user_agent);
        if let Some(value) = credentials.header_value(self.composite.as_ref())? {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.to_string());
        }

        builder
            .send()
            .await
            .map_err(|e| DownloadError::from_transport(url.as_str(), e))
    }
}

/// Streams a 2xx body into the sink and collects response metadata.
async fn finish<W>(
    response: reqwest::Response,
    sink: &mut W,
) -> Result<DownloadResponse, DownloadError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let url = response.url().clone();

    let bytes_written = if classify_status(status) == StatusClass::Success {
        stream_to_sink(response, sink, url.as_str()).await?
    } else {
        0
    };

    info!(status, bytes = bytes_written, url = %url, "download complete");
    Ok(DownloadResponse {
        status,
        headers,
        url,
        bytes_written,
    })
}

/// Resolves the `Location` of a redirect against the current URL.
fn redirect_target(
    current: &Url,
    response: &reqwest::Response,
) -> Result<Option<Url>, DownloadError> {
    let Some(location) = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    else {
        return Ok(None);
    };
    let next = current
        .join(location.trim())
        .map_err(|_| DownloadError::invalid_url(location))?;
    if !is_network_url(next.as_str()) {
        return Err(DownloadError::unsupported_scheme(next.as_str()));
    }
    Ok(Some(next))
}

/// 301, 302 and 303 turn a POST into a bodiless GET; 307 and 308 keep both.
fn redirect_drops_body(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    )
}

fn build_client(config: &Config) -> Result<Client, DownloadError> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.read_timeout())
        .gzip(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|source| DownloadError::ClientBuild { source })
}
