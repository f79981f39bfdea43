//! Caller-supplied configuration for authenticated downloads.
//!
//! Loading configuration is the application's job; the library only defines
//! the shape and validates it. The CLI fills a [`Config`] from flags and
//! environment variables.

use std::num::NonZeroU32;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::urls::is_network_url;

/// Default HTTP connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP read timeout (5 minutes for large files).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors raised while building or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The identity provider URL could not be parsed.
    #[error("invalid identity provider URL {url}: {source}")]
    InvalidProviderUrl {
        /// The offending URL text.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The identity provider URL is not http(s).
    #[error("identity provider URL must use http or https: {url}")]
    ProviderNotNetwork {
        /// The offending URL text.
        url: String,
    },

    /// The OAuth client id is empty.
    #[error("OAuth client id must not be empty")]
    MissingClientId,
}

/// Configuration shared by every download issued through one client.
#[derive(Clone)]
pub struct Config {
    edl_url: Url,
    oauth_client_id: String,
    oauth_client_secret: String,
    fallback_authn_enabled: bool,
    user_agent: Option<String>,
    app_name: Option<String>,
    local_hostname: Option<String>,
    max_retries: Option<NonZeroU32>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("edl_url", &self.edl_url.as_str())
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &"<redacted>")
            .field("fallback_authn_enabled", &self.fallback_authn_enabled)
            .field("user_agent", &self.user_agent)
            .field("app_name", &self.app_name)
            .field("local_hostname", &self.local_hostname)
            .field("max_retries", &self.max_retries)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl Config {
    /// Creates a configuration for the given identity provider and OAuth application.
    ///
    /// Basic fallback authentication starts disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the provider URL is not a valid http(s) URL or
    /// the client id is empty.
    pub fn new(
        edl_url: &str,
        oauth_client_id: impl Into<String>,
        oauth_client_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if !is_network_url(edl_url) {
            return Err(ConfigError::ProviderNotNetwork {
                url: edl_url.to_string(),
            });
        }
        let parsed = Url::parse(edl_url).map_err(|source| ConfigError::InvalidProviderUrl {
            url: edl_url.to_string(),
            source,
        })?;
        let config = Self {
            edl_url: parsed,
            oauth_client_id: oauth_client_id.into(),
            oauth_client_secret: oauth_client_secret.into(),
            fallback_authn_enabled: false,
            user_agent: None,
            app_name: None,
            local_hostname: None,
            max_retries: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    /// Enables or disables Basic fallback authentication.
    #[must_use]
    pub fn with_fallback_authn(mut self, enabled: bool) -> Self {
        self.fallback_authn_enabled = enabled;
        self
    }

    /// Sets the base User-Agent that every request starts from.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the application name appended to the User-Agent.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Sets the hostname that replaces `localhost` in download URLs.
    #[must_use]
    pub fn with_local_hostname(mut self, local_hostname: impl Into<String>) -> Self {
        self.local_hostname = Some(local_hostname.into());
        self
    }

    /// Overrides the number of retries after the first attempt.
    ///
    /// The limit is at least one; a download that must not retry belongs in a
    /// custom [`RetryPolicy`](crate::RetryPolicy).
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: NonZeroU32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Overrides the connect and read timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    /// Checks invariants that the builder methods cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingClientId`] when the client id is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth_client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        Ok(())
    }

    /// Base URL of the identity provider.
    #[must_use]
    pub fn edl_url(&self) -> &Url {
        &self.edl_url
    }

    /// OAuth client id of this application.
    #[must_use]
    pub fn oauth_client_id(&self) -> &str {
        &self.oauth_client_id
    }

    /// OAuth client secret of this application.
    #[must_use]
    pub fn oauth_client_secret(&self) -> &str {
        &self.oauth_client_secret
    }

    /// Whether Basic authentication is used when bearer auth is unavailable or rejected.
    #[must_use]
    pub fn fallback_authn_enabled(&self) -> bool {
        self.fallback_authn_enabled
    }

    /// Configured base User-Agent, if any.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Configured application name, if any.
    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// Configured replacement for `localhost`, if any.
    #[must_use]
    pub fn local_hostname(&self) -> Option<&str> {
        self.local_hostname.as_deref()
    }

    /// Retry limit override, if any.
    #[must_use]
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries.map(NonZeroU32::get)
    }

    /// HTTP connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// HTTP read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = Config::new("https://uat.urs.earthdata.nasa.gov", "client", "secret")
            .unwrap();
        assert_eq!(config.edl_url().host_str(), Some("uat.urs.earthdata.nasa.gov"));
        assert!(!config.fallback_authn_enabled());
        assert_eq!(config.max_retries(), None);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_config_rejects_non_network_provider() {
        let result = Config::new("s3://bucket/edl", "client", "secret");
        assert!(matches!(result, Err(ConfigError::ProviderNotNetwork { .. })));
    }

    #[test]
    fn test_config_rejects_unparseable_provider() {
        let result = Config::new("https://", "client", "secret");
        assert!(matches!(result, Err(ConfigError::InvalidProviderUrl { .. })));
    }

    #[test]
    fn test_config_rejects_blank_client_id() {
        let result = Config::new("https://edl.example.com", "  ", "secret");
        assert!(matches!(result, Err(ConfigError::MissingClientId)));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = Config::new("https://edl.example.com", "client", "hunter2").unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"), "secret leaked: {rendered}");
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_config_builders() {
        let config = Config::new("https://edl.example.com", "client", "secret")
            .unwrap()
            .with_fallback_authn(true)
            .with_user_agent("harmony/3.3.3")
            .with_app_name("subsetter")
            .with_local_hostname("dev.local")
            .with_max_retries(NonZeroU32::new(5).unwrap());
        assert!(config.fallback_authn_enabled());
        assert_eq!(config.user_agent(), Some("harmony/3.3.3"));
        assert_eq!(config.app_name(), Some("subsetter"));
        assert_eq!(config.local_hostname(), Some("dev.local"));
        assert_eq!(config.max_retries(), Some(5));
    }
}
