//! User-Agent composition for download and validation requests.
//!
//! Every request carries the configured base User-Agent, this library's own
//! identifier and version, and optionally the application name, so provider
//! logs can attribute traffic to the service that issued it.

use crate::config::Config;

/// Base User-Agent used when the configuration does not provide one.
const UNKNOWN_BASE_USER_AGENT: &str = "edl-client (unknown version)";

/// Library identifier appended to every User-Agent.
const LIBRARY_NAME: &str = "edl-downloader";

/// Default User-Agent derived from configuration alone.
#[must_use]
pub(crate) fn default_user_agent(config: &Config) -> String {
    let base = config.user_agent().unwrap_or(UNKNOWN_BASE_USER_AGENT);
    let version = env!("CARGO_PKG_VERSION");
    let mut user_agent = format!("{base} {LIBRARY_NAME}/{version}");
    if let Some(app_name) = config.app_name() {
        user_agent.push_str(&format!(" ({app_name})"));
    }
    user_agent
}

/// User-Agent for a single request: the default, plus the caller's value when supplied.
#[must_use]
pub(crate) fn request_user_agent(config: &Config, caller: Option<&str>) -> String {
    let default = default_user_agent(config);
    match caller.map(str::trim).filter(|ua| !ua.is_empty()) {
        Some(ua) => format!("{default} {ua}"),
        None => default,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("https://edl.example.com", "client", "secret").unwrap()
    }

    #[test]
    fn test_default_user_agent_unknown_base() {
        let ua = default_user_agent(&config());
        assert_eq!(
            ua,
            format!(
                "edl-client (unknown version) edl-downloader/{}",
                env!("CARGO_PKG_VERSION")
            )
        );
    }

    #[test]
    fn test_default_user_agent_configured_base() {
        let ua = default_user_agent(&config().with_user_agent("harmony/3.3.3 (harmony-test)"));
        assert!(ua.starts_with("harmony/3.3.3 (harmony-test) edl-downloader/"), "{ua}");
    }

    #[test]
    fn test_default_user_agent_includes_app_name() {
        let ua = default_user_agent(&config().with_app_name("gdal-subsetter"));
        assert!(ua.ends_with(" (gdal-subsetter)"), "{ua}");
    }

    #[test]
    fn test_request_user_agent_appends_caller_value() {
        let ua = request_user_agent(&config(), Some("test-agent/0.0.0"));
        assert!(ua.starts_with("edl-client (unknown version)"), "{ua}");
        assert!(ua.ends_with(" test-agent/0.0.0"), "{ua}");
    }

    #[test]
    fn test_request_user_agent_ignores_blank_caller_value() {
        let config = config();
        assert_eq!(
            request_user_agent(&config, Some("  ")),
            default_user_agent(&config)
        );
    }
}
