//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use edl_downloader_core::DEFAULT_TOTAL_RETRIES;

/// Production Earthdata Login endpoint.
pub const DEFAULT_EDL_URL: &str = "https://urs.earthdata.nasa.gov";

/// Download a resource protected by Earthdata Login.
///
/// The request follows redirects through the identity provider, authenticating
/// each hop with a bearer token or, when enabled, the application's Basic
/// credentials.
#[derive(Parser, Debug)]
#[command(name = "edl-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// URL to download
    pub url: String,

    /// Output file or directory (default: generated name in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// User access token sent as a bearer credential
    #[arg(short, long, env = "EDL_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Form field sent in a POST body (repeatable)
    #[arg(short, long = "data", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,

    /// Extra User-Agent value appended for this request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Base User-Agent of the calling service
    #[arg(long, env = "USER_AGENT")]
    pub base_user_agent: Option<String>,

    /// Identity provider base URL
    #[arg(long, env = "EDL_URL", default_value = DEFAULT_EDL_URL)]
    pub edl_url: String,

    /// Application OAuth client id
    #[arg(long, env = "OAUTH_CLIENT_ID")]
    pub client_id: String,

    /// Application OAuth client secret
    #[arg(long, env = "OAUTH_CLIENT_SECRET", hide_env_values = true, default_value = "")]
    pub client_secret: String,

    /// Fall back to Basic authentication when no usable token is available
    #[arg(long, env = "FALLBACK_AUTHN_ENABLED")]
    pub fallback_authn: bool,

    /// Application name appended to the User-Agent
    #[arg(long, env = "APP_NAME")]
    pub app_name: Option<String>,

    /// Hostname that replaces `localhost` in request URLs
    #[arg(long, env = "LOCAL_HOSTNAME")]
    pub local_hostname: Option<String>,

    /// Maximum retries for transient failures (1-10)
    #[arg(
        short = 'r',
        long,
        default_value_t = DEFAULT_TOTAL_RETRIES as u8,
        value_parser = clap::value_parser!(u8).range(1..=10)
    )]
    pub max_retries: u8,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}
