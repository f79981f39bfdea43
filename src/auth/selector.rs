//! Per-hop authentication strategy selection.
//!
//! Credentials are recomputed for every request in a redirect chain from the
//! target's classification alone. Nothing is carried over from the previous
//! hop, so an `Authorization` header can never follow a redirect to a host
//! that is neither the resource server nor the identity provider.
//!
//! | Target | Mode | Hop | Credentials |
//! |--------|------|-----|-------------|
//! | Identity provider | Bearer | any | Composite |
//! | Identity provider | Basic | any | Basic |
//! | Resource server | Bearer | any | None |
//! | Resource server | Basic | initial | Basic |
//! | Resource server | Basic | redirect on initial origin, provider not visited | Basic |
//! | Resource server | Basic | any other redirect | None |

use url::Url;

use super::Credentials;
use crate::config::Config;

/// Classification of a request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The configured identity provider.
    IdentityProvider,
    /// Anything else: the server holding the resource, or one it redirects to.
    ResourceServer,
}

/// Authentication mode for a whole redirect chain.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// The user's bearer token drives the OAuth redirect dance.
    Bearer(String),
    /// Application Basic credentials.
    Basic,
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer"),
            Self::Basic => f.write_str("Basic"),
        }
    }
}

/// Position of a request within its redirect chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopKind {
    /// The first request of the chain.
    Initial,
    /// A request issued because of a redirect.
    Redirect {
        /// The target shares scheme, host and port with the initial request.
        same_origin_as_initial: bool,
        /// The chain has already passed through the identity provider.
        via_identity_provider: bool,
    },
}

/// Classifies `target` by comparing host and effective port with the provider URL.
#[must_use]
pub fn classify_endpoint(target: &Url, identity_provider: &Url) -> Endpoint {
    let same_host = match (target.host_str(), identity_provider.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if same_host && target.port_or_known_default() == identity_provider.port_or_known_default() {
        Endpoint::IdentityProvider
    } else {
        Endpoint::ResourceServer
    }
}

/// Returns true when both URLs share scheme, host and effective port.
#[must_use]
pub(crate) fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Chooses the credentials for one hop.
#[must_use]
pub fn select_credentials(
    config: &Config,
    endpoint: Endpoint,
    mode: &AuthMode,
    hop: HopKind,
) -> Credentials {
    match (endpoint, mode) {
        (Endpoint::IdentityProvider, AuthMode::Bearer(token)) => Credentials::Composite {
            client_id: config.oauth_client_id().to_string(),
            client_secret: config.oauth_client_secret().to_string(),
            token: token.clone(),
        },
        (Endpoint::IdentityProvider, AuthMode::Basic) => basic(config),
        (Endpoint::ResourceServer, AuthMode::Bearer(_)) => Credentials::None,
        (Endpoint::ResourceServer, AuthMode::Basic) => match hop {
            HopKind::Initial
            | HopKind::Redirect {
                same_origin_as_initial: true,
                via_identity_provider: false,
            } => basic(config),
            HopKind::Redirect { .. } => Credentials::None,
        },
    }
}

fn basic(config: &Config) -> Credentials {
    Credentials::Basic {
        client_id: config.oauth_client_id().to_string(),
        client_secret: config.oauth_client_secret().to_string(),
    }
}
