//! Authentication material attached to a single outgoing request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::HeaderValue;

use crate::download::DownloadError;

/// Encodes the combined application + user credential sent to the identity provider.
///
/// The provider's token-exchange contract expects the application's Basic
/// credential and the user's bearer token in one `Authorization` header. The
/// exact layout is provider-specific, so it is pluggable.
pub trait CompositeEncoding: Send + Sync {
    /// Renders the `Authorization` header value.
    fn encode(&self, client_id: &str, client_secret: &str, token: &str) -> String;
}

/// `Basic <base64(client_id:client_secret)>, Bearer <token>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaSeparatedComposite;

impl CompositeEncoding for CommaSeparatedComposite {
    fn encode(&self, client_id: &str, client_secret: &str, token: &str) -> String {
        format!("{}, Bearer {token}", basic_value(client_id, client_secret))
    }
}

/// Credentials chosen for one request. Exactly one variant is active per hop.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Send the request unauthenticated.
    None,
    /// User bearer token.
    Bearer(String),
    /// Application Basic credential.
    Basic {
        /// OAuth client id.
        client_id: String,
        /// OAuth client secret.
        client_secret: String,
    },
    /// Application Basic credential combined with the user's bearer token,
    /// used only against the identity provider.
    Composite {
        /// OAuth client id.
        client_id: String,
        /// OAuth client secret.
        client_secret: String,
        /// User bearer token.
        token: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme_name())
    }
}

impl Credentials {
    /// Short name used in logs; never includes secret material.
    #[must_use]
    pub fn scheme_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer(_) => "bearer",
            Self::Basic { .. } => "basic",
            Self::Composite { .. } => "composite",
        }
    }

    /// Returns true when no `Authorization` header will be sent.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Renders the `Authorization` header value, or `None` for [`Credentials::None`].
    ///
    /// Values are marked sensitive so they are masked in transport debug output.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidCredentials`] when the rendered value
    /// contains bytes that are not allowed in an HTTP header.
    pub fn header_value(
        &self,
        composite: &dyn CompositeEncoding,
    ) -> Result<Option<HeaderValue>, DownloadError> {
        let raw = match self {
            Self::None => return Ok(None),
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic {
                client_id,
                client_secret,
            } => basic_value(client_id, client_secret),
            Self::Composite {
                client_id,
                client_secret,
                token,
            } => composite.encode(client_id, client_secret, token),
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| DownloadError::invalid_credentials(self.scheme_name()))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}

fn basic_value(client_id: &str, client_secret: &str) -> String {
    let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {encoded}")
}
