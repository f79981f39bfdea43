//! Authentication for identity-provider gated downloads.
//!
//! This module decides which credentials accompany each request in a redirect
//! chain and validates user bearer tokens with the identity provider.

mod credentials;
mod selector;
mod validator;

pub use credentials::{CommaSeparatedComposite, CompositeEncoding, Credentials};
pub(crate) use selector::same_origin;
pub use selector::{AuthMode, Endpoint, HopKind, classify_endpoint, select_credentials};
pub use validator::TokenValidator;
