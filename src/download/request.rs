//! Download request data model.

/// HTTP method of a download. POST is used iff form data is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Plain retrieval.
    Get,
    /// Form submission.
    Post,
}

impl Method {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
        }
    }
}

/// One download: target URL, optional form body, optional bearer token and User-Agent.
///
/// ```
/// use edl_downloader_core::{DownloadRequest, Method};
///
/// let request = DownloadRequest::new("https://example.com/granule.nc")
///     .with_form([("param", "value")])
///     .with_user_agent("test-agent/0.0.0");
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.encoded_form().as_deref(), Some("param=value"));
/// ```
#[derive(Clone)]
pub struct DownloadRequest {
    url: String,
    form: Option<Vec<(String, String)>>,
    bearer_token: Option<String>,
    user_agent: Option<String>,
}

impl std::fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.url)
            .field("method", &self.method())
            .field("has_bearer_token", &self.bearer_token.is_some())
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl DownloadRequest {
    /// Creates a GET request for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            form: None,
            bearer_token: None,
            user_agent: None,
        }
    }

    /// Attaches form data, switching the method to POST.
    #[must_use]
    pub fn with_form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Attaches the user's bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Attaches a bearer token when one is available.
    #[must_use]
    pub fn with_optional_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Appends a caller-specific value to the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Target URL as supplied.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST iff form data is present.
    #[must_use]
    pub fn method(&self) -> Method {
        if self.form.is_some() {
            Method::Post
        } else {
            Method::Get
        }
    }

    /// Bearer token, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Caller's User-Agent addition, if any.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// The form body encoded as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn encoded_form(&self) -> Option<String> {
        self.form.as_ref().map(|pairs| {
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish()
        })
    }
}
