//! URL classification helpers.
//!
//! Decides whether a URL is fetched over HTTP at all, and rewrites loopback
//! URLs so that services running on a developer machine stay reachable from
//! other hosts on the local network. Both functions are pure string
//! transformations; no network access is performed.

/// The hostname rewritten by [`rewrite_local_host`].
const LOOPBACK_HOSTNAME: &str = "localhost";

/// Returns true if the URL's scheme is exactly `http` or `https`.
///
/// The comparison is case-insensitive and applies to the whole scheme token,
/// so `HTTP://example.com` matches while `httpsnope://example.com` and
/// `s3://bucket/key` do not.
#[must_use]
pub fn is_network_url(url: &str) -> bool {
    url.split_once(':').is_some_and(|(scheme, _)| {
        scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
    })
}

/// Replaces a `localhost` host with `local_hostname`.
///
/// Only the host component changes; scheme, userinfo, port, path, query and
/// fragment are kept byte-for-byte. Non-network URLs and URLs whose host is
/// anything other than `localhost` are returned unchanged.
///
/// ```
/// use edl_downloader_core::rewrite_local_host;
///
/// assert_eq!(
///     rewrite_local_host("http://localhost:3000/jobs", "dev.local"),
///     "http://dev.local:3000/jobs"
/// );
/// assert_eq!(rewrite_local_host("s3://bucket/key", "dev.local"), "s3://bucket/key");
/// ```
#[must_use]
pub fn rewrite_local_host(url: &str, local_hostname: &str) -> String {
    if !is_network_url(url) {
        return url.to_string();
    }
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let (userinfo, host_port) = match authority.rfind('@') {
        Some(at) => authority.split_at(at + 1),
        None => ("", authority),
    };
    // Bracketed IPv6 literals may contain ':' and are never the loopback name.
    let (host, port) = match host_port.rfind(':') {
        Some(colon) if !host_port.starts_with('[') => host_port.split_at(colon),
        _ => (host_port, ""),
    };

    if !host.eq_ignore_ascii_case(LOOPBACK_HOSTNAME) {
        return url.to_string();
    }
    format!("{scheme}://{userinfo}{local_hostname}{port}{tail}")
}
