//! Output filename generation for downloaded resources.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of two or more underscores.
#[allow(clippy::expect_used)]
static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("underscore regex is valid"));

/// An underscore directly before or after a period.
#[allow(clippy::expect_used)]
static UNDERSCORE_AT_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_?\._?").expect("period regex is valid"));

const REGRIDDED_SUFFIX: &str = "_regridded";
const SUBSETTED_SUFFIX: &str = "_subsetted";

/// Derives a local filename from a resource URL.
///
/// The last path segment is percent-decoded (decoded `/` become `_`),
/// `ext` replaces its extension, and `_{variable}` (only when exactly one
/// variable is requested), `_regridded` and `_subsetted` are appended in that
/// order. Suffixes already present are not repeated.
///
/// ```
/// use edl_downloader_core::generate_output_filename;
///
/// let url = "https://example.com/fake-path/abc.123.nc/?query=true";
/// assert_eq!(generate_output_filename(url, Some("zarr"), &[], false, false), "abc.123.zarr");
/// assert_eq!(
///     generate_output_filename(url, Some("zarr"), &["VarA"], true, true),
///     "abc.123_VarA_regridded_subsetted.zarr"
/// );
/// ```
#[must_use]
pub fn generate_output_filename(
    url: &str,
    ext: Option<&str>,
    variable_subset: &[&str],
    is_regridded: bool,
    is_subsetted: bool,
) -> String {
    let name = last_segment(url);
    let (mut stem, original_ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(ext.to_string())),
        None => (name.clone(), None),
    };
    let ext = ext
        .map(|e| e.trim_start_matches('.').to_string())
        .or(original_ext);

    let mut suffixes = Vec::new();
    if let [variable] = variable_subset {
        suffixes.push(format!("_{}", variable.replace('/', "_")));
    }
    if is_regridded {
        suffixes.push(REGRIDDED_SUFFIX.to_string());
    }
    if is_subsetted {
        suffixes.push(SUBSETTED_SUFFIX.to_string());
    }

    for suffix in &suffixes {
        stem = stem.replace(suffix.as_str(), "");
    }
    stem.push_str(&suffixes.concat());

    let filename = match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    };
    normalize(&filename)
}

/// Last non-empty path segment of `url`, percent-decoded, with decoded `/` replaced.
fn last_segment(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let raw = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query);
    let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |d| d.into_owned());
    decoded.replace('/', "_")
}

fn normalize(filename: &str) -> String {
    let collapsed = UNDERSCORE_RUN.replace_all(filename, "_");
    let periods = UNDERSCORE_AT_PERIOD.replace_all(&collapsed, ".");
    periods.trim_matches('_').to_string()
}
