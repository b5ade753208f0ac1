//! Storefront URL helpers.
//!
//! Shopify handles for Thai listings often carry the word `ปี` ("year") as a
//! separate dash-delimited segment, e.g. `isuzu-d-max-ปี-2014`. Public URLs
//! drop that segment.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Dash-delimited segment removed from public car URLs.
const YEAR_WORD: &str = "ปี";

/// Locale prefixes that mirror every storefront page.
const LOCALE_PREFIXES: &[&str] = &["/en"];

/// Percent-encodes everything in a path segment except RFC 3986 unreserved
/// characters.
pub const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Turns a Shopify handle into the slug used in public URLs.
///
/// Percent-encoded handles are decoded first. The standalone `ปี` segment is
/// removed and repeated, leading, or trailing dashes collapse, so applying
/// the transform to its own output is a no-op.
#[must_use]
pub fn create_pretty_url(handle: &str) -> String {
    let decoded = if handle.contains('%') {
        percent_decode_str(handle).decode_utf8_lossy().into_owned()
    } else {
        handle.to_owned()
    };

    decoded
        .trim()
        .split('-')
        .filter(|segment| !segment.is_empty() && *segment != YEAR_WORD)
        .collect::<Vec<_>>()
        .join("-")
}

/// Path of the car detail page for `handle`.
#[must_use]
pub fn car_path(handle: &str) -> String {
    format!("/car/{}", create_pretty_url(handle))
}

/// Reconstructs the likely Shopify handle for a pretty slug whose last
/// segment is a year, by restoring the `ปี` segment in front of it.
///
/// Returns `None` when the slug does not end in a four-digit year or already
/// carries the year word.
#[must_use]
pub fn handle_with_year_word(slug: &str) -> Option<String> {
    let (head, year) = slug.rsplit_once('-')?;
    let is_year = year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit());
    if !is_year || head.is_empty() || head.ends_with(YEAR_WORD) {
        return None;
    }
    Some(format!("{head}-{YEAR_WORD}-{year}"))
}

/// Percent-encodes each segment of `path`, keeping the `/` separators, so
/// Thai slugs can be placed in a URL.
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns `path` followed by each localized variant of it.
///
/// `"/"` maps to the bare locale prefix (`"/en"`), everything else is
/// prefixed (`"/car/x"` → `"/en/car/x"`).
#[must_use]
pub fn localized_paths(path: &str) -> Vec<String> {
    let mut paths = vec![path.to_owned()];
    for prefix in LOCALE_PREFIXES {
        if path == "/" {
            paths.push((*prefix).to_owned());
        } else {
            paths.push(format!("{prefix}{path}"));
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_year_word_between_dashes() {
        assert_eq!(create_pretty_url("isuzu-d-max-ปี-2014"), "isuzu-d-max-2014");
    }

    #[test]
    fn pretty_url_is_idempotent() {
        let once = create_pretty_url("toyota-vios-ปี-2018-ปี");
        assert_eq!(once, "toyota-vios-2018");
        assert_eq!(create_pretty_url(&once), once);
    }

    #[test]
    fn collapses_duplicate_and_edge_dashes() {
        assert_eq!(create_pretty_url("-honda--city---2019-"), "honda-city-2019");
    }

    #[test]
    fn keeps_year_word_inside_a_longer_segment() {
        assert_eq!(create_pretty_url("mazda-2-ปีใหม่"), "mazda-2-ปีใหม่");
    }

    #[test]
    fn decodes_percent_encoded_handles() {
        assert_eq!(
            create_pretty_url("isuzu-d-max-%E0%B8%9B%E0%B8%B5-2014"),
            "isuzu-d-max-2014"
        );
    }

    #[test]
    fn car_path_uses_pretty_slug() {
        assert_eq!(car_path("nissan-navara-ปี-2020"), "/car/nissan-navara-2020");
    }

    #[test]
    fn restores_year_word_before_trailing_year() {
        assert_eq!(
            handle_with_year_word("isuzu-d-max-2014").as_deref(),
            Some("isuzu-d-max-ปี-2014")
        );
        assert_eq!(
            create_pretty_url(&handle_with_year_word("isuzu-d-max-2014").unwrap()),
            "isuzu-d-max-2014"
        );
    }

    #[test]
    fn year_word_not_restored_without_trailing_year() {
        assert!(handle_with_year_word("honda-city-turbo").is_none());
        assert!(handle_with_year_word("isuzu-d-max-ปี-2014").is_none());
        assert!(handle_with_year_word("2014").is_none());
        assert!(handle_with_year_word("honda-city-20144").is_none());
    }

    #[test]
    fn encode_path_escapes_each_segment() {
        assert_eq!(encode_path("/car/honda-jazz-2017"), "/car/honda-jazz-2017");
        assert_eq!(encode_path("/"), "/");
        assert_eq!(
            encode_path("/car/ฮอนด้า-jazz"),
            "/car/%E0%B8%AE%E0%B8%AD%E0%B8%99%E0%B8%94%E0%B9%89%E0%B8%B2-jazz"
        );
        assert_eq!(encode_path("/car/a b&c"), "/car/a%20b%26c");
    }

    #[test]
    fn localized_paths_prefix_each_path() {
        assert_eq!(localized_paths("/all-cars"), vec!["/all-cars", "/en/all-cars"]);
        assert_eq!(localized_paths("/"), vec!["/", "/en"]);
    }
}
