//! Route classification for intercepted requests.

use http::Method;
use url::Url;

/// Third-party hosts the worker never intercepts. Subdomains match too.
pub const BYPASS_HOSTS: &[&str] = &[
    "fonts.googleapis.com",
    "fonts.gstatic.com",
    "facebook.com",
    "connect.facebook.net",
    "google-analytics.com",
    "googletagmanager.com",
];

/// Image extensions served cache-first.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico"];

/// Locale prefixes that mirror the default-locale page routes.
pub const LOCALE_PREFIXES: &[&str] = &["/en"];

const STATIC_PREFIX: &str = "/_next/static/";

/// How a request is handled by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Never intercepted: non-GET requests and analytics/font hosts.
    Bypass,
    /// Network-first with cache fallback.
    Page,
    /// Cache-first with network fill.
    Static,
    /// Not intercepted; the browser fetches normally.
    Passthrough,
}

impl RouteClass {
    /// Whether the worker answers the request itself.
    #[must_use]
    pub fn is_intercepted(self) -> bool {
        matches!(self, Self::Page | Self::Static)
    }

    /// `Cache-Control` value servers should attach to successful responses
    /// of this class.
    #[must_use]
    pub fn cache_control(self) -> Option<&'static str> {
        match self {
            Self::Page => Some("public, s-maxage=60, stale-while-revalidate=300"),
            Self::Static => Some("public, max-age=31536000, immutable"),
            Self::Bypass | Self::Passthrough => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    bypass_hosts: Vec<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(BYPASS_HOSTS.iter().map(|h| (*h).to_owned()).collect())
    }
}

impl CachePolicy {
    #[must_use]
    pub fn new(bypass_hosts: Vec<String>) -> Self {
        Self { bypass_hosts }
    }

    /// Classifies an absolute request URL.
    #[must_use]
    pub fn classify(&self, method: &Method, url: &Url) -> RouteClass {
        if *method != Method::GET {
            return RouteClass::Bypass;
        }
        if !matches!(url.scheme(), "http" | "https") {
            return RouteClass::Passthrough;
        }
        if url.host_str().is_some_and(|host| self.is_bypass_host(host)) {
            return RouteClass::Bypass;
        }
        Self::classify_path(method, url.path())
    }

    /// Classifies a same-origin request path.
    #[must_use]
    pub fn classify_path(method: &Method, path: &str) -> RouteClass {
        if *method != Method::GET {
            return RouteClass::Bypass;
        }
        if is_page_path(path) {
            RouteClass::Page
        } else if is_static_path(path) {
            RouteClass::Static
        } else {
            RouteClass::Passthrough
        }
    }

    fn is_bypass_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.bypass_hosts.iter().any(|bypass| {
            host == *bypass
                || host
                    .strip_suffix(bypass.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn strip_locale(path: &str) -> &str {
    for prefix in LOCALE_PREFIXES {
        if path == *prefix {
            return "/";
        }
        if let Some(rest) = path.strip_prefix(prefix) {
            if rest.starts_with('/') {
                return rest;
            }
        }
    }
    path
}

fn is_page_path(path: &str) -> bool {
    let path = strip_locale(path);
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    match trimmed {
        "/" | "/all-cars" => true,
        _ => trimmed
            .strip_prefix("/car/")
            .is_some_and(|handle| !handle.is_empty() && !handle.contains('/')),
    }
}

fn is_static_path(path: &str) -> bool {
    if path.starts_with(STATIC_PREFIX) {
        return true;
    }
    let file = path.rsplit('/').next().unwrap_or_default();
    file.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(method: Method, url: &str) -> RouteClass {
        CachePolicy::default().classify(&method, &Url::parse(url).expect("valid url"))
    }

    #[test]
    fn listing_and_detail_pages_are_cache_eligible() {
        for url in [
            "https://carlot.example/",
            "https://carlot.example/all-cars",
            "https://carlot.example/all-cars/",
            "https://carlot.example/car/isuzu-d-max-2014",
            "https://carlot.example/en",
            "https://carlot.example/en/all-cars",
            "https://carlot.example/en/car/isuzu-d-max-2014",
        ] {
            assert_eq!(classify(Method::GET, url), RouteClass::Page, "{url}");
        }
    }

    #[test]
    fn fonts_and_analytics_are_never_intercepted() {
        for url in [
            "https://fonts.googleapis.com/css2?family=Prompt",
            "https://fonts.gstatic.com/s/prompt/v10/a.woff2",
            "https://www.facebook.com/tr?id=1",
            "https://connect.facebook.net/en_US/fbevents.js",
            "https://www.google-analytics.com/g/collect",
            "https://www.googletagmanager.com/gtag/js?id=G-1",
        ] {
            let class = classify(Method::GET, url);
            assert_eq!(class, RouteClass::Bypass, "{url}");
            assert!(!class.is_intercepted());
        }
    }

    #[test]
    fn bypass_host_requires_label_boundary() {
        assert_eq!(
            classify(Method::GET, "https://notfacebook.com/car/x"),
            RouteClass::Page
        );
    }

    #[test]
    fn next_static_and_images_are_cache_first() {
        for url in [
            "https://carlot.example/_next/static/chunks/main.js",
            "https://carlot.example/images/hero.webp",
            "https://carlot.example/favicon.ico",
            "https://cdn.shopify.com/s/files/1/car.JPG",
        ] {
            assert_eq!(classify(Method::GET, url), RouteClass::Static, "{url}");
        }
    }

    #[test]
    fn non_get_requests_bypass() {
        assert_eq!(
            classify(Method::POST, "https://carlot.example/all-cars"),
            RouteClass::Bypass
        );
    }

    #[test]
    fn other_routes_pass_through() {
        for url in [
            "https://carlot.example/api/cars",
            "https://carlot.example/car/",
            "https://carlot.example/car/a/b",
            "https://carlot.example/english",
            "https://carlot.example/.png",
        ] {
            assert_eq!(classify(Method::GET, url), RouteClass::Passthrough, "{url}");
        }
    }

    #[test]
    fn cache_control_only_for_intercepted_classes() {
        assert!(RouteClass::Page.cache_control().is_some());
        assert!(RouteClass::Static
            .cache_control()
            .is_some_and(|v| v.contains("immutable")));
        assert!(RouteClass::Passthrough.cache_control().is_none());
        assert!(RouteClass::Bypass.cache_control().is_none());
    }
}
