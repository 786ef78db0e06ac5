//! Story URL handling: CDN-proxy rewriting and viewer parameters.
//!
//! Before a story URL is assigned to a container it may be rewritten to a
//! supported CDN-proxy form, and it always gains a fragment carrying the
//! viewer parameters (initial visibility state, embedding origin, player
//! capabilities).  Comparison of assigned sources ignores search and
//! fragment so redundant reassignments are skipped.

use url::form_urlencoded;
use url::Url;

use crate::core::protocol::VisibilityState;
use crate::error::PlayerError;

/// CDN proxy hosts the player knows how to rewrite story URLs for.
pub const SUPPORTED_CACHES: &[&str] = &["cdn.ampproject.org", "www.bing-amp.com"];

/// Serving-variant path prefix used by proxy origins for viewer embeds.
const VIEWER_VARIANT: &str = "/v/";

/// True when `url` is already served from a CDN proxy origin.
pub fn is_proxy_url(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => {
            host == "cdn.ampproject.org"
                || host.ends_with(".cdn.ampproject.org")
                || host == "www.bing-amp.com"
        }
        None => false,
    }
}

/// Rewrite `href` to its CDN-proxy "viewer" form when a supported cache
/// host is configured.
///
/// - No cache configured: the URL is returned unchanged.
/// - Already a proxy URL: normalised to the viewer serving variant.
/// - Unsupported cache host: [`PlayerError::UnsupportedCache`] — callers
///   report it and fall back to the original URL.
pub fn resolve_cache_url(href: &str, cache_host: Option<&str>) -> Result<String, PlayerError> {
    let Some(cache) = cache_host else {
        return Ok(href.to_owned());
    };

    let Ok(parsed) = Url::parse(href) else {
        return Ok(href.to_owned());
    };

    if is_proxy_url(&parsed) {
        return Ok(normalize_serving_variant(&parsed));
    }

    if !SUPPORTED_CACHES.contains(&cache) {
        return Err(PlayerError::UnsupportedCache(cache.to_owned()));
    }

    let host = parsed.host_str().unwrap_or_default();
    let secure = if parsed.scheme() == "https" { "s/" } else { "" };
    let mut rewritten = format!(
        "https://{cache}{VIEWER_VARIANT}{secure}{host}{path}",
        path = parsed.path()
    );
    if let Some(query) = parsed.query() {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    Ok(rewritten)
}

/// Normalise a proxy URL's serving variant to the viewer form (`/v/`).
fn normalize_serving_variant(url: &Url) -> String {
    let mut out = url.clone();
    let path = url.path();
    if let Some(rest) = path.strip_prefix("/c/") {
        out.set_path(&format!("{VIEWER_VARIANT}{rest}"));
    }
    out.to_string()
}

/// Build the effective container source: `href` with the viewer fragment
/// parameters merged over any fragment already present.
pub fn viewer_source_url(
    href: &str,
    visibility: VisibilityState,
    origin: &str,
    attribution_auto: bool,
) -> String {
    let Ok(mut parsed) = Url::parse(href) else {
        return href.to_owned();
    };

    let mut params: Vec<(String, String)> = parsed
        .fragment()
        .map(|f| {
            form_urlencoded::parse(f.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let mut overlay = vec![
        ("visibilityState", visibility.as_str().to_owned()),
        ("origin", origin.to_owned()),
        ("showStoryUrlInfo", "0".to_owned()),
        ("storyPlayer", "v0".to_owned()),
        ("cap", "swipe".to_owned()),
    ];
    if attribution_auto {
        overlay.push(("attribution", "auto".to_owned()));
    }
    for (key, value) in overlay {
        match params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => params.push((key.to_owned(), value)),
        }
    }

    if is_proxy_url(&parsed) {
        // Proxy origins need the viewer messaging shim version pinned.
        if !parsed
            .query_pairs()
            .any(|(k, _)| k == "amp_js_v")
        {
            parsed.query_pairs_mut().append_pair("amp_js_v", "0.1");
        }
    }

    let fragment = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    parsed.set_fragment(Some(&fragment));
    parsed.to_string()
}

/// Compare two hrefs ignoring search and fragment.  An empty assigned
/// source never equals anything (forces the first assignment).
pub fn sanitized_equals(story_href: &str, assigned_href: &str) -> bool {
    if assigned_href.is_empty() {
        return false;
    }
    strip_search_and_fragment(story_href) == strip_search_and_fragment(assigned_href)
}

fn strip_search_and_fragment(href: &str) -> String {
    match Url::parse(href) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => href.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_rewrite_builds_viewer_variant() {
        let out =
            resolve_cache_url("https://pub.example/stories/one", Some("cdn.ampproject.org"))
                .unwrap();
        assert_eq!(out, "https://cdn.ampproject.org/v/s/pub.example/stories/one");
    }

    #[test]
    fn cache_rewrite_preserves_query_and_http_scheme() {
        let out = resolve_cache_url("http://pub.example/s?one=1", Some("www.bing-amp.com")).unwrap();
        assert_eq!(out, "https://www.bing-amp.com/v/pub.example/s?one=1");
    }

    #[test]
    fn proxy_url_is_normalized_not_rewritten() {
        let out = resolve_cache_url(
            "https://pub-example.cdn.ampproject.org/c/s/pub.example/one",
            Some("cdn.ampproject.org"),
        )
        .unwrap();
        assert_eq!(
            out,
            "https://pub-example.cdn.ampproject.org/v/s/pub.example/one"
        );
    }

    #[test]
    fn unsupported_cache_is_reported() {
        let err = resolve_cache_url("https://pub.example/one", Some("cache.evil.example"));
        assert!(matches!(err, Err(PlayerError::UnsupportedCache(_))));
    }

    #[test]
    fn no_cache_configured_passes_through() {
        let out = resolve_cache_url("https://pub.example/one", None).unwrap();
        assert_eq!(out, "https://pub.example/one");
    }

    #[test]
    fn viewer_params_merge_over_existing_fragment() {
        let out = viewer_source_url(
            "https://pub.example/one#page=cover&visibilityState=visible",
            VisibilityState::Prerender,
            "https://embedder.example",
            true,
        );
        let parsed = Url::parse(&out).unwrap();
        let fragment = parsed.fragment().unwrap();
        assert!(fragment.contains("page=cover"));
        assert!(fragment.contains("visibilityState=prerender"));
        assert!(fragment.contains("storyPlayer=v0"));
        assert!(fragment.contains("cap=swipe"));
        assert!(fragment.contains("attribution=auto"));
    }

    #[test]
    fn sanitized_compare_ignores_search_and_fragment() {
        assert!(sanitized_equals(
            "https://pub.example/one",
            "https://pub.example/one?x=1#visibilityState=prerender"
        ));
        assert!(!sanitized_equals("https://pub.example/one", ""));
        assert!(!sanitized_equals(
            "https://pub.example/one",
            "https://pub.example/two"
        ));
    }
}
