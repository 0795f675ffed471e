// src/extract/urls.rs
// =============================================================================
// URL helpers used for every comparison the checks make.
//
// Comparisons are done on a normalized form, `scheme://host[:port]/path`,
// so query strings and fragments never cause false mismatches.
// =============================================================================

use url::Url;

// Reduces an absolute URL to `scheme://host/path`.
//
// Examples:
//   "https://example.com/a?x=1#top" -> Some("https://example.com/a")
//   "https://example.com"           -> Some("https://example.com/")
//   "/relative"                     -> None
pub fn normalize_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    Some(normalize_parsed(&parsed))
}

fn normalize_parsed(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

// Resolves a possibly-relative URL against `base`, then normalizes it.
// Returns None instead of failing when either side does not parse.
pub fn to_absolute_normalized(maybe_relative: &str, base: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let joined = base.join(maybe_relative.trim()).ok()?;
    Some(normalize_parsed(&joined))
}

// True when the URL's origin is exactly the configured site origin.
pub fn is_canonical_url(url: &str, site: &str) -> bool {
    match (Url::parse(url.trim()), Url::parse(site)) {
        (Ok(url), Ok(site)) => url.origin() == site.origin(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_query_and_fragment() {
        assert_eq!(
            normalize_url("https://example.com/a/b?page=2#top").as_deref(),
            Some("https://example.com/a/b")
        );
        assert_eq!(
            normalize_url("https://EXAMPLE.com").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(normalize_url("/just/a/path"), None);
    }

    #[test]
    fn test_to_absolute_resolves_relative() {
        assert_eq!(
            to_absolute_normalized("/docs?x=1", "https://example.com/page").as_deref(),
            Some("https://example.com/docs")
        );
        assert_eq!(
            to_absolute_normalized("other", "https://example.com/dir/page").as_deref(),
            Some("https://example.com/dir/other")
        );
        assert_eq!(to_absolute_normalized("/docs", "not a base"), None);
    }

    #[test]
    fn test_is_canonical_url_requires_exact_origin() {
        let site = "https://www.example.com";
        assert!(is_canonical_url("https://www.example.com/a", site));
        assert!(!is_canonical_url("http://www.example.com/a", site));
        assert!(!is_canonical_url("https://example.com/a", site));
        assert!(!is_canonical_url("https://www.example.com:8443/a", site));
        assert!(!is_canonical_url("garbage", site));
    }
}
