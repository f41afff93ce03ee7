//! Return-location handling.
//!
//! Return URLs come from the request and are echoed into redirects, so only
//! site-local paths are honored; anything else falls back to the configured
//! default.

/// Returns `true` for site-local paths (`/path` or `~/path`).
///
/// Protocol-relative (`//host`) and backslash (`/\host`) forms are rejected
/// since browsers treat them as absolute, including behind the `~` prefix.
#[must_use]
pub fn is_local_url(url: &str) -> bool {
    if url.chars().any(char::is_control) {
        return false;
    }
    let is_separator = |byte: &u8| *byte == b'/' || *byte == b'\\';
    match url.as_bytes() {
        [b'/'] | [b'~', b'/'] => true,
        [b'/', next, ..] | [b'~', b'/', next, ..] => !is_separator(next),
        _ => false,
    }
}

/// Resolves where to redirect after a completed operation.
///
/// Uses `return_url` when it is non-empty and local, `fallback` otherwise.
#[must_use]
pub fn resolve_return_location(return_url: Option<&str>, fallback: &str) -> String {
    return_url
        .map(str::trim)
        .filter(|url| !url.is_empty() && is_local_url(url))
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("/", true ; "root")]
    #[test_case("/account/openid", true ; "absolute path")]
    #[test_case("~/admin", true ; "app relative")]
    #[test_case("//evil.example/", false ; "protocol relative")]
    #[test_case("/\\evil.example/", false ; "backslash")]
    #[test_case("~/", true ; "app root")]
    #[test_case("~//evil.example/", false ; "app relative protocol relative")]
    #[test_case("~/\\evil.example/", false ; "app relative backslash")]
    #[test_case("https://evil.example/", false ; "absolute url")]
    #[test_case("account", false ; "relative path")]
    #[test_case("/a\nb", false ; "control characters")]
    #[test_case("", false ; "empty")]
    fn test_is_local_url(url: &str, expected: bool) {
        assert_eq!(is_local_url(url), expected);
    }

    #[test]
    fn test_resolve_prefers_local_return_url() {
        assert_eq!(resolve_return_location(Some("/account"), "~/"), "/account");
    }

    #[test]
    fn test_resolve_falls_back() {
        assert_eq!(resolve_return_location(None, "~/"), "~/");
        assert_eq!(resolve_return_location(Some("  "), "~/"), "~/");
        assert_eq!(
            resolve_return_location(Some("https://evil.example/"), "~/"),
            "~/"
        );
        assert_eq!(
            resolve_return_location(Some("~//evil.example/phish"), "~/"),
            "~/"
        );
    }
}
