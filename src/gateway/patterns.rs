//! Single-trailing-wildcard pattern matching.
//!
//! Used by service allow-lists and branch filters. A pattern ending in `*`
//! matches any value starting with its prefix; anything else matches by
//! exact equality. No regex semantics, no escaping.

/// Whether `value` satisfies `pattern`.
pub fn matches(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

#[cfg(test)]
mod tests {
    use super::matches;

    #[test]
    fn exact_patterns_require_equality() {
        assert!(matches("worker", "worker"));
        assert!(!matches("worker", "worker-2"));
        assert!(!matches("worker", "work"));
        assert!(!matches("worker-2", "worker"));
    }

    #[test]
    fn trailing_wildcard_is_prefix_match() {
        assert!(matches("api-*", "api-gateway"));
        assert!(matches("api-*", "api-"));
        assert!(matches("release-*", "release-2.0"));
        assert!(!matches("api-*", "api"));
        assert!(!matches("release-*", "feature-x"));
    }

    #[test]
    fn bare_wildcard_matches_everything() {
        assert!(matches("*", ""));
        assert!(matches("*", "anything"));
    }

    #[test]
    fn wildcard_only_counts_at_the_end() {
        // An interior asterisk is a literal character
        assert!(matches("a*b", "a*b"));
        assert!(!matches("a*b", "axb"));
    }
}
