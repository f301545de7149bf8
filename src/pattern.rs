// src/pattern.rs
// =============================================================================
// Literal find/replace over description text.
//
// Deliberately NOT a regex engine: the operator pastes exact text (often a
// multi-line footer with URLs in it) and expects byte-for-byte matching.
// Case folding or regex metacharacters would silently change which videos
// get touched, which is the last thing you want from a bulk editor.
//
// Rust concepts:
// - &str vs String: Borrow the inputs, allocate only for the replaced output
// - Tuples: apply() returns both the new text and a "did anything change" flag
// =============================================================================

/// Returns true iff `pattern` is non-empty and occurs literally in `text`.
///
/// The empty pattern never matches. `"".contains("")` is true in Rust, and
/// an empty find-pattern would otherwise select every video on the channel.
pub fn matches(text: &str, pattern: &str) -> bool {
    !pattern.is_empty() && text.contains(pattern)
}

/// Replaces all non-overlapping occurrences of `pattern` with `replacement`.
///
/// Returns the new text plus a flag that is true iff the result differs from
/// the input. The orchestrator uses the flag to skip the remote write (and
/// report "already up to date") when there is nothing to do.
pub fn apply(text: &str, pattern: &str, replacement: &str) -> (String, bool) {
    if pattern.is_empty() {
        // Empty pattern is a no-op, mirroring matches() above.
        return (text.to_string(), false);
    }

    let replaced = text.replace(pattern, replacement);
    let changed = replaced != text;
    (replaced, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_literal_substring() {
        assert!(matches("visit http://old.example.com today", "old.example.com"));
        assert!(!matches("nothing to see here", "old.example.com"));
    }

    #[test]
    fn test_matches_is_case_sensitive() {
        assert!(!matches("Old Site", "old site"));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        assert!(!matches("any text", ""));
        assert!(!matches("", ""));
    }

    #[test]
    fn test_apply_replaces_all_occurrences() {
        let (out, changed) = apply("a123b123c", "123", "789");
        assert_eq!(out, "a789b789c");
        assert!(changed);
    }

    #[test]
    fn test_apply_empty_pattern_is_noop() {
        let (out, changed) = apply("abc", "", "xyz");
        assert_eq!(out, "abc");
        assert!(!changed);
    }

    #[test]
    fn test_apply_unchanged_when_pattern_absent() {
        let (out, changed) = apply("abc", "zzz", "xyz");
        assert_eq!(out, "abc");
        assert!(!changed);
    }

    // matches() and apply() must agree: a text matches iff applying to it
    // would change it (given replacement != pattern).
    #[test]
    fn test_matches_agrees_with_apply() {
        let cases = [("abc123", "123"), ("abc", "123"), ("", "x"), ("xx", "")];
        for (text, pattern) in cases {
            let (_, changed) = apply(text, pattern, "REPL");
            assert_eq!(matches(text, pattern), changed, "disagreement on {:?}", (text, pattern));
        }
    }

    #[test]
    fn test_apply_is_idempotent_once_pattern_is_gone() {
        let (once, changed) = apply("abc123", "123", "789");
        assert!(changed);
        let (twice, changed_again) = apply(&once, "123", "789");
        assert_eq!(once, twice);
        assert!(!changed_again);
    }
}
