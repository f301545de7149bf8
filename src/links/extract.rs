// src/links/extract.rs
// =============================================================================
// Extracts http/https URLs from free-form description text.
//
// Video descriptions are plain text, not markdown or HTML, so there is no
// parser to lean on - we do a lexical scan instead:
//   1. Find a scheme prefix (http:// or https://)
//   2. Take the maximal run up to whitespace or an obvious delimiter
//   3. Trim trailing sentence punctuation so "see https://a.com/x." does not
//      produce a URL ending in a period
//
// This is deliberately not a validating URL parser. A malformed fragment is
// still returned and simply fails the health probe later, which is a more
// useful report line than silently dropping it here.
//
// Rust concepts:
// - match_indices: Iterate over every occurrence of a substring
// - char_indices / byte slicing: Careful slicing on UTF-8 boundaries
// =============================================================================

// Characters that always end a URL token. Quotes and angle brackets never
// appear unescaped inside a real link in description text.
const TOKEN_DELIMITERS: &[char] = &['<', '>', '"', '\'', '`'];

// Characters trimmed from the end of a token: sentence punctuation plus
// closing brackets that usually belong to the surrounding prose.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}'];

/// Extracts all http/https URLs from `text`, in order of first appearance.
///
/// Duplicates are preserved - the probe cache deduplicates network work, and
/// the report wants one row per occurrence, not per distinct URL.
pub fn extract(text: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find("http") {
        let start = search_from + offset;
        let rest = &text[start..];

        if !rest.starts_with("http://") && !rest.starts_with("https://") {
            // Just the word "http" inside prose, e.g. "an http request".
            search_from = start + "http".len();
            continue;
        }

        let token = take_token(rest);
        let trimmed = trim_trailing(token);
        search_from = start + token.len();

        // A bare scheme with nothing after it is prose, not a link.
        if trimmed != "http://" && trimmed != "https://" && !trimmed.is_empty() {
            links.push(trimmed.to_string());
        }
    }

    links
}

// Takes the maximal run from the start of `rest` up to (not including) the
// first whitespace or hard delimiter character.
fn take_token(rest: &str) -> &str {
    let end = rest
        .char_indices()
        .find(|(_, c)| c.is_whitespace() || TOKEN_DELIMITERS.contains(c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    &rest[..end]
}

// Trims trailing punctuation from a token, keeping a closing paren or
// bracket when the token itself contains the matching opener. That keeps
// Wikipedia-style URLs like https://en.wikipedia.org/wiki/Rust_(film) intact
// while still stripping the paren in "(see https://a.com)".
fn trim_trailing(token: &str) -> &str {
    let mut t = token;
    while let Some(last) = t.chars().last() {
        if !TRAILING_PUNCTUATION.contains(&last) {
            break;
        }
        if is_balanced_closer(t, last) {
            break;
        }
        t = &t[..t.len() - last.len_utf8()];
    }
    t
}

// True when `closer` is a closing bracket and the token has at least as many
// openers as closers, i.e. the bracket is part of the URL itself.
fn is_balanced_closer(token: &str, closer: char) -> bool {
    let opener = match closer {
        ')' => '(',
        ']' => '[',
        '}' => '{',
        _ => return false,
    };
    let opens = token.chars().filter(|&c| c == opener).count();
    let closes = token.chars().filter(|&c| c == closer).count();
    opens >= closes
}
