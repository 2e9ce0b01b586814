use std::collections::HashSet;

/// Terms shorter than this are dropped.
pub const MIN_TERM_LEN: usize = 2;

/// Split raw text into lowercase lexical terms.
///
/// A term is a maximal run of ASCII alphanumerics and `_`. Compound
/// identifiers additionally emit their parts, so `parseHttpRequest` yields
/// `parsehttprequest`, `parse`, `http`, `request`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();

    for word in text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
        if word.len() < MIN_TERM_LEN {
            continue;
        }

        let whole = word.to_ascii_lowercase();
        let parts = split_identifier(word);
        let is_compound = parts.len() > 1;

        if whole.trim_matches('_').len() >= MIN_TERM_LEN {
            terms.push(whole.trim_matches('_').to_string());
        }

        if is_compound {
            terms.extend(
                parts
                    .into_iter()
                    .filter(|p| p.len() >= MIN_TERM_LEN)
                    .map(|p| p.to_ascii_lowercase()),
            );
        }
    }

    terms
}

/// Distinct terms of `text` in first-seen order.
pub fn unique_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Break an identifier on `_` and on camel-case boundaries. Digits stay
/// attached to their word (`v2`, `utf8`).
fn split_identifier(word: &str) -> Vec<&str> {
    let mut parts = Vec::new();

    for piece in word.split('_').filter(|p| !p.is_empty()) {
        let bytes = piece.as_bytes();
        let mut start = 0;

        for i in 1..bytes.len() {
            let prev = bytes[i - 1];
            let cur = bytes[i];
            let next = bytes.get(i + 1).copied();

            let lower_to_upper = prev.is_ascii_lowercase() && cur.is_ascii_uppercase();
            let acronym_end = prev.is_ascii_uppercase()
                && cur.is_ascii_uppercase()
                && next.is_some_and(|n| n.is_ascii_lowercase());

            if lower_to_upper || acronym_end {
                parts.push(&piece[start..i]);
                start = i;
            }
        }
        parts.push(&piece[start..]);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lowercases_and_splits_on_punctuation() {
        assert_eq!(
            tokenize("Foo(bar, BAZ) -> qux;"),
            vec!["foo", "bar", "baz", "qux"]
        );
    }

    #[test]
    fn test_drops_short_terms() {
        assert_eq!(tokenize("a = b + cd"), vec!["cd"]);
    }

    #[test]
    fn test_camel_case_emits_parts() {
        assert_eq!(
            tokenize("parseHttpRequest"),
            vec!["parsehttprequest", "parse", "http", "request"]
        );
    }

    #[test]
    fn test_acronym_boundary() {
        assert_eq!(tokenize("HTTPServer"), vec!["httpserver", "http", "server"]);
    }

    #[test]
    fn test_snake_case_emits_parts() {
        assert_eq!(
            tokenize("load_manifest_v2"),
            vec!["load_manifest_v2", "load", "manifest", "v2"]
        );
    }

    #[test]
    fn test_simple_word_has_no_parts() {
        assert_eq!(tokenize("FooBar"), vec!["foobar", "foo", "bar"]);
        assert_eq!(tokenize("foobar"), vec!["foobar"]);
    }

    #[test]
    fn test_unique_terms_preserves_order() {
        assert_eq!(
            unique_terms("index Index INDEX query"),
            vec!["index", "query"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t").is_empty());
    }
}
