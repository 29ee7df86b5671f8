//! Placeholder substitution over raw file content.
//!
//! The engine only understands the `{{`, `}}` and `|` marker bytes, so any
//! encoding that keeps those ASCII bytes intact passes through untouched.

use log::trace;

use crate::constants::{CLOSE_MARKER, OPEN_MARKER};
use crate::error::{Error, Result};
use crate::variable::{Token, ValidatedOptions};

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| index + from)
}

/// Bytes inserted by one replacement, with the keys whose expansion produced them.
#[derive(Debug)]
struct Span {
    start: usize,
    end: usize,
    lineage: Vec<String>,
}

/// Keys already being expanded around `start..end`.
fn lineage_of(spans: &[Span], start: usize, end: usize) -> Vec<String> {
    let mut lineage: Vec<String> = Vec::new();
    for span in spans.iter().filter(|span| span.start < end && start < span.end) {
        for key in &span.lineage {
            if !lineage.contains(key) {
                lineage.push(key.clone());
            }
        }
    }
    lineage
}

/// Moves spans to account for `start..end` being replaced by `len` bytes.
/// Spans touching the replaced range grow to cover the inserted bytes.
fn shift_spans(spans: &mut Vec<Span>, start: usize, end: usize, len: usize) {
    let removed = end - start;
    for span in spans.iter_mut() {
        if span.end <= start {
            continue;
        }
        if span.start >= end {
            span.start = span.start - removed + len;
        } else {
            span.start = span.start.min(start);
        }
        span.end = span.end.max(end) - removed + len;
    }
    spans.retain(|span| span.start < span.end);
}

/// Replaces every placeholder in `buffer` until none remain.
///
/// After each replacement the whole buffer is scanned again from the start,
/// so text exposed by a replacement is itself resolved. Each inserted value
/// remembers which keys it came from; a key showing up again inside its own
/// expansion can never finish and fails the resolve.
///
/// # Errors
/// * `Error::UnterminatedPlaceholderError` if `{{` has no closing `}}`
/// * `Error::UnresolvedPlaceholderError` if a key has no validated value
/// * `Error::InvalidPlaceholderError` if a placeholder is not valid UTF-8
/// * `Error::DivergentPlaceholderError` if a value reintroduces its own key
pub fn resolve(buffer: &[u8], options: &ValidatedOptions) -> Result<Vec<u8>> {
    let open = OPEN_MARKER.as_bytes();
    let close = CLOSE_MARKER.as_bytes();
    let mut document = buffer.to_vec();
    let mut spans: Vec<Span> = Vec::new();

    while let Some(start) = find(&document, open, 0) {
        let end = find(&document, close, start + open.len())
            .ok_or(Error::UnterminatedPlaceholderError { position: start })?
            + close.len();

        let raw = std::str::from_utf8(&document[start..end]).map_err(|_| {
            Error::InvalidPlaceholderError {
                token: String::from_utf8_lossy(&document[start..end]).into_owned(),
            }
        })?;
        let token = Token::parse(raw)?;
        let value = options
            .get(&token.key)
            .ok_or_else(|| Error::UnresolvedPlaceholderError { key: token.key.clone() })?;

        let mut lineage = lineage_of(&spans, start, end);
        if lineage.contains(&token.key) {
            return Err(Error::DivergentPlaceholderError { key: token.key });
        }
        lineage.push(token.key.clone());

        let replacement = token.apply(value).into_bytes();
        trace!("Replacing '{}' with '{}'.", raw, String::from_utf8_lossy(&replacement));

        let len = replacement.len();
        document.splice(start..end, replacement);
        shift_spans(&mut spans, start, end, len);
        if len > 0 {
            spans.push(Span { start, end: start + len, lineage });
        }
    }
    Ok(document)
}

/// String form of [`resolve`], used for names and paths.
pub fn resolve_str(text: &str, options: &ValidatedOptions) -> Result<String> {
    let resolved = resolve(text.as_bytes(), options)?;
    // Only valid UTF-8 was spliced into valid UTF-8.
    Ok(String::from_utf8_lossy(&resolved).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> ValidatedOptions {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_no_placeholders_is_unchanged() {
        let input = b"plain text with } and { braces";
        assert_eq!(resolve(input, &options(&[])).unwrap(), input.to_vec());
    }

    #[test]
    fn test_replaces_every_placeholder() {
        let opts = options(&[("name", "Rex"), ("kind", "dog")]);
        let out = resolve_str("{{name}} is a {{ kind | upper }}, {{name|lower}}!", &opts).unwrap();
        assert_eq!(out, "Rex is a DOG, rex!");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = resolve(b"abc {{name", &options(&[("name", "x")])).unwrap_err();
        assert!(matches!(err, Error::UnterminatedPlaceholderError { position: 4 }));
    }

    #[test]
    fn test_closing_marker_before_opening_is_ignored() {
        let err = resolve(b"}} {{name", &options(&[("name", "x")])).unwrap_err();
        assert!(matches!(err, Error::UnterminatedPlaceholderError { position: 3 }));
    }

    #[test]
    fn test_unresolved_placeholder_names_key() {
        let err = resolve(b"Hi {{ who }}", &options(&[("name", "x")])).unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholderError { ref key } if key == "who"));
    }

    #[test]
    fn test_rescans_text_exposed_by_replacement() {
        let opts = options(&[("outer", "{{inner}}"), ("inner", "done")]);
        assert_eq!(resolve_str("[{{outer}}]", &opts).unwrap(), "[done]");
    }

    #[test]
    fn test_self_reference_fails_instead_of_looping() {
        let opts = options(&[("name", "{{name}}")]);
        let err = resolve(b"{{name}}", &opts).unwrap_err();
        assert!(matches!(err, Error::DivergentPlaceholderError { .. }));
    }

    #[test]
    fn test_indirect_self_reference_fails() {
        let opts = options(&[("a", "x{{b}}"), ("b", "{{a | upper}}")]);
        let err = resolve_str("{{a}}", &opts).unwrap_err();
        assert!(matches!(err, Error::DivergentPlaceholderError { ref key } if key == "a"));
    }

    #[test]
    fn test_repeated_key_in_sibling_values_is_not_self_reference() {
        let opts = options(&[("pair", "{{name}}-{{name}}"), ("name", "rex")]);
        assert_eq!(resolve_str("{{pair}}/{{pair}}", &opts).unwrap(), "rex-rex/rex-rex");
    }

    #[test]
    fn test_deep_doubling_chain_resolves() {
        let keys = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let mut pairs: Vec<(String, String)> = keys
            .windows(2)
            .map(|pair| (pair[0].to_string(), format!("{{{{{0}}}}}{{{{{0}}}}}", pair[1])))
            .collect();
        pairs.push(("i".to_string(), "x".to_string()));
        let opts: ValidatedOptions = pairs.into_iter().collect();

        let out = resolve_str("{{a}}", &opts).unwrap();
        assert_eq!(out, "x".repeat(256));
    }

    #[test]
    fn test_non_utf8_content_outside_placeholders() {
        let mut input = vec![0xff, 0xfe];
        input.extend_from_slice(b"{{name}}");
        input.push(0x00);
        let out = resolve(&input, &options(&[("name", "ok")])).unwrap();
        assert_eq!(out, vec![0xff, 0xfe, b'o', b'k', 0x00]);
    }

    #[test]
    fn test_result_has_no_markers() {
        let opts = options(&[("a", "1"), ("b", "2")]);
        let out = resolve(b"{{a}}{{b}}{{a|upper}}", &opts).unwrap();
        assert!(find(&out, b"{{", 0).is_none());
        assert!(find(&out, b"}}", 0).is_none());
        assert_eq!(out, b"121".to_vec());
    }
}
