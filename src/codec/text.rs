//! Line folding/unfolding and text escaping.
//!
//! Folding width is measured in UTF-8 octets, never in `char`s: iteration
//! walks the string one Unicode scalar value at a time (Rust's `char` is
//! already a full scalar value, so no separate surrogate-pair handling is
//! needed the way a UTF-16 host would require) and a scalar whose encoded
//! length would overflow the remaining budget starts a new continuation.

const FIRST_LINE_BUDGET: usize = 75;
const CONTINUATION_BUDGET: usize = 74;

/// Unfold a raw byte stream into logical lines. A line break (`CRLF` or
/// bare `LF`) immediately followed by a single space or tab is elided along
/// with that leading whitespace byte. Bare `CR` not followed by `LF` is
/// tolerated and left in place.
pub fn unfold_lines(input: &str) -> Vec<String> {
    let bytes = input.as_bytes();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                if matches!(bytes.get(i + 2), Some(b' ') | Some(b'\t')) {
                    i += 3;
                } else {
                    lines.push(std::mem::take(&mut current));
                    i += 2;
                }
            }
            b'\n' => {
                if matches!(bytes.get(i + 1), Some(b' ') | Some(b'\t')) {
                    i += 2;
                } else {
                    lines.push(std::mem::take(&mut current));
                    i += 1;
                }
            }
            b'\r' => {
                current.push('\r');
                i += 1;
            }
            _ => {
                let ch_len = utf8_char_len(bytes[i]);
                let end = (i + ch_len).min(bytes.len());
                current.push_str(std::str::from_utf8(&bytes[i..end]).unwrap_or(""));
                i = end;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn utf8_char_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

/// Fold one logical line into `CRLF`-joined physical lines, each no more
/// than 75 octets (74 for continuations, which carry one leading space).
pub fn fold_line(logical: &str) -> String {
    let mut out = String::new();
    let mut budget = FIRST_LINE_BUDGET;
    let mut used = 0usize;
    for ch in logical.chars() {
        let ch_len = ch.len_utf8();
        if used + ch_len > budget {
            out.push_str("\r\n ");
            budget = CONTINUATION_BUDGET;
            used = 0;
        }
        out.push(ch);
        used += ch_len;
    }
    out
}

/// Escape a property *value* (not a parameter) per RFC 5545 §3.3.11:
/// backslash, newline, comma, and semicolon are escaped.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_text`].
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('n') | Some('N') => {
                    out.push('\n');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                Some(',') => {
                    out.push(',');
                    chars.next();
                }
                Some(';') => {
                    out.push(';');
                    chars.next();
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Quote a parameter value if it contains `:`, `;`, or `,`.
/// A literal `"` is rejected on parse (caller's responsibility) and
/// stripped here on generate.
pub fn quote_param_value(value: &str) -> String {
    let stripped: String = value.chars().filter(|&c| c != '"').collect();
    if stripped.contains(':') || stripped.contains(';') || stripped.contains(',') {
        format!("\"{stripped}\"")
    } else {
        stripped
    }
}

/// Quote a parameter value unconditionally, as RFC 5545 requires for
/// `ALTREP` and `DELEGATED-TO`-style URI params regardless of content.
/// A literal `"` is stripped, same as [`quote_param_value`].
pub fn quote_param_value_always(value: &str) -> String {
    let stripped: String = value.chars().filter(|&c| c != '"').collect();
    format!("\"{stripped}\"")
}

/// The URL scheme allow-list check: `https`, `http`, `webcal` by default.
pub fn is_allowed_scheme(url: &str, allowed: &[String]) -> bool {
    match url.split_once(':') {
        Some((scheme, _)) => allowed.iter().any(|s| s.eq_ignore_ascii_case(scheme)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfolds_space_continuation() {
        let lines = unfold_lines("UID:horrible-\r\n example");
        assert_eq!(lines, vec!["UID:horrible-example".to_string()]);
    }

    #[test]
    fn unfolds_bare_lf_continuation() {
        let lines = unfold_lines("UID:X\n Y");
        assert_eq!(lines, vec!["UID:XY".to_string()]);
    }

    #[test]
    fn tolerates_bare_cr() {
        let lines = unfold_lines("SUMMARY:Hello \rthere");
        assert_eq!(lines, vec!["SUMMARY:Hello \rthere".to_string()]);
    }

    #[test]
    fn fold_respects_octet_budget() {
        let long = "x".repeat(200);
        let folded = fold_line(&long);
        for part in folded.split("\r\n") {
            assert!(part.len() <= FIRST_LINE_BUDGET);
        }
    }

    #[test]
    fn fold_never_splits_a_code_point() {
        let emoji_line = "🎉".repeat(40);
        let folded = fold_line(&emoji_line);
        for part in folded.split("\r\n") {
            let body = part.strip_prefix(' ').unwrap_or(part);
            assert!(std::str::from_utf8(body.as_bytes()).is_ok());
            assert!(body.len() <= FIRST_LINE_BUDGET);
        }
    }

    #[test]
    fn fold_unfold_roundtrip() {
        let original = "a".repeat(160);
        let folded = fold_line(&original);
        let unfolded = unfold_lines(&folded);
        assert_eq!(unfolded.join(""), original);
    }

    #[test]
    fn escape_unescape_inverse() {
        let original = "Meeting, agenda; review\nnext line";
        let escaped = escape_text(original);
        assert_eq!(unescape_text(&escaped), original);
    }

    #[test]
    fn quotes_params_containing_reserved_chars() {
        assert_eq!(quote_param_value("plain"), "plain");
        assert_eq!(quote_param_value("a:b"), "\"a:b\"");
        assert_eq!(quote_param_value("a\"b:c"), "\"ab:c\"");
    }

    #[test]
    fn scheme_allow_list() {
        let allowed = vec!["https".to_string(), "http".to_string(), "webcal".to_string()];
        assert!(is_allowed_scheme("https://example.com", &allowed));
        assert!(!is_allowed_scheme("ftp://example.com", &allowed));
    }
}
