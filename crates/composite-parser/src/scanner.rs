//! Lexical scanner: bracket-aware token splitting.
//!
//! Grounded in `crates/compiler/src/parser.rs`'s cursor-based scanning
//! (`Parser { tokens, pos }`/`advance`/`check`) but working directly over
//! `&str` byte offsets instead of a pre-tokenized `Vec<Token>`, since this
//! grammar's only lexical subtlety — nested `{}`/`[]` plus a quoted-string
//! state — is naturally expressed as one pass with two depth counters
//! rather than a separate tokenizer stage.

/// Find `target` at nesting depth zero starting from `start`, tracking
/// `{}`/`[]` nesting independently and a single-quoted string state where
/// a doubled quote `''` is an escaped quote, not a string close.
///
/// Returns `None` if `target` never occurs at depth zero, or if a closing
/// bracket/brace would drive its counter negative (both count as "not
/// found" — the latter signals an unmatched closer, which the caller
/// surfaces as `InvalidLiteral`, not as a silent skip).
pub fn find_same_level(s: &str, start: usize, target: char) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut brace_depth = 0i32;
    let mut bracket_depth = 0i32;
    let mut in_string = false;
    let mut i = start;

    while i < bytes.len() {
        let c = s[i..].chars().next().unwrap();
        let clen = c.len_utf8();

        if in_string {
            if c == '\'' {
                // Doubled quote: escaped quote, stay in string, skip both.
                if s[i + clen..].starts_with('\'') {
                    i += clen + 1;
                    continue;
                }
                in_string = false;
            }
            i += clen;
            continue;
        }

        match c {
            '\'' => in_string = true,
            '{' => brace_depth += 1,
            '}' => {
                brace_depth -= 1;
                if brace_depth < 0 {
                    return None;
                }
            }
            '[' => bracket_depth += 1,
            ']' => {
                bracket_depth -= 1;
                if bracket_depth < 0 {
                    return None;
                }
            }
            _ => {}
        }

        if c == target && brace_depth == 0 && bracket_depth == 0 {
            return Some(i);
        }

        i += clen;
    }

    None
}

/// Split `s` on `,` at nesting depth zero, the array/record element
/// separator. Empty input yields an empty `Vec` (no elements), matching
/// an optional, possibly-empty element list.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let trimmed = s.trim_matches(is_grammar_whitespace);
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut start = 0;
    loop {
        match find_same_level(trimmed, start, sep) {
            Some(pos) => {
                parts.push(trimmed[start..pos].trim_matches(is_grammar_whitespace));
                start = pos + sep.len_utf8();
            }
            None => {
                parts.push(trimmed[start..].trim_matches(is_grammar_whitespace));
                break;
            }
        }
    }
    parts
}

/// The grammar's whitespace class: space, tab, vertical tab, newline.
/// Carriage return is deliberately excluded (see DESIGN.md's whitespace
/// note).
pub fn is_grammar_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0B' | '\n')
}
