//! Baseline atomic-literal parsing (bool/int/real/string).
//!
//! Intentionally minimal — see DESIGN.md's "Baseline atomic-literal
//! parsing" note: the richer parsers (unit-suffixed integers, locale-aware
//! reals) belong to a separate, swappable collaborator, so only the bare
//! grammar forms are implemented here.

use composite_core::value::{CompositeValue, OwnedString};
use composite_core::{AtomicKind, CompositeError, Result};

/// Parse a single unquoted or quoted atomic token against the expected
/// `AtomicKind`. `token` has already been trimmed of surrounding
/// whitespace by the caller.
pub fn parse_atomic(token: &str, kind: AtomicKind) -> Result<CompositeValue> {
    match kind {
        AtomicKind::Bool => parse_bool(token),
        AtomicKind::Int => parse_int(token),
        AtomicKind::Real => parse_real(token),
        AtomicKind::String => parse_string(token),
    }
}

fn parse_bool(token: &str) -> Result<CompositeValue> {
    match token {
        "true" => Ok(CompositeValue::Bool(true)),
        "false" => Ok(CompositeValue::Bool(false)),
        other => Err(CompositeError::AtomicParseFailure {
            msg: format!("`{other}` is not a valid bool literal (expected `true` or `false`)"),
            context: Vec::new(),
        }),
    }
}

fn parse_int(token: &str) -> Result<CompositeValue> {
    token
        .parse::<i64>()
        .map(CompositeValue::Int)
        .map_err(|e| CompositeError::AtomicParseFailure {
            msg: format!("`{token}` is not a valid int: {e}"),
            context: Vec::new(),
        })
}

fn parse_real(token: &str) -> Result<CompositeValue> {
    token
        .parse::<f64>()
        .map(CompositeValue::Real)
        .map_err(|e| CompositeError::AtomicParseFailure {
            msg: format!("`{token}` is not a valid real: {e}"),
            context: Vec::new(),
        })
}

/// `nil`, or a single-quoted string with `''` as an escaped quote.
/// Unquoted, non-`nil` tokens are accepted verbatim — the pretty
/// serializer round-trips strings without quotes, so the parser must
/// accept that exact shape back.
fn parse_string(token: &str) -> Result<CompositeValue> {
    if token == "nil" {
        return Ok(CompositeValue::null_string());
    }

    if let Some(inner) = token.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    return Err(CompositeError::AtomicParseFailure {
                        msg: format!("unescaped `'` inside quoted string literal `{token}`"),
                        context: Vec::new(),
                    });
                }
            } else {
                out.push(c);
            }
        }
        return Ok(CompositeValue::Str(OwnedString::new(Some(out))));
    }

    Ok(CompositeValue::Str(OwnedString::new(Some(token.to_string()))))
}
