//! Serialization: the inverse of the parser.
//!
//! Grounded in `crates/runtime/src/son.rs`'s `format_value` — a recursive,
//! depth-threaded `match` building into one `String` buffer — but with
//! this engine's own escaping rule (doubled single quotes, not
//! backslash escapes) and its two modes (pretty vs. wire) instead of
//! son.rs's pretty/compact axis.

use composite_core::value::CompositeValue;
use composite_core::{AtomicKind, CompositeError, EngineConfig, Result, TypeRef, TypeRegistry};

/// Render `value` (of type `ty`) to text.
///
/// `wire = false` ("pretty"): atomics render plainly, strings unquoted
/// (except the null string, which always renders as the bare token
/// `nil`, in both modes, so it remains distinguishable from the
/// four-letter string `"nil"`).
///
/// `wire = true`: every atomic is single-quoted, with embedded single
/// quotes doubled in string contents.
pub fn serialize(
    value: &CompositeValue,
    ty: &TypeRef,
    wire: bool,
    config: &EngineConfig,
    registry: &TypeRegistry,
) -> Result<String> {
    let mut buf = String::new();
    write_value(value, ty, wire, config, registry, &mut buf)?;
    Ok(buf)
}

fn mismatch(value: &CompositeValue, ty: &TypeRef) -> CompositeError {
    CompositeError::Internal(format!("cannot serialize {value:?} as `{ty}`"))
}

fn write_value(
    value: &CompositeValue,
    ty: &TypeRef,
    wire: bool,
    config: &EngineConfig,
    registry: &TypeRegistry,
    buf: &mut String,
) -> Result<()> {
    match (value, ty) {
        (CompositeValue::Bool(b), TypeRef::Atomic(AtomicKind::Bool)) => {
            write_atomic_token(buf, wire, if *b { "true" } else { "false" });
            Ok(())
        }
        (CompositeValue::Int(n), TypeRef::Atomic(AtomicKind::Int)) => {
            write_atomic_token(buf, wire, &n.to_string());
            Ok(())
        }
        (CompositeValue::Real(r), TypeRef::Atomic(AtomicKind::Real)) => {
            write_atomic_token(buf, wire, &format_real(*r));
            Ok(())
        }
        (CompositeValue::Str(s), TypeRef::Atomic(AtomicKind::String)) => {
            match s.as_deref() {
                None => buf.push_str("nil"),
                Some(text) if wire => {
                    buf.push('\'');
                    for c in text.chars() {
                        if c == '\'' {
                            buf.push_str("''");
                        } else {
                            buf.push(c);
                        }
                    }
                    buf.push('\'');
                }
                Some(text) => buf.push_str(text),
            }
            Ok(())
        }
        (CompositeValue::FixedArray(elems), TypeRef::FixedArray(base, n)) => {
            if elems.len() != *n {
                return Err(mismatch(value, ty));
            }
            write_array_body(elems, base, wire, config, registry, buf)
        }
        (CompositeValue::VarArray(elems), TypeRef::VarArray(base)) => {
            if elems.len() >= config.expand_array_view_threshold() {
                buf.push_str("{size: ");
                buf.push_str(&elems.len().to_string());
                buf.push_str(", data: ");
                write_array_body(elems, base, wire, config, registry, buf)?;
                buf.push('}');
            } else {
                write_array_body(elems, base, wire, config, registry, buf)?;
            }
            Ok(())
        }
        (CompositeValue::Record(fields), TypeRef::Record(name)) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            if fields.len() != def.fields.len() {
                return Err(mismatch(value, ty));
            }
            buf.push('{');
            for (i, (field_value, field_def)) in fields.iter().zip(&def.fields).enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                buf.push_str(&field_def.name);
                buf.push_str(": ");
                write_value(field_value, &field_def.ty, wire, config, registry, buf)?;
            }
            buf.push('}');
            Ok(())
        }
        _ => Err(mismatch(value, ty)),
    }
}

fn write_array_body(
    elems: &[CompositeValue],
    base: &TypeRef,
    wire: bool,
    config: &EngineConfig,
    registry: &TypeRegistry,
    buf: &mut String,
) -> Result<()> {
    buf.push('[');
    for (i, e) in elems.iter().enumerate() {
        if i > 0 {
            buf.push_str(", ");
        }
        write_value(e, base, wire, config, registry, buf)?;
    }
    buf.push(']');
    Ok(())
}

fn write_atomic_token(buf: &mut String, wire: bool, token: &str) {
    if wire {
        buf.push('\'');
        buf.push_str(token);
        buf.push('\'');
    } else {
        buf.push_str(token);
    }
}

/// Always include a decimal point, so a whole-valued real round-trips as
/// `real` rather than being re-read as `int` (mirrors son.rs's float
/// formatting for the same reason).
fn format_real(r: f64) -> String {
    let s = r.to_string();
    if r.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

/// Rough size hint for a caller sizing its own output buffer. Cheap and
/// deliberately conservative: it renders the wire form once rather than
/// trying to predict lengths from the type shape alone, since the only
/// input that matters (string lengths) isn't available without walking
/// the value anyway.
pub fn length_of_serialized(
    value: &CompositeValue,
    ty: &TypeRef,
    registry: &TypeRegistry,
) -> Result<usize> {
    let config = EngineConfig::new();
    serialize(value, ty, true, &config, registry).map(|s| s.len())
}
