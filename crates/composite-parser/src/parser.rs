//! Recursive-descent parser for composite literals.
//!
//! `previous` is borrowed, not consumed: patching deep-copies whatever it
//! needs from the previous value (via `composite_runtime::duplicate`) into
//! the freshly built result, so the caller keeps the previous value alive
//! and can `free` it separately. This is the natural Rust rendering of
//! "cloned from a previous value when patching" without aliasing two
//! owned values.

use tracing::{trace, warn};

use composite_core::value::{default_value, CompositeValue, OwnedBuffer};
use composite_core::{AtomicKind, CompositeError, Result, TypeRef, TypeRegistry};
use composite_runtime::duplicate;

use crate::atomic::parse_atomic;
use crate::path::convert_path_to_literal;
use crate::scanner::{find_same_level, is_grammar_whitespace, split_top_level};

/// Parse `text` as a value of type `ty`, patching against `previous` when
/// given. A trailing `;` makes `text` a patch-list: a `;`-separated
/// sequence of composite literals applied left to right, each against
/// the accumulator from the step before it.
///
/// At the top level (and at each patch-list step), a bare `path=value`
/// assignment is accepted as shorthand for
/// `convert_path_to_literal(path, value)` — this is what lets
/// `"cluster.nodes[0].port=6543;"` work directly as a patch-list entry
/// without requiring the caller to run the path engine itself first.
pub fn parse(
    text: &str,
    ty: &TypeRef,
    previous: Option<&CompositeValue>,
    registry: &TypeRegistry,
) -> Result<CompositeValue> {
    let trimmed = text.trim_matches(is_grammar_whitespace);

    if trimmed.ends_with(';') {
        return parse_patch_list(&trimmed[..trimmed.len() - 1], ty, previous, registry);
    }

    parse_top_level_step(trimmed, ty, previous, registry)
}

fn parse_patch_list(
    body: &str,
    ty: &TypeRef,
    previous: Option<&CompositeValue>,
    registry: &TypeRegistry,
) -> Result<CompositeValue> {
    let mut accumulated = match previous {
        Some(p) => duplicate(p, ty, registry)?,
        None => default_value(ty, registry)?,
    };

    let steps = split_top_level(body, ';');
    for (step, step_text) in steps.into_iter().enumerate() {
        trace!(target: "composite_parser::parser", step, "applying patch-list step");
        match parse_top_level_step(step_text, ty, Some(&accumulated), registry) {
            Ok(next) => accumulated = next,
            Err(source) => {
                return Err(CompositeError::PatchListFailure {
                    step,
                    accumulated: Box::new(accumulated),
                    source: Box::new(source),
                })
            }
        }
    }

    Ok(accumulated)
}

/// A single patch-list step, or the whole input for a non-patch-list
/// call: either a structural composite literal, or `path=value` shorthand.
fn parse_top_level_step(
    text: &str,
    ty: &TypeRef,
    previous: Option<&CompositeValue>,
    registry: &TypeRegistry,
) -> Result<CompositeValue> {
    if let Some((path, value_text)) = split_path_assignment(text) {
        let literal = convert_path_to_literal(path, value_text);
        return parse_value(&literal, ty, previous, registry);
    }
    parse_value(text, ty, previous, registry)
}

/// Detect `path=value` shorthand: a top-level `=` whose left-hand side
/// starts with an identifier character rather than `{`/`[`. Restricted to
/// the top level (never applied while parsing a nested field/element
/// value) so an unquoted pretty-mode string that happens to contain `=`
/// is unaffected as long as it isn't itself the entire top-level input.
fn split_path_assignment(text: &str) -> Option<(&str, &str)> {
    let pos = find_same_level(text, 0, '=')?;
    let path = text[..pos].trim_matches(is_grammar_whitespace);
    let value = text[pos + '='.len_utf8()..].trim_matches(is_grammar_whitespace);
    let starts_like_a_path = path
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if path.is_empty() || !starts_like_a_path {
        return None;
    }
    Some((path, value))
}

fn parse_value(
    text: &str,
    ty: &TypeRef,
    previous: Option<&CompositeValue>,
    registry: &TypeRegistry,
) -> Result<CompositeValue> {
    let text = text.trim_matches(is_grammar_whitespace);
    match ty {
        TypeRef::Atomic(kind) => parse_atomic(text, *kind),
        TypeRef::FixedArray(base, n) => {
            let inner = strip_delims(text, '[', ']')?;
            let prev_elems = match previous {
                Some(CompositeValue::FixedArray(elems)) => Some(elems.as_slice()),
                _ => None,
            };
            let (elems, _) = parse_array_elements(inner, base, Some(*n), prev_elems, registry)?;
            Ok(CompositeValue::FixedArray(elems))
        }
        TypeRef::VarArray(base) => {
            let prev_elems = match previous {
                Some(CompositeValue::VarArray(elems)) => Some(&elems[..]),
                _ => None,
            };
            if text.starts_with('{') {
                let inner = strip_delims(text, '{', '}')?;
                let elems = parse_var_array_extended(inner, base, prev_elems, registry)?;
                Ok(CompositeValue::VarArray(OwnedBuffer::new(elems)))
            } else {
                let inner = strip_delims(text, '[', ']')?;
                let (elems, _) = parse_array_elements(inner, base, None, prev_elems, registry)?;
                Ok(CompositeValue::VarArray(OwnedBuffer::new(elems)))
            }
        }
        TypeRef::Record(name) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            let inner = strip_delims(text, '{', '}')?;
            let prev_fields = match previous {
                Some(CompositeValue::Record(fields)) => Some(fields.as_slice()),
                _ => None,
            };

            let field_types: Vec<TypeRef> = def.fields.iter().map(|f| f.ty.clone()).collect();
            let mut working = build_resized_record_base(prev_fields, &field_types, registry)?;

            for part in split_top_level(inner, ',') {
                let colon = find_same_level(part, 0, ':').ok_or_else(|| {
                    CompositeError::invalid_literal(format!("field `{part}` is missing `:`"))
                })?;
                let field_name = part[..colon].trim_matches(is_grammar_whitespace);
                let value_text = part[colon + ':'.len_utf8()..].trim_matches(is_grammar_whitespace);
                if field_name.is_empty() {
                    return Err(CompositeError::invalid_literal("empty field name"));
                }
                let idx = def.field_index(field_name).ok_or_else(|| {
                    CompositeError::invalid_literal(format!("unknown field `{field_name}`"))
                        .with_context(format!("in record `{name}`"))
                })?;

                working[idx] = parse_value(value_text, &def.fields[idx].ty, Some(&working[idx]), registry)
                    .map_err(|e| e.with_context(format!("in field `{field_name}`")))?;
            }

            Ok(CompositeValue::Record(working))
        }
    }
}

fn strip_delims(text: &str, open: char, close: char) -> Result<&str> {
    let mut chars = text.chars();
    if chars.next() != Some(open) {
        return Err(CompositeError::invalid_literal(format!(
            "expected `{open}` at start of `{text}`"
        )));
    }
    if !text.ends_with(close) {
        return Err(CompositeError::invalid_literal(format!(
            "expected closing `{close}` in `{text}`"
        )));
    }
    Ok(&text[open.len_utf8()..text.len() - close.len_utf8()])
}

/// One array element's optional index prefix (`uint ':'`), detected only
/// when the text before a top-level colon is entirely decimal digits —
/// otherwise the colon (if any) belongs to the value itself (e.g. a
/// nested record field) and the whole part is the element's value.
fn split_index_prefix(part: &str) -> Option<(usize, &str)> {
    let colon = find_same_level(part, 0, ':')?;
    let prefix = part[..colon].trim_matches(is_grammar_whitespace);
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = prefix.parse().ok()?;
    let value = part[colon + ':'.len_utf8()..].trim_matches(is_grammar_whitespace);
    Some((index, value))
}

/// Resolve each element's effective index, enforcing the "all-or-none"
/// `index:` prefix rule. Returns `(index, value_text)` pairs in listed
/// order, plus the maximum effective index (`None` for an empty part
/// list).
fn resolve_element_indices<'a>(parts: &[&'a str]) -> Result<(Vec<(usize, &'a str)>, Option<usize>)> {
    let prefixed: Vec<Option<(usize, &str)>> = parts.iter().map(|p| split_index_prefix(p)).collect();
    let any_prefixed = prefixed.iter().any(Option::is_some);
    let all_prefixed = prefixed.iter().all(Option::is_some);
    if any_prefixed && !all_prefixed {
        return Err(CompositeError::invalid_literal(
            "array elements must either all carry an `index:` prefix or none may",
        ));
    }

    let entries: Vec<(usize, &str)> = if all_prefixed {
        prefixed.into_iter().map(Option::unwrap).collect()
    } else {
        parts.iter().enumerate().map(|(i, &p)| (i, p)).collect()
    };
    let max_index = entries.iter().map(|(i, _)| *i).max();
    Ok((entries, max_index))
}

/// Parse `[' elem (',' elem)* ']'`'s interior into an element list. Returns
/// the built elements plus the maximum effective index seen (`None` if
/// `inner` is empty), since the extended var-array form needs the latter
/// to validate `size` against `data`.
///
/// `fixed_n`: `Some(n)` for a fixed array (bounds-checks against `n`),
/// `None` for a variable array (the compact short form grows to fit).
fn parse_array_elements(
    inner: &str,
    base: &TypeRef,
    fixed_n: Option<usize>,
    previous: Option<&[CompositeValue]>,
    registry: &TypeRegistry,
) -> Result<(Vec<CompositeValue>, Option<usize>)> {
    let parts = split_top_level(inner, ',');
    if parts.is_empty() {
        let len = fixed_n.unwrap_or_else(|| previous.map_or(0, <[CompositeValue]>::len));
        let elems = build_resized_array_base(previous, base, len, registry)?;
        return Ok((elems, None));
    }

    let (entries, max_index) = resolve_element_indices(&parts)?;

    if let (Some(n), Some(max)) = (fixed_n, max_index) {
        if max >= n {
            return Err(CompositeError::IndexOutOfBounds {
                index: max,
                bound: n,
                hint: format!("fixed array index {max} is out of bounds for {n} elements"),
                context: Vec::new(),
            });
        }
    }

    let len = match fixed_n {
        Some(n) => n,
        None => {
            let from_indices = max_index.map(|m| m + 1).unwrap_or(0);
            from_indices.max(previous.map_or(0, <[CompositeValue]>::len))
        }
    };

    let mut working = build_resized_array_base(previous, base, len, registry)?;

    for (idx, value_text) in entries {
        working[idx] = parse_value(value_text, base, Some(&working[idx]), registry)
            .map_err(|e| e.with_context(format!("in element `{idx}`")))?;
    }

    Ok((working, max_index))
}

/// `{size: N, data: [...]}` — variable arrays only. At most the two keys
/// `size`/`data` are permitted; anything else is `InvalidLiteral`. An
/// empty extended form (`{}`) is also rejected: the grammar requires at
/// least one `extField`.
fn parse_var_array_extended(
    inner: &str,
    base: &TypeRef,
    previous: Option<&[CompositeValue]>,
    registry: &TypeRegistry,
) -> Result<Vec<CompositeValue>> {
    let parts = split_top_level(inner, ',');
    if parts.is_empty() {
        return Err(CompositeError::invalid_literal(
            "extended variable-array form requires `size` and/or `data`",
        ));
    }

    let mut size: Option<usize> = None;
    let mut data: Option<&str> = None;

    for part in parts {
        let colon = find_same_level(part, 0, ':')
            .ok_or_else(|| CompositeError::invalid_literal(format!("field `{part}` is missing `:`")))?;
        let key = part[..colon].trim_matches(is_grammar_whitespace);
        let value_text = part[colon + ':'.len_utf8()..].trim_matches(is_grammar_whitespace);
        match key {
            "size" => {
                let n: usize = value_text.parse().map_err(|_| {
                    CompositeError::invalid_literal(format!("`size` value `{value_text}` is not a non-negative integer"))
                })?;
                size = Some(n);
            }
            "data" => data = Some(value_text),
            other => {
                return Err(CompositeError::invalid_literal(format!(
                    "`{other}` is not a valid key in extended variable-array form (only `size`/`data`)"
                )))
            }
        }
    }

    match (size, data) {
        (Some(n), Some(data_text)) => {
            let data_inner = strip_delims(data_text, '[', ']')?;
            let parts = split_top_level(data_inner, ',');
            let (entries, max_index) = resolve_element_indices(&parts)?;

            if let Some(max) = max_index {
                if max >= n {
                    return Err(CompositeError::IndexOutOfBounds {
                        index: max,
                        bound: n,
                        hint: format!("`size: {n}` is too small for `data` index {max}"),
                        context: Vec::new(),
                    });
                }
            }

            let mut working = build_resized_array_base(previous, base, n, registry)?;
            for (idx, value_text) in entries {
                working[idx] = parse_value(value_text, base, Some(&working[idx]), registry)
                    .map_err(|e| e.with_context(format!("in element `{idx}`")))?;
            }
            Ok(working)
        }
        (Some(n), None) => build_resized_array_base(previous, base, n, registry),
        (None, Some(data_text)) => {
            let data_inner = strip_delims(data_text, '[', ']')?;
            let (elems, _) = parse_array_elements(data_inner, base, None, previous, registry)?;
            Ok(elems)
        }
        (None, None) => unreachable!("at least one extField was required above"),
    }
}

/// Build a `len`-long array base: the first `min(len, previous.len())`
/// entries are deep copies of `previous`, the rest are zero-filled
/// defaults. Every element shares `elem_ty`.
fn build_resized_array_base(
    previous: Option<&[CompositeValue]>,
    elem_ty: &TypeRef,
    len: usize,
    registry: &TypeRegistry,
) -> Result<Vec<CompositeValue>> {
    let prev_len = previous.map_or(0, <[CompositeValue]>::len);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if i < prev_len {
            out.push(duplicate(&previous.unwrap()[i], elem_ty, registry)?);
        } else {
            out.push(default_value(elem_ty, registry)?);
        }
    }
    if len < prev_len {
        warn!(
            target: "composite_parser::parser",
            dropped = prev_len - len,
            "resize shrank array; trailing previous elements discarded"
        );
    }
    Ok(out)
}

/// Build a record's field base: field `i` is a deep copy of
/// `previous[i]` when present, else its zero-filled default. Each field
/// has its own type, unlike an array's uniform element type.
fn build_resized_record_base(
    previous: Option<&[CompositeValue]>,
    field_types: &[TypeRef],
    registry: &TypeRegistry,
) -> Result<Vec<CompositeValue>> {
    let mut out = Vec::with_capacity(field_types.len());
    for (i, ty) in field_types.iter().enumerate() {
        match previous.and_then(|p| p.get(i)) {
            Some(prev_value) => out.push(duplicate(prev_value, ty, registry)?),
            None => out.push(default_value(ty, registry)?),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_cluster_registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register("node", "string name; string ip; int port").unwrap();
        reg.register("cluster", "string name; int size; node[10] nodes")
            .unwrap();
        reg
    }

    #[test]
    fn parses_nested_record_scenario_one() {
        let reg = node_cluster_registry();
        let ty = TypeRef::Record("cluster".to_string());
        let text = "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}";
        let v = parse(text, &ty, None, &reg).unwrap();
        match v {
            CompositeValue::Record(fields) => {
                assert_eq!(fields[1], CompositeValue::Int(1));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn patches_nested_field_retaining_rest() {
        let reg = node_cluster_registry();
        let ty = TypeRef::Record("cluster".to_string());
        let v1 = parse(
            "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
            &ty,
            None,
            &reg,
        )
        .unwrap();

        let v2 = parse("{nodes: [1: {port: 6000}]}", &ty, Some(&v1), &reg).unwrap();
        if let CompositeValue::Record(fields) = &v2 {
            if let CompositeValue::FixedArray(nodes) = &fields[2] {
                if let CompositeValue::Record(node1) = &nodes[1] {
                    assert_eq!(node1[2], CompositeValue::Int(6000));
                    assert_eq!(node1[0], CompositeValue::null_string());
                    assert_eq!(node1[1], CompositeValue::null_string());
                } else {
                    panic!("nodes[1] is not a record");
                }
            } else {
                panic!("fields[2] is not a fixed array");
            }
        } else {
            panic!("v2 is not a record");
        }
    }

    #[test]
    fn patch_list_matches_path_engine_equivalent() {
        let reg = node_cluster_registry();
        let ty = TypeRef::Record("cluster".to_string());
        let v1 = parse(
            "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
            &ty,
            None,
            &reg,
        )
        .unwrap();

        let via_patch_list = parse("{nodes: [0: {port: 6543}]};", &ty, Some(&v1), &reg).unwrap();
        let via_direct = parse("{nodes: [0: {port: 6543}]}", &ty, Some(&v1), &reg).unwrap();
        assert_eq!(via_patch_list, via_direct);
    }

    #[test]
    fn out_of_bounds_index_on_fixed_array_fails_and_leaves_previous_untouched() {
        let reg = node_cluster_registry();
        let ty = TypeRef::Record("cluster".to_string());
        let v1 = parse(
            "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
            &ty,
            None,
            &reg,
        )
        .unwrap();

        let err = parse("{nodes: [10: {port: 1}]}", &ty, Some(&v1), &reg).unwrap_err();
        assert!(matches!(err, CompositeError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn mixed_index_prefixes_are_rejected() {
        let reg = TypeRegistry::new();
        let ty = TypeRef::VarArray(Box::new(TypeRef::Atomic(AtomicKind::Int)));
        let err = parse("[0: 1, 2, 2: 3]", &ty, None, &reg).unwrap_err();
        assert!(matches!(err, CompositeError::InvalidLiteral { .. }));
    }

    #[test]
    fn empty_fixed_array_leaves_previous_values() {
        let mut reg = TypeRegistry::new();
        reg.register("node", "int port").unwrap();
        let ty = TypeRef::FixedArray(Box::new(TypeRef::Record("node".to_string())), 3);
        let v1 = parse("[{port: 1}, {port: 2}, {port: 3}]", &ty, None, &reg).unwrap();
        let v2 = parse("[]", &ty, Some(&v1), &reg).unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn extended_form_grows_and_zero_fills() {
        let reg = TypeRegistry::new();
        let ty = TypeRef::VarArray(Box::new(TypeRef::Atomic(AtomicKind::Int)));
        let v1 = parse("[1, 2]", &ty, None, &reg).unwrap();
        let v2 = parse("{size: 5}", &ty, Some(&v1), &reg).unwrap();
        if let CompositeValue::VarArray(elems) = v2 {
            assert_eq!(elems.len(), 5);
            assert_eq!(elems[0], CompositeValue::Int(1));
            assert_eq!(elems[1], CompositeValue::Int(2));
            assert_eq!(elems[2], CompositeValue::Int(0));
            assert_eq!(elems[4], CompositeValue::Int(0));
        } else {
            panic!("expected var array");
        }
    }

    #[test]
    fn extended_form_rejects_data_past_size() {
        let reg = TypeRegistry::new();
        let ty = TypeRef::VarArray(Box::new(TypeRef::Atomic(AtomicKind::Int)));
        let err = parse("{size: 2, data: [0, 1, 2]}", &ty, None, &reg).unwrap_err();
        assert!(matches!(err, CompositeError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn quoted_string_with_doubled_quote_escape() {
        let reg = TypeRegistry::new();
        let v = parse("'can''t'", &TypeRef::Atomic(AtomicKind::String), None, &reg).unwrap();
        assert_eq!(
            v,
            CompositeValue::Str(composite_core::value::OwnedString::new(Some("can't".to_string())))
        );
    }

    #[test]
    fn patch_list_failure_carries_partial_accumulator() {
        let reg = node_cluster_registry();
        let ty = TypeRef::Record("cluster".to_string());
        let err = parse(
            "{size: 1}; {nodes: [10: {port: 1}]}; {size: 2};",
            &ty,
            None,
            &reg,
        )
        .unwrap_err();
        match err {
            CompositeError::PatchListFailure { step, accumulated, .. } => {
                assert_eq!(step, 1);
                if let CompositeValue::Record(fields) = *accumulated {
                    assert_eq!(fields[1], CompositeValue::Int(1));
                } else {
                    panic!("expected record accumulator");
                }
            }
            other => panic!("expected PatchListFailure, got {other:?}"),
        }
    }
}
