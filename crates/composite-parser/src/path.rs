//! Path Engine: turns a scoped assignment like
//! `cluster.nodes[1].port = 5433` into either a single composite literal
//! (for the parser) or a resolved `(type, value)` pair (for a read).
//!
//! Grounded in `crates/compiler/src/parser.rs`'s token-cursor style, but
//! the "tokens" here are the `.`/`[`/`]`-delimited path segments rather
//! than a pre-lexed `Vec<Token>` — the grammar is simple enough (a flat
//! chain of names and bracketed indices) that a direct scan suffices.

use composite_core::{CompositeError, Result, TypeRef, TypeRegistry};
use composite_runtime::walker::{field_type, get_field, get_field_mut};
use composite_core::value::CompositeValue;

/// One path step: a record field name, or a bracketed array index.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep<'a> {
    Name(&'a str),
    Index(&'a str),
}

/// Split `a.b[3].c` into its ordered steps, dropping the leading
/// top-level setting name (the outermost element names which
/// configuration value a path is scoped under, and is discarded once
/// resolution starts from that value directly).
fn tokenize(path: &str) -> Vec<PathStep<'_>> {
    let mut steps = Vec::new();
    let mut chars = path.char_indices().peekable();
    let mut seg_start = 0usize;

    while let Some(&(i, c)) = chars.peek() {
        match c {
            '.' => {
                if i > seg_start {
                    steps.push(PathStep::Name(&path[seg_start..i]));
                }
                chars.next();
                seg_start = i + 1;
            }
            '[' => {
                if i > seg_start {
                    steps.push(PathStep::Name(&path[seg_start..i]));
                }
                chars.next();
                let idx_start = i + 1;
                let mut idx_end = idx_start;
                while let Some(&(j, cc)) = chars.peek() {
                    if cc == ']' {
                        idx_end = j;
                        chars.next();
                        break;
                    }
                    idx_end = j + cc.len_utf8();
                    chars.next();
                }
                steps.push(PathStep::Index(&path[idx_start..idx_end]));
                seg_start = idx_end + 1;
            }
            _ => {
                chars.next();
            }
        }
    }
    if seg_start < path.len() {
        steps.push(PathStep::Name(&path[seg_start..]));
    }

    // Discard the top-level setting name.
    if !steps.is_empty() {
        steps.remove(0);
    }
    steps
}

/// Build the nested composite-literal spine around `leaf_text` that a
/// scoped path assignment denotes. A digit-started step is wrapped as an
/// array-index element; an identifier step is wrapped as a record field.
pub fn convert_path_to_literal(path: &str, leaf_text: &str) -> String {
    let steps = tokenize(path);
    let mut text = leaf_text.to_string();
    for step in steps.into_iter().rev() {
        text = match step {
            PathStep::Name(name) => format!("{{{name}: {text}}}"),
            PathStep::Index(idx) => format!("[{idx}: {text}]"),
        };
    }
    text
}

/// Follow `path` from `root` (of type `ty`), returning the type and a
/// cloned value found there. A numeric step past a variable array's
/// header is an implicit `data` dereference: `cluster.nodes[1]` does not
/// need a literal `.data` segment.
pub fn resolve_path(
    root: &CompositeValue,
    ty: &TypeRef,
    path: &str,
    registry: &TypeRegistry,
) -> Result<(TypeRef, CompositeValue)> {
    let steps = tokenize(path);
    let mut cur_value = root;
    let mut cur_ty = ty.clone();

    for step in &steps {
        let key = match step {
            PathStep::Name(name) => *name,
            PathStep::Index(idx) => idx,
        };
        let (next_value, next_ty) = get_field(cur_value, &cur_ty, key, registry)?;
        cur_value = next_value;
        cur_ty = next_ty;
    }

    Ok((cur_ty, cur_value.clone()))
}

/// Mutable counterpart of [`resolve_path`]: applies `new_value` at the
/// path's leaf in place. Used by a host that wants to avoid building and
/// re-parsing a literal for a single scalar assignment.
pub fn set_path(
    root: &mut CompositeValue,
    ty: &TypeRef,
    path: &str,
    new_value: CompositeValue,
    registry: &TypeRegistry,
) -> Result<()> {
    let steps = tokenize(path);
    let Some((last, init)) = steps.split_last() else {
        return Err(CompositeError::invalid_literal("empty path has no leaf to assign"));
    };

    let mut cur_value = root;
    let mut cur_ty = ty.clone();
    for step in init {
        let key = match step {
            PathStep::Name(name) => *name,
            PathStep::Index(idx) => idx,
        };
        let (next_value, next_ty) = get_field_mut(cur_value, &cur_ty, key, registry)?;
        cur_value = next_value;
        cur_ty = next_ty;
    }

    let leaf_key = match last {
        PathStep::Name(name) => *name,
        PathStep::Index(idx) => idx,
    };
    let expected_ty = field_type(&cur_ty, leaf_key, registry)?;
    let (slot, _) = get_field_mut(cur_value, &cur_ty, leaf_key, registry)?;
    if std::mem::discriminant(slot) != std::mem::discriminant(&new_value) {
        return Err(CompositeError::Internal(format!(
            "path assignment type mismatch at `{leaf_key}`: expected `{expected_ty}`"
        )));
    }
    *slot = new_value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_path_builds_nested_spine_and_drops_top_level_name() {
        let literal = convert_path_to_literal("cluster.nodes[0].port", "6543");
        assert_eq!(literal, "{nodes: [0: {port: 6543}]}");
    }

    #[test]
    fn tokenize_drops_leading_setting_name() {
        let steps = tokenize("cluster.nodes[3].name");
        assert_eq!(
            steps,
            vec![
                PathStep::Name("nodes"),
                PathStep::Index("3"),
                PathStep::Name("name"),
            ]
        );
    }
}
