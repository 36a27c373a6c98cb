//! The reflective walker: a single dispatcher, keyed on a type's shape,
//! that drives duplicate/free/compare/field-lookup across
//! atomic/fixed-array/variable-array/record values.
//!
//! Dispatch is a `match` on `(value, TypeRef)`, not a `strcmp` chain over
//! a type-name string, mirroring how `crates/runtime/src/value.rs`'s
//! `Value`/`VariantData` are walked by pattern matching rather than
//! void-pointer arithmetic.

use std::cmp::Ordering;

use tracing::trace;

use composite_core::value::{CompositeValue, OwnedBuffer, OwnedString};
use composite_core::{AtomicKind, CompositeError, Result, TypeRef, TypeRegistry};

fn shape_mismatch(value: &CompositeValue, ty: &TypeRef) -> CompositeError {
    CompositeError::Internal(format!("value {value:?} does not match type `{ty}`"))
}

/// Deep-copy a value, re-allocating every owned string and variable-array
/// buffer so the result shares no heap allocation with `value`.
pub fn duplicate(value: &CompositeValue, ty: &TypeRef, registry: &TypeRegistry) -> Result<CompositeValue> {
    match (value, ty) {
        (CompositeValue::Bool(b), TypeRef::Atomic(AtomicKind::Bool)) => Ok(CompositeValue::Bool(*b)),
        (CompositeValue::Int(n), TypeRef::Atomic(AtomicKind::Int)) => Ok(CompositeValue::Int(*n)),
        (CompositeValue::Real(r), TypeRef::Atomic(AtomicKind::Real)) => Ok(CompositeValue::Real(*r)),
        (CompositeValue::Str(s), TypeRef::Atomic(AtomicKind::String)) => {
            Ok(CompositeValue::Str(OwnedString::new(s.as_deref().map(str::to_string))))
        }
        (CompositeValue::FixedArray(elems), TypeRef::FixedArray(base, n)) => {
            if elems.len() != *n {
                return Err(shape_mismatch(value, ty));
            }
            let mut out = Vec::with_capacity(*n);
            for e in elems {
                out.push(duplicate(e, base, registry)?);
            }
            Ok(CompositeValue::FixedArray(out))
        }
        (CompositeValue::VarArray(buf), TypeRef::VarArray(base)) => {
            let mut out = Vec::with_capacity(buf.len());
            for e in buf.iter() {
                out.push(duplicate(e, base, registry)?);
            }
            Ok(CompositeValue::VarArray(OwnedBuffer::new(out)))
        }
        (CompositeValue::Record(fields), TypeRef::Record(name)) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            if fields.len() != def.fields.len() {
                return Err(shape_mismatch(value, ty));
            }
            let mut out = Vec::with_capacity(fields.len());
            for (field_value, field_def) in fields.iter().zip(&def.fields) {
                out.push(duplicate(field_value, &field_def.ty, registry)?);
            }
            Ok(CompositeValue::Record(out))
        }
        _ => Err(shape_mismatch(value, ty)),
    }
}

/// Release a value's transitively owned memory. In safe Rust this is
/// mostly `Drop` doing the work, but the
/// walker still validates the value's shape against `ty` first, so a
/// caller handing in a value that doesn't match the declared type gets an
/// `Internal` error instead of silently dropping something unrelated.
pub fn free(value: CompositeValue, ty: &TypeRef, registry: &TypeRegistry) -> Result<()> {
    check_shape(&value, ty, registry)?;
    trace!(target: "composite_runtime::walker", ty = %ty, "freeing value");
    drop(value);
    Ok(())
}

fn check_shape(value: &CompositeValue, ty: &TypeRef, registry: &TypeRegistry) -> Result<()> {
    match (value, ty) {
        (CompositeValue::Bool(_), TypeRef::Atomic(AtomicKind::Bool))
        | (CompositeValue::Int(_), TypeRef::Atomic(AtomicKind::Int))
        | (CompositeValue::Real(_), TypeRef::Atomic(AtomicKind::Real))
        | (CompositeValue::Str(_), TypeRef::Atomic(AtomicKind::String)) => Ok(()),
        (CompositeValue::FixedArray(elems), TypeRef::FixedArray(base, n)) => {
            if elems.len() != *n {
                return Err(shape_mismatch(value, ty));
            }
            elems.iter().try_for_each(|e| check_shape(e, base, registry))
        }
        (CompositeValue::VarArray(buf), TypeRef::VarArray(base)) => {
            buf.iter().try_for_each(|e| check_shape(e, base, registry))
        }
        (CompositeValue::Record(fields), TypeRef::Record(name)) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            if fields.len() != def.fields.len() {
                return Err(shape_mismatch(value, ty));
            }
            fields
                .iter()
                .zip(&def.fields)
                .try_for_each(|(v, f)| check_shape(v, &f.ty, registry))
        }
        _ => Err(shape_mismatch(value, ty)),
    }
}

fn compare_opt_str(a: Option<&str>, b: Option<&str>) -> Ordering {
    // null sorts below any non-null string.
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

/// Structural three-way comparison, type-directed.
///
/// Reals compare via `f64::total_cmp` rather than a partial, NaN-fragile
/// comparison, so `compare` is always a genuine total order (see
/// DESIGN.md's NaN-ordering note).
pub fn compare(a: &CompositeValue, b: &CompositeValue, ty: &TypeRef, registry: &TypeRegistry) -> Result<Ordering> {
    match ty {
        TypeRef::Atomic(AtomicKind::Bool) => match (a, b) {
            (CompositeValue::Bool(x), CompositeValue::Bool(y)) => Ok(x.cmp(y)),
            _ => Err(shape_mismatch(a, ty)),
        },
        TypeRef::Atomic(AtomicKind::Int) => match (a, b) {
            (CompositeValue::Int(x), CompositeValue::Int(y)) => Ok(x.cmp(y)),
            _ => Err(shape_mismatch(a, ty)),
        },
        TypeRef::Atomic(AtomicKind::Real) => match (a, b) {
            (CompositeValue::Real(x), CompositeValue::Real(y)) => Ok(x.total_cmp(y)),
            _ => Err(shape_mismatch(a, ty)),
        },
        TypeRef::Atomic(AtomicKind::String) => match (a, b) {
            (CompositeValue::Str(x), CompositeValue::Str(y)) => {
                Ok(compare_opt_str(x.as_deref(), y.as_deref()))
            }
            _ => Err(shape_mismatch(a, ty)),
        },
        TypeRef::FixedArray(base, n) => match (a, b) {
            (CompositeValue::FixedArray(xs), CompositeValue::FixedArray(ys)) => {
                if xs.len() != *n || ys.len() != *n {
                    return Err(shape_mismatch(a, ty));
                }
                for (x, y) in xs.iter().zip(ys) {
                    let ord = compare(x, y, base, registry)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(Ordering::Equal)
            }
            _ => Err(shape_mismatch(a, ty)),
        },
        TypeRef::VarArray(base) => match (a, b) {
            (CompositeValue::VarArray(xs), CompositeValue::VarArray(ys)) => {
                // shorter array sorts first; ties break elementwise.
                let len_ord = xs.len().cmp(&ys.len());
                if len_ord != Ordering::Equal {
                    return Ok(len_ord);
                }
                for (x, y) in xs.iter().zip(ys.iter()) {
                    let ord = compare(x, y, base, registry)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(Ordering::Equal)
            }
            _ => Err(shape_mismatch(a, ty)),
        },
        TypeRef::Record(name) => match (a, b) {
            (CompositeValue::Record(xs), CompositeValue::Record(ys)) => {
                let def = registry
                    .lookup(name)
                    .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
                if xs.len() != def.fields.len() || ys.len() != def.fields.len() {
                    return Err(shape_mismatch(a, ty));
                }
                for ((x, y), field) in xs.iter().zip(ys).zip(&def.fields) {
                    let ord = compare(x, y, &field.ty, registry)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(Ordering::Equal)
            }
            _ => Err(shape_mismatch(a, ty)),
        },
    }
}

/// Resolve the type a field/index name denotes under `ty`, without
/// touching a value. Used by the path engine to validate a path before —
/// or without — any value in hand.
pub fn field_type(ty: &TypeRef, key: &str, registry: &TypeRegistry) -> Result<TypeRef> {
    match ty {
        TypeRef::Atomic(_) => Err(CompositeError::UnknownField(key.to_string())),
        TypeRef::FixedArray(base, n) => {
            let idx: usize = key
                .parse()
                .map_err(|_| CompositeError::UnknownField(key.to_string()))?;
            if idx >= *n {
                return Err(CompositeError::IndexOutOfBounds {
                    index: idx,
                    bound: *n,
                    hint: format!("fixed array index {idx} out of bounds"),
                    context: Vec::new(),
                });
            }
            Ok((**base).clone())
        }
        TypeRef::VarArray(base) => match key {
            "data" => Ok((**base).clone()),
            "size" => Ok(TypeRef::Atomic(AtomicKind::Int)),
            _ => {
                key.parse::<usize>()
                    .map_err(|_| CompositeError::UnknownField(key.to_string()))?;
                Ok((**base).clone())
            }
        },
        TypeRef::Record(name) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            def.field(key)
                .map(|f| f.ty.clone())
                .ok_or_else(|| CompositeError::UnknownField(key.to_string()))
        }
    }
}

/// Resolve one path step against a value, returning a shared reference to
/// the sub-value and its type. `data` on a variable array is a pass-through
/// step: it returns the same `VarArray` value and type unchanged, so the
/// following path step (a bracketed index) lands back in the numeric-index
/// arm below — this is what makes an explicit `.data[N]` segment behave
/// the same as the usual elided `[N]`. `size` has no backing
/// `CompositeValue` to borrow — callers that need the length read
/// `CompositeValue::VarArray(_).len()` directly.
pub fn get_field<'a>(
    value: &'a CompositeValue,
    ty: &TypeRef,
    key: &str,
    registry: &TypeRegistry,
) -> Result<(&'a CompositeValue, TypeRef)> {
    if key == "data" {
        if let (CompositeValue::VarArray(_), TypeRef::VarArray(_)) = (value, ty) {
            return Ok((value, ty.clone()));
        }
    }

    match (value, ty) {
        (CompositeValue::FixedArray(elems), TypeRef::FixedArray(base, n)) => {
            let idx: usize = key
                .parse()
                .map_err(|_| CompositeError::UnknownField(key.to_string()))?;
            if idx >= *n {
                return Err(CompositeError::IndexOutOfBounds {
                    index: idx,
                    bound: *n,
                    hint: format!("fixed array index {idx} out of bounds"),
                    context: Vec::new(),
                });
            }
            Ok((&elems[idx], (**base).clone()))
        }
        (CompositeValue::VarArray(buf), TypeRef::VarArray(base)) => {
            let idx: usize = key
                .parse()
                .map_err(|_| CompositeError::UnknownField(key.to_string()))?;
            if idx >= buf.len() {
                return Err(CompositeError::IndexOutOfBounds {
                    index: idx,
                    bound: buf.len(),
                    hint: format!("variable array index {idx} out of bounds"),
                    context: Vec::new(),
                });
            }
            Ok((&buf[idx], (**base).clone()))
        }
        (CompositeValue::Record(fields), TypeRef::Record(name)) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            let idx = def
                .field_index(key)
                .ok_or_else(|| CompositeError::UnknownField(key.to_string()))?;
            Ok((&fields[idx], def.fields[idx].ty.clone()))
        }
        _ => Err(CompositeError::UnknownField(key.to_string())),
    }
}

/// Mutable counterpart of [`get_field`], used by the path engine to apply
/// a leaf assignment in place. `data` is a pass-through step here too, for
/// the same reason as in `get_field`.
pub fn get_field_mut<'a>(
    value: &'a mut CompositeValue,
    ty: &TypeRef,
    key: &str,
    registry: &TypeRegistry,
) -> Result<(&'a mut CompositeValue, TypeRef)> {
    if key == "data" && matches!((&value, ty), (CompositeValue::VarArray(_), TypeRef::VarArray(_))) {
        let ty = ty.clone();
        return Ok((value, ty));
    }

    match (value, ty) {
        (CompositeValue::FixedArray(elems), TypeRef::FixedArray(base, n)) => {
            let idx: usize = key
                .parse()
                .map_err(|_| CompositeError::UnknownField(key.to_string()))?;
            if idx >= *n {
                return Err(CompositeError::IndexOutOfBounds {
                    index: idx,
                    bound: *n,
                    hint: format!("fixed array index {idx} out of bounds"),
                    context: Vec::new(),
                });
            }
            Ok((&mut elems[idx], (**base).clone()))
        }
        (CompositeValue::VarArray(buf), TypeRef::VarArray(base)) => {
            let idx: usize = key
                .parse()
                .map_err(|_| CompositeError::UnknownField(key.to_string()))?;
            if idx >= buf.len() {
                return Err(CompositeError::IndexOutOfBounds {
                    index: idx,
                    bound: buf.len(),
                    hint: format!("variable array index {idx} out of bounds"),
                    context: Vec::new(),
                });
            }
            Ok((&mut buf[idx], (**base).clone()))
        }
        (CompositeValue::Record(fields), TypeRef::Record(name)) => {
            let def = registry
                .lookup(name)
                .ok_or_else(|| CompositeError::Internal(format!("unregistered record `{name}`")))?;
            let idx = def
                .field_index(key)
                .ok_or_else(|| CompositeError::UnknownField(key.to_string()))?;
            let ty = def.fields[idx].ty.clone();
            Ok((&mut fields[idx], ty))
        }
        (value, ty) => Err(shape_mismatch(value, ty)),
    }
}
