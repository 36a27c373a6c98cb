//! The in-memory value representation.
//!
//! Rather than `void*` plus a type-name string walked by repeated
//! `strcmp`, values are a tagged union (`CompositeValue`) and dispatch is
//! `match`. This mirrors how `crates/runtime/src/value.rs`'s `Value` enum
//! represents a stack language's runtime values (`Int`, `Bool`, `Variant`,
//! `Map`, ...) as one `#[derive(Clone, PartialEq)]` enum instead of an
//! opaque pointer, and how its `VariantData { tag, fields: Box<[Value]> }`
//! stores a sum type's fields as a flat owned array — here a `Record`'s
//! fields are likewise a flat `Vec<CompositeValue>` held parallel to the
//! owning `RecordDef`'s field order.
//!
//! `OwnedString` and `OwnedBuffer` are the two places this engine performs
//! its own heap allocation (the two kinds of transitively owned memory
//! this engine tracks); both hook into [`crate::memory`]'s counters on
//! construction/clone/drop so free safety is observable.

use std::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::memory;
use crate::types::{AtomicKind, TypeRef, TypeRegistry};

/// An owned, nullable string: models `string` as an optional value
/// rather than an "empty string means null" convention. `None` is the
/// literal `nil`.
#[derive(Debug)]
pub struct OwnedString(Option<String>);

impl OwnedString {
    pub fn new(value: Option<String>) -> Self {
        if value.is_some() {
            memory::record_string_alloc();
        }
        OwnedString(value)
    }

    pub fn null() -> Self {
        OwnedString(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn into_option(mut self) -> Option<String> {
        // Take ownership without re-triggering the drop-side decrement for
        // a value we are handing to the caller, not discarding.
        let taken = self.0.take();
        if taken.is_some() {
            memory::record_string_dealloc();
        }
        taken
    }
}

impl Clone for OwnedString {
    fn clone(&self) -> Self {
        OwnedString::new(self.0.clone())
    }
}

impl Drop for OwnedString {
    fn drop(&mut self) {
        if self.0.is_some() {
            memory::record_string_dealloc();
        }
    }
}

impl PartialEq for OwnedString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// An owned variable-array buffer: the allocated block a var-array's
/// `data` pointer refers to.
#[derive(Debug)]
pub struct OwnedBuffer(Vec<CompositeValue>);

impl OwnedBuffer {
    pub fn new(elements: Vec<CompositeValue>) -> Self {
        memory::record_buffer_alloc();
        OwnedBuffer(elements)
    }

    pub fn into_vec(mut self) -> Vec<CompositeValue> {
        memory::record_buffer_dealloc();
        std::mem::take(&mut self.0)
    }
}

impl Deref for OwnedBuffer {
    type Target = [CompositeValue];
    fn deref(&self) -> &[CompositeValue] {
        &self.0
    }
}

impl DerefMut for OwnedBuffer {
    fn deref_mut(&mut self) -> &mut Vec<CompositeValue> {
        &mut self.0
    }
}

impl Clone for OwnedBuffer {
    fn clone(&self) -> Self {
        OwnedBuffer::new(self.0.clone())
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        memory::record_buffer_dealloc();
    }
}

impl PartialEq for OwnedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// A fully in-memory composite configuration value.
///
/// `Record` fields are positional, held parallel to the owning
/// `RecordDef.fields` order rather than by name, matching how layout
/// offsets are assigned in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(OwnedString),
    FixedArray(Vec<CompositeValue>),
    VarArray(OwnedBuffer),
    Record(Vec<CompositeValue>),
}

impl CompositeValue {
    pub fn null_string() -> Self {
        CompositeValue::Str(OwnedString::null())
    }
}

/// Build the zero-filled value for a type, as if freshly `alloc`ed and
/// zeroed. Used for previously-unset fields/elements when there is no
/// previous value to patch against, and for newly grown variable-array
/// slots.
pub fn default_value(ty: &TypeRef, registry: &TypeRegistry) -> Result<CompositeValue> {
    match ty {
        TypeRef::Atomic(AtomicKind::Bool) => Ok(CompositeValue::Bool(false)),
        TypeRef::Atomic(AtomicKind::Int) => Ok(CompositeValue::Int(0)),
        TypeRef::Atomic(AtomicKind::Real) => Ok(CompositeValue::Real(0.0)),
        TypeRef::Atomic(AtomicKind::String) => Ok(CompositeValue::null_string()),
        TypeRef::FixedArray(base, n) => {
            let mut elems = Vec::with_capacity(*n);
            for _ in 0..*n {
                elems.push(default_value(base, registry)?);
            }
            Ok(CompositeValue::FixedArray(elems))
        }
        TypeRef::VarArray(_) => Ok(CompositeValue::VarArray(OwnedBuffer::new(Vec::new()))),
        TypeRef::Record(name) => {
            let def = registry.lookup(name).ok_or_else(|| {
                crate::error::CompositeError::Internal(format!(
                    "default value requested for unregistered record `{name}`"
                ))
            })?;
            let mut fields = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                fields.push(default_value(&field.ty, registry)?);
            }
            Ok(CompositeValue::Record(fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{live_buffers, live_strings};
    use serial_test::serial;

    #[test]
    #[serial(memory_counters)]
    fn null_string_allocates_nothing() {
        let before = live_strings();
        let v = CompositeValue::null_string();
        assert_eq!(live_strings(), before);
        drop(v);
        assert_eq!(live_strings(), before);
    }

    #[test]
    #[serial(memory_counters)]
    fn owned_string_round_trips_through_counters() {
        let before = live_strings();
        let v = OwnedString::new(Some("hi".to_string()));
        assert_eq!(live_strings(), before + 1);
        let cloned = v.clone();
        assert_eq!(live_strings(), before + 2);
        drop(v);
        drop(cloned);
        assert_eq!(live_strings(), before);
    }

    #[test]
    #[serial(memory_counters)]
    fn owned_buffer_round_trips_through_counters() {
        let before = live_buffers();
        let buf = OwnedBuffer::new(vec![CompositeValue::Int(1)]);
        assert_eq!(live_buffers(), before + 1);
        drop(buf);
        assert_eq!(live_buffers(), before);
    }

    #[test]
    fn default_value_zero_fills_record() {
        let mut reg = TypeRegistry::new();
        reg.register("node", "string name; int port").unwrap();
        let ty = TypeRef::Record("node".to_string());
        let v = default_value(&ty, &reg).unwrap();
        match v {
            CompositeValue::Record(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0], CompositeValue::null_string());
                assert_eq!(fields[1], CompositeValue::Int(0));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }
}
