//! Layout computation for atomics, fixed arrays, variable arrays, and
//! records.
//!
//! One deliberate divergence from a C-like stride rule of
//! `size + (size mod alignment)`, which over-pads whenever `size` isn't
//! already a multiple of `alignment`: since this engine never persists a
//! computed layout to disk (text is the sole wire format), there is no
//! bit-exact-compatibility requirement to preserve, so the standard
//! `round_up` rule is used instead; the two rules agree for every atomic
//! on a typical 64-bit host, where `size` is always a multiple of
//! `alignment`.

use crate::error::{CompositeError, Result};
use crate::types::{AtomicKind, TypeRef, TypeRegistry};

/// `(size, alignment)` in bytes, as a host ABI would report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: usize,
    pub alignment: usize,
}

impl Layout {
    pub const fn new(size: usize, alignment: usize) -> Self {
        Layout { size, alignment }
    }
}

/// Round `offset` up to the next multiple of `alignment`.
///
/// `alignment` is always a power of two for the shapes this engine lays
/// out (atomics use native host sizes, which are themselves powers of
/// two), so the usual bitmask trick applies.
pub fn round_up(offset: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two(), "alignment must be a power of two");
    (offset + alignment - 1) & !(alignment - 1)
}

fn word_size() -> usize {
    std::mem::size_of::<usize>()
}

/// Size of a variable array's length word. Kept distinct from `word_size`
/// because it's `int`'s own native size, not a pointer's — the two happen
/// to agree on a typical 64-bit host but aren't the same quantity.
fn size_word() -> usize {
    std::mem::size_of::<i64>()
}

fn atomic_layout(kind: AtomicKind) -> Layout {
    match kind {
        AtomicKind::Bool => Layout::new(std::mem::size_of::<bool>(), std::mem::align_of::<bool>()),
        AtomicKind::Int => Layout::new(std::mem::size_of::<i64>(), std::mem::align_of::<i64>()),
        AtomicKind::Real => Layout::new(std::mem::size_of::<f64>(), std::mem::align_of::<f64>()),
        // One owning pointer — a `string` slot is exactly pointer-sized/
        // aligned for layout purposes, independent of whatever
        // representation actually backs the owned text.
        AtomicKind::String => Layout::new(word_size(), word_size()),
    }
}

/// Compute `(size, alignment)` for any type reference, recursing through
/// records via `registry`.
pub fn layout_of(ty: &TypeRef, registry: &TypeRegistry) -> Result<Layout> {
    match ty {
        TypeRef::Atomic(kind) => Ok(atomic_layout(*kind)),

        TypeRef::FixedArray(base, n) => {
            if *n == 0 {
                return Err(CompositeError::Internal(
                    "fixed array with N == 0 should have parsed as a variable array".to_string(),
                ));
            }
            let elem = layout_of(base, registry)?;
            let stride = round_up(elem.size, elem.alignment);
            Ok(Layout::new(stride * n, elem.alignment))
        }

        // Pointer word + length word: the pointer is host-pointer-sized,
        // the length is `int`-sized, matching `int`'s own native atomic
        // layout rather than reusing the pointer's width for both.
        TypeRef::VarArray(_) => Ok(Layout::new(word_size() + size_word(), word_size())),

        TypeRef::Record(name) => {
            let def = registry.lookup(name).ok_or_else(|| {
                CompositeError::Internal(format!(
                    "layout requested for unregistered record `{name}`"
                ))
            })?;
            Ok(Layout::new(def.size, def.alignment))
        }
    }
}

/// The stride between consecutive elements of an array whose element
/// layout is `elem` — the size rounded up to the element's own alignment,
/// so the next element starts aligned.
pub fn element_stride(elem: Layout) -> usize {
    round_up(elem.size, elem.alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn round_up_is_identity_on_aligned_offsets() {
        assert_eq!(round_up(0, 8), 0);
        assert_eq!(round_up(8, 8), 8);
        assert_eq!(round_up(9, 8), 16);
        assert_eq!(round_up(1, 4), 4);
    }

    #[test]
    fn atomic_layouts_are_self_consistent() {
        let reg = TypeRegistry::new();
        let int_layout = layout_of(&TypeRef::Atomic(AtomicKind::Int), &reg).unwrap();
        assert_eq!(int_layout.size % int_layout.alignment, 0);
        let bool_layout = layout_of(&TypeRef::Atomic(AtomicKind::Bool), &reg).unwrap();
        assert_eq!(bool_layout.size, 1);
    }

    #[test]
    fn layout_law_holds_for_nested_record() {
        let mut reg = TypeRegistry::new();
        reg.register("node", "string name; string ip; int port").unwrap();
        reg.register("cluster", "string name; int size; node[10] nodes")
            .unwrap();
        let cluster = reg.lookup("cluster").unwrap();

        assert_eq!(cluster.size % cluster.alignment, 0);
        for (i, field) in cluster.fields.iter().enumerate() {
            assert_eq!(field.offset % field.alignment, 0);
            if let Some(prev) = cluster.fields.get(i.wrapping_sub(1)) {
                if i > 0 {
                    assert!(field.offset >= prev.offset + prev.size);
                }
            }
        }
    }

    #[test]
    fn var_array_layout_is_two_words() {
        let reg = TypeRegistry::new();
        let layout = layout_of(
            &TypeRef::VarArray(Box::new(TypeRef::Atomic(AtomicKind::Int))),
            &reg,
        )
        .unwrap();
        assert_eq!(layout.size, word_size() + size_word());
        assert_eq!(layout.alignment, word_size());
    }
}
