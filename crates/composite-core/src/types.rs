//! Type names, the record type registry, and signature parsing.
//!
//! Mirrors the shape of this workspace's `Type` enum
//! (`crates/composite-parser`'s ancestor had one `Type` enum covering
//! atomics, quotations, and unions) but scoped to this engine's four shapes:
//! atomic, fixed array, variable array, record.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{CompositeError, Result};
use crate::layout::{layout_of, round_up, Layout};

/// One of the four built-in atomic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicKind {
    Bool,
    Int,
    Real,
    String,
}

impl AtomicKind {
    fn name(self) -> &'static str {
        match self {
            AtomicKind::Bool => "bool",
            AtomicKind::Int => "int",
            AtomicKind::Real => "real",
            AtomicKind::String => "string",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(AtomicKind::Bool),
            "int" => Some(AtomicKind::Int),
            "real" => Some(AtomicKind::Real),
            "string" => Some(AtomicKind::String),
            _ => None,
        }
    }
}

impl std::fmt::Display for AtomicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A resolved type name: one of the three shapes a type name can denote,
/// plus the atomic leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Atomic(AtomicKind),
    /// `BaseType[N]`, `N >= 1`.
    FixedArray(Box<TypeRef>, usize),
    /// `BaseType[]` or `BaseType[0]` (equivalent surface forms).
    VarArray(Box<TypeRef>),
    /// Any other name; must be registered.
    Record(String),
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Atomic(a) => write!(f, "{a}"),
            TypeRef::FixedArray(base, n) => write!(f, "{base}[{n}]"),
            TypeRef::VarArray(base) => write!(f, "{base}[]"),
            TypeRef::Record(name) => write!(f, "{name}"),
        }
    }
}

/// Parse a bare type-name token (no field name attached) into a `TypeRef`.
/// Does not validate that a referenced record exists — that is the
/// registry's job, since it requires knowing what has been registered so
/// far.
pub fn parse_type_name(token: &str) -> Result<TypeRef> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CompositeError::InvalidTypeDefinition(
            "empty type name".to_string(),
        ));
    }

    if let Some(stripped) = token.strip_suffix(']') {
        let open = stripped.rfind('[').ok_or_else(|| {
            CompositeError::InvalidTypeDefinition(format!("unmatched `]` in type name `{token}`"))
        })?;
        let base_token = &stripped[..open];
        let count_token = &stripped[open + 1..];
        let base = parse_type_name(base_token)?;

        if count_token.is_empty() || count_token == "0" {
            return Ok(TypeRef::VarArray(Box::new(base)));
        }
        let n: usize = count_token.parse().map_err(|_| {
            CompositeError::InvalidTypeDefinition(format!(
                "array bound `{count_token}` in `{token}` is not a non-negative integer"
            ))
        })?;
        if n == 0 {
            return Ok(TypeRef::VarArray(Box::new(base)));
        }
        return Ok(TypeRef::FixedArray(Box::new(base), n));
    }

    if let Some(atomic) = AtomicKind::from_name(token) {
        return Ok(TypeRef::Atomic(atomic));
    }

    Ok(TypeRef::Record(token.to_string()))
}

/// A single field within a registered record, with its computed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub offset: usize,
    pub size: usize,
    pub alignment: usize,
}

/// A registered composite record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    pub name: String,
    pub signature: String,
    pub fields: Vec<FieldDef>,
    pub size: usize,
    pub alignment: usize,
}

impl RecordDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Interns type definitions and resolves names to layouts.
///
/// Layout is computed eagerly at `register` time so every later reflective
/// operation is `O(fields)` rather than re-parsing the signature.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: HashMap<String, RecordDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&RecordDef> {
        self.records.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Resolve a bare type name (atomic, array, or record) to a `TypeRef`,
    /// erroring if a referenced record type is not (yet) registered.
    pub fn resolve(&self, token: &str) -> Result<TypeRef> {
        let ty = parse_type_name(token)?;
        self.validate_ref(&ty)?;
        Ok(ty)
    }

    fn validate_ref(&self, ty: &TypeRef) -> Result<()> {
        match ty {
            TypeRef::Atomic(_) => Ok(()),
            TypeRef::FixedArray(base, _) | TypeRef::VarArray(base) => self.validate_ref(base),
            TypeRef::Record(name) => {
                if self.records.contains_key(name) {
                    Ok(())
                } else {
                    Err(CompositeError::InvalidTypeDefinition(format!(
                        "unknown referenced type `{name}`"
                    )))
                }
            }
        }
    }

    /// Compute `(size, alignment)` for any resolved type reference,
    /// recursing through records using this registry.
    pub fn layout(&self, ty: &TypeRef) -> Result<Layout> {
        layout_of(ty, self)
    }

    /// Parse `signature` into fields, validate every referenced type, lay
    /// out the record per the host ABI rules, and intern it.
    ///
    /// Fails with `InvalidTypeDefinition` on an empty signature, a
    /// malformed field (not exactly two whitespace-separated tokens), an
    /// unknown referenced type, or re-registration of `name`.
    pub fn register(&mut self, name: &str, signature: &str) -> Result<()> {
        if self.records.contains_key(name) {
            return Err(CompositeError::InvalidTypeDefinition(format!(
                "type `{name}` is already registered"
            )));
        }

        let trimmed_sig = signature.trim();
        if trimmed_sig.is_empty() {
            return Err(CompositeError::InvalidTypeDefinition(format!(
                "signature for `{name}` is empty"
            )));
        }

        let mut parts: Vec<&str> = trimmed_sig.split(';').collect();
        if parts.last().is_some_and(|p| p.trim().is_empty()) {
            parts.pop();
        }
        if parts.is_empty() {
            return Err(CompositeError::InvalidTypeDefinition(format!(
                "signature for `{name}` has no fields"
            )));
        }

        let mut fields = Vec::with_capacity(parts.len());
        let mut running_offset = 0usize;
        let mut record_alignment = 1usize;

        for part in parts {
            let part = part.trim();
            let tokens: Vec<&str> = part.split_whitespace().collect();
            if tokens.len() != 2 {
                return Err(CompositeError::InvalidTypeDefinition(format!(
                    "malformed field `{part}` in signature for `{name}` (expected `type name`)"
                )));
            }
            let (type_token, field_name) = (tokens[0], tokens[1]);
            let field_ty = self.resolve(type_token)?;
            let layout = self.layout(&field_ty)?;

            let offset = round_up(running_offset, layout.alignment);
            running_offset = offset + layout.size;
            record_alignment = record_alignment.max(layout.alignment);

            trace!(
                target: "composite_core::types",
                record = name,
                field = field_name,
                ty = %field_ty,
                offset,
                size = layout.size,
                "laid out field"
            );

            fields.push(FieldDef {
                name: field_name.to_string(),
                ty: field_ty,
                offset,
                size: layout.size,
                alignment: layout.alignment,
            });
        }

        let size = round_up(running_offset, record_alignment);

        debug!(
            target: "composite_core::types",
            record = name,
            fields = fields.len(),
            size,
            alignment = record_alignment,
            "registered record type"
        );

        self.records.insert(
            name.to_string(),
            RecordDef {
                name: name.to_string(),
                signature: signature.to_string(),
                fields,
                size,
                alignment: record_alignment,
            },
        );
        Ok(())
    }
}
