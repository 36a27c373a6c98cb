//! Error taxonomy for the composite configuration engine.
//!
//! One enum covers every failure mode named by the type registry, the
//! layout calculator, the parser, the serializer, and the path engine.
//! There is no `thiserror`/`anyhow` dependency here; `CompositeError` is a
//! hand-written enum with a manual `Display` impl, matching how this
//! workspace's other error types (`CodeGenError`, `SerializeError`) are
//! written.

use std::fmt;

use crate::value::CompositeValue;

/// A single contextual breadcrumb attached to an error, e.g. "in field
/// `nodes`" or "in element `2`". Accumulated outside-in as the reflective
/// walker or parser unwinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext(pub String);

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors produced by type registration, parsing, serialization, and path
/// resolution.
#[derive(Debug)]
pub enum CompositeError {
    /// Malformed signature, unknown referenced type, or duplicate
    /// registration.
    InvalidTypeDefinition(String),

    /// Wrong opening delimiter, unmatched brackets, non-numeric index,
    /// empty index/name, unknown field, extra fields in extended array
    /// form, or mixed indexed/positional array elements.
    InvalidLiteral {
        hint: String,
        context: Vec<ErrorContext>,
    },

    /// A fixed-array index was `>= N`, or an extended variable-array form
    /// gave `size < max_index + 1`.
    IndexOutOfBounds {
        index: usize,
        bound: usize,
        hint: String,
        context: Vec<ErrorContext>,
    },

    /// The underlying atomic parser (bool/int/real/string) rejected a
    /// token.
    AtomicParseFailure {
        msg: String,
        context: Vec<ErrorContext>,
    },

    /// Path resolution did not find a named component.
    UnknownField(String),

    /// A layout lookup was inconsistent with a registered type. Should
    /// never fire if the registry is valid; indicates a bug in this crate
    /// rather than in caller input.
    Internal(String),

    /// A patch-list step failed partway through. Carries the value
    /// accumulated from the steps that succeeded before the failing one,
    /// so the host can choose to keep it.
    PatchListFailure {
        step: usize,
        accumulated: Box<CompositeValue>,
        source: Box<CompositeError>,
    },
}

impl CompositeError {
    pub fn invalid_literal(hint: impl Into<String>) -> Self {
        CompositeError::InvalidLiteral {
            hint: hint.into(),
            context: Vec::new(),
        }
    }

    /// Push a breadcrumb ("in field `nodes`", "in element `2`") onto
    /// whichever variant can occur mid-recursion while the parser or
    /// walker unwinds. `PatchListFailure` is unwound after the fact from
    /// an already-accumulated value, so it carries its inner error's
    /// context rather than its own.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        match &mut self {
            CompositeError::InvalidLiteral { context, .. }
            | CompositeError::IndexOutOfBounds { context, .. }
            | CompositeError::AtomicParseFailure { context, .. } => {
                context.push(ErrorContext(ctx.into()));
            }
            _ => {}
        }
        self
    }
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeError::InvalidTypeDefinition(msg) => {
                write!(f, "invalid type definition: {msg}")
            }
            CompositeError::InvalidLiteral { hint, context } => {
                write!(f, "invalid literal: {hint}")?;
                for c in context {
                    write!(f, ", {c}")?;
                }
                Ok(())
            }
            CompositeError::IndexOutOfBounds {
                index,
                bound,
                hint,
                context,
            } => {
                write!(f, "index {index} out of bounds (limit {bound}): {hint}")?;
                for c in context {
                    write!(f, ", {c}")?;
                }
                Ok(())
            }
            CompositeError::AtomicParseFailure { msg, context } => {
                write!(f, "failed to parse atomic value: {msg}")?;
                for c in context {
                    write!(f, ", {c}")?;
                }
                Ok(())
            }
            CompositeError::UnknownField(name) => {
                write!(f, "unknown field `{name}`")
            }
            CompositeError::Internal(msg) => write!(f, "internal error: {msg}"),
            CompositeError::PatchListFailure { step, source, .. } => {
                write!(f, "patch list step {step} failed: {source}")
            }
        }
    }
}

impl std::error::Error for CompositeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompositeError::PatchListFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompositeError>;
