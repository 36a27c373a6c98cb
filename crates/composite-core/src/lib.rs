//! Composite Core: type registry, ABI layout calculator, and value
//! representation for the composite configuration engine.
//!
//! This crate owns the pieces every other crate in the workspace builds
//! on:
//!
//! - `types`: type names (atomic / fixed array / variable array / record),
//!   the record `TypeRegistry`, and signature parsing.
//! - `layout`: size/alignment/offset computation per the host ABI.
//! - `value`: the `CompositeValue` tagged union and its owned heap
//!   allocations.
//! - `error`: the `CompositeError` taxonomy shared across the workspace.
//! - `config`: host-configurable knobs.
//! - `memory`: allocation accounting used to make free safety observable
//!   in tests.

pub mod config;
pub mod error;
pub mod layout;
pub mod memory;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use error::{CompositeError, ErrorContext, Result};
pub use layout::Layout;
pub use types::{AtomicKind, FieldDef, RecordDef, TypeRef, TypeRegistry};
pub use value::{default_value, CompositeValue, OwnedBuffer, OwnedString};
