//! Dredge action contracts.
//!
//! Canonical definitions of every action kind a producer may request, the
//! field contract for each, and the validator that turns a normalized payload
//! into a typed `ParsedAction`. The catalog is static configuration: loaded
//! once, immutable, shared by reference.

mod actions;
mod catalog;

pub use actions::{is_container_tag, resolve_kind, ActionKind, EditOp, ParsedAction};
pub use catalog::{catalog, contract, validate, ActionContract, FieldSpec, FieldType, FieldViolation};
