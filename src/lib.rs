//! schemawire: headless schema-state engine for an interactive
//! entity-relationship designer.
//!
//! The crate owns the schema state (tables, columns, relationships), keeps
//! column flags consistent under SQL-like constraints on every mutation, and
//! translates pointer events into model commands. A host view renders
//! snapshots and feeds events in; it never mutates the model directly.

pub mod canvas;
pub mod core;
