//! Semaschema - Semantic Schema Curation Engine
//!
//! Curates a semantic layer over a relational database - table and column
//! business descriptions, synonyms, metrics, aliases, and relationships -
//! for a downstream natural-language-to-SQL engine. The crate converts
//! between the compact persisted wire schema and a richer in-session model,
//! and drives relationship authoring through a graph-editor state machine.

pub mod api;
pub mod core;
pub mod editor;
pub mod persist;
