//! Core domain: the editable schema model, the wire normalizer, and the
//! mutation/validation/rollup logic the editor layers build on.

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod rollup;
mod schema;
pub mod validation;
pub mod wire;

pub use schema::*;
