//! Core domain model and command surface for schema editing.

mod commands;
mod constraints;
mod document;
mod layout;
mod relationships;
mod schema;
mod validation;

pub use commands::*;
pub use constraints::*;
pub use document::*;
pub use layout::*;
pub use relationships::*;
pub use schema::*;
pub use validation::*;
