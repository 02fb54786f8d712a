//! Project description: YAML loading and the declaration schema.

pub mod loader;
pub mod schema;

pub use loader::{load, ROOT_DOCUMENT};
pub use schema::populate;
