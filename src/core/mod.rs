//! The build-graph entity model.
//!
//! One run of the generator builds exactly one [`registry::Registry`] of
//! immutable entities, which is then consumed once by a backend emitter.

pub mod entity;
pub mod flags;
pub mod registry;

use thiserror::Error;

/// Names claimed by the generated system targets.
///
/// User declarations may not use these; they would otherwise be silently
/// shadowed by the synthesized `config`/`all`/`clean` targets.
pub const RESERVED_NAMES: &[&str] = &["config", "all", "clean"];

/// Fatal configuration errors.
///
/// Every variant aborts generation before any output file is committed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate entity name `{0}`")]
    DuplicateName(String),

    #[error("`{0}` is a reserved name (the `config`, `all` and `clean` targets are generated)")]
    ReservedName(String),

    #[error("declaration `{name}`: {message}")]
    Declaration { name: String, message: String },

    #[error("declaration `{name}`: field `{field}` {expected}")]
    WrongShape {
        name: String,
        field: String,
        expected: String,
    },

    #[error("declaration `{name}`: invalid glob pattern `{pattern}`: {message}")]
    BadPattern {
        name: String,
        pattern: String,
        message: String,
    },

    #[error("application `{app}` links against `{dep}`, which is not a registered library")]
    UnresolvedLibrary { app: String, dep: String },

    #[error("`{module}`: cannot determine source language of `{src}`")]
    UnknownSourceLang { module: String, src: String },

    #[error("`{module}`: sources `{first}` and `{second}` both compile to `{object}`")]
    ObjectCollision {
        module: String,
        first: String,
        second: String,
        object: String,
    },
}
