//! buildgen - a Kconfig-gated build file generator for C projects
//!
//! This crate turns a declarative YAML project description (variables,
//! libraries, applications, custom targets) into a concrete build file for
//! one of two backends (GNU Make or Ninja). Individual build-graph nodes
//! are included or excluded based on the option symbols enabled by an
//! external Kconfig pass.

pub mod config;
pub mod core;
pub mod generator;
pub mod kconfig;
pub mod util;

pub use crate::core::{
    entity::{Application, Entity, EntityKind, Library, Target, Variable},
    registry::Registry,
    ConfigError,
};
pub use generator::{generate, Backend, GenerateOptions};
pub use kconfig::{ConfigTool, OptionSet};
