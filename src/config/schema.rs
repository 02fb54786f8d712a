//! Declaration schema: turning raw YAML declarations into entities.
//!
//! Each declaration carries a `type` tag (`var`, `lib`, `app`, `tgt`), an
//! optional gating symbol `opt` and an optional `desc`, plus kind-specific
//! fields. Dispatch on the tag is a closed sum type; the unknown-tag case
//! is explicit and is the single tolerated partial failure: the
//! declaration is skipped with a warning and processing continues.

use anyhow::Result;
use serde_yaml::{Mapping, Value};

use crate::core::entity::{Application, Entity, Library, Target, Variable};
use crate::core::flags::PatternFlags;
use crate::core::registry::Registry;
use crate::core::{ConfigError, RESERVED_NAMES};
use crate::kconfig::{GateError, OptionSet};

/// Declaration kind, decoded from the `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Var,
    Lib,
    App,
    Tgt,
}

impl DeclKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "var" => Some(DeclKind::Var),
            "lib" => Some(DeclKind::Lib),
            "app" => Some(DeclKind::App),
            "tgt" => Some(DeclKind::Tgt),
            _ => None,
        }
    }
}

/// Run the declaration pass: gate, validate and register every entry of
/// the merged project description.
pub fn populate(registry: &mut Registry, declarations: &Mapping, gate: &OptionSet) -> Result<()> {
    for (key, value) in declarations {
        let name = key.as_str().ok_or_else(|| ConfigError::Declaration {
            name: format!("{key:?}"),
            message: "declaration names must be strings".to_string(),
        })?;

        let Some(entity) = build_entity(name, value, gate)? else {
            continue;
        };
        registry.register(entity)?;
    }
    Ok(())
}

/// Construct one entity from its raw declaration.
///
/// Returns `Ok(None)` when the declaration is skipped: unknown `type` tag
/// (warned) or gated out (no trace, no placeholder).
fn build_entity(name: &str, value: &Value, gate: &OptionSet) -> Result<Option<Entity>> {
    let fields = value.as_mapping().ok_or_else(|| ConfigError::Declaration {
        name: name.to_string(),
        message: "declaration body must be a mapping".to_string(),
    })?;

    let tag = field(fields, "type").and_then(Value::as_str).unwrap_or("");
    let Some(kind) = DeclKind::from_tag(tag) else {
        tracing::warn!("invalid object type `{tag}` for declaration `{name}`, skipping");
        return Ok(None);
    };

    // Gate before validating: a gated-out declaration is skipped entirely,
    // even when its remaining fields are malformed.
    let opt = opt_field(name, fields)?;
    if !gate.included(opt) {
        tracing::debug!("declaration `{name}` gated out by option `{opt}`");
        return Ok(None);
    }

    if RESERVED_NAMES.contains(&name) {
        return Err(ConfigError::ReservedName(name.to_string()).into());
    }

    let desc = string_field(name, fields, "desc")?.unwrap_or_default();
    let entity = match kind {
        DeclKind::Var => Entity::Variable(Variable::new(
            name,
            string_field(name, fields, "val")?.unwrap_or_default(),
            desc,
        )),
        DeclKind::Lib => Entity::Library(Library {
            name: name.to_string(),
            desc,
            sources: required_string_list(name, fields, "src")?,
            header_dirs: path_list_field(name, fields, "hdrdirs")?,
            cflags: flat_flags(name, fields, "cflags")?,
            cppflags: flat_flags(name, fields, "cppflags")?,
            asmflags: flat_flags(name, fields, "asmflags")?,
        }),
        DeclKind::App => Entity::Application(Application {
            name: name.to_string(),
            desc,
            sources: required_string_list(name, fields, "src")?,
            cflags: pattern_flags(name, fields, "cflags")?,
            cppflags: pattern_flags(name, fields, "cppflags")?,
            asmflags: pattern_flags(name, fields, "asmflags")?,
            linkflags: string_field(name, fields, "linkflags")?.unwrap_or_default(),
            libs: string_list_field(name, fields, "libs")?,
        }),
        DeclKind::Tgt => Entity::Target(Target::new(
            name,
            desc,
            string_field(name, fields, "cmd")?.unwrap_or_default(),
            string_list_field(name, fields, "deps")?,
        )),
    };
    Ok(Some(entity))
}

fn field<'a>(fields: &'a Mapping, key: &str) -> Option<&'a Value> {
    fields.get(key)
}

/// The gating symbol; must be a string when present.
fn opt_field<'a>(name: &str, fields: &'a Mapping) -> Result<&'a str, GateError> {
    match field(fields, "opt") {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(GateError::NotAString {
            name: name.to_string(),
            found: yaml_type(other).to_string(),
        }),
    }
}

fn string_field(name: &str, fields: &Mapping, key: &str) -> Result<Option<String>, ConfigError> {
    match field(fields, key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(wrong_shape(name, key, "must be a flat string", other)),
    }
}

fn string_list_field(name: &str, fields: &Mapping, key: &str) -> Result<Vec<String>, ConfigError> {
    match field(fields, key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(wrong_shape(name, key, "must be a list of strings", other)),
            })
            .collect(),
        Some(other) => Err(wrong_shape(name, key, "must be a list of strings", other)),
    }
}

fn required_string_list(
    name: &str,
    fields: &Mapping,
    key: &str,
) -> Result<Vec<String>, ConfigError> {
    if field(fields, key).is_none() {
        return Err(ConfigError::Declaration {
            name: name.to_string(),
            message: format!("missing required field `{key}`"),
        });
    }
    string_list_field(name, fields, key)
}

/// Header directories: a whitespace-separated flat string or a list of
/// paths.
fn path_list_field(name: &str, fields: &Mapping, key: &str) -> Result<Vec<String>, ConfigError> {
    match field(fields, key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Some(Value::Sequence(_)) => string_list_field(name, fields, key),
        Some(other) => Err(wrong_shape(
            name,
            key,
            "must be a string or a list of paths",
            other,
        )),
    }
}

/// Library flag fields are flat strings, never mappings.
fn flat_flags(name: &str, fields: &Mapping, key: &str) -> Result<String, ConfigError> {
    string_field(name, fields, key).map(Option::unwrap_or_default)
}

/// Application flag fields are insertion-ordered pattern -> flags
/// mappings, never flat strings.
fn pattern_flags(name: &str, fields: &Mapping, key: &str) -> Result<PatternFlags, ConfigError> {
    let mapping = match field(fields, key) {
        None | Some(Value::Null) => return Ok(PatternFlags::new()),
        Some(Value::Mapping(m)) => m,
        Some(other) => {
            return Err(wrong_shape(
                name,
                key,
                "must be a mapping of glob patterns to flag strings",
                other,
            ))
        }
    };

    let mut pairs = Vec::with_capacity(mapping.len());
    for (pattern, flags) in mapping {
        let (Some(pattern), Some(flags)) = (pattern.as_str(), flags.as_str()) else {
            return Err(wrong_shape(
                name,
                key,
                "must be a mapping of glob patterns to flag strings",
                flags,
            ));
        };
        pairs.push((pattern.to_string(), flags.to_string()));
    }
    PatternFlags::from_pairs(name, pairs)
}

fn wrong_shape(name: &str, key: &str, expected: &str, found: &Value) -> ConfigError {
    ConfigError::WrongShape {
        name: name.to_string(),
        field: key.to_string(),
        expected: format!("{expected}, found {}", yaml_type(found)),
    }
}

fn yaml_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
