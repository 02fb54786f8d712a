//! Project description loading.
//!
//! The project is described by a root YAML document (`top.yml` by default)
//! plus any documents it names in an `includes` list, recursively. All
//! documents are merged into one ordered `name -> declaration` mapping.
//! Later-loaded keys override earlier values but keep the position of the
//! first occurrence, so declaration order stays stable under overrides.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value};

/// Default name of the root document, relative to the source tree.
pub const ROOT_DOCUMENT: &str = "top.yml";

const INCLUDES_KEY: &str = "includes";

/// Load and merge the project description rooted at `src_tree/<root>`.
pub fn load(src_tree: &Path, root: &str) -> Result<Mapping> {
    let mut merged = Mapping::new();
    let mut visited = HashSet::new();
    load_document(src_tree, root, &mut merged, &mut visited)?;
    Ok(merged)
}

fn load_document(
    src_tree: &Path,
    name: &str,
    merged: &mut Mapping,
    visited: &mut HashSet<PathBuf>,
) -> Result<()> {
    let path = src_tree.join(name);
    if !path.is_file() {
        bail!("project description {} does not exist", path.display());
    }

    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    if !visited.insert(canonical) {
        // Already merged; also breaks include cycles.
        return Ok(());
    }

    tracing::debug!("loading {}", path.display());
    let contents = crate::util::fs::read_to_string(&path)?;
    let document: Value = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let mapping = match document {
        Value::Mapping(m) => m,
        Value::Null => bail!("{} is empty", path.display()),
        _ => bail!("{} must be a mapping of declarations", path.display()),
    };

    let mut includes = Vec::new();
    for (key, value) in mapping {
        if key.as_str() == Some(INCLUDES_KEY) {
            includes = include_list(&path, value)?;
            continue;
        }
        merged.insert(key, value);
    }

    for include in includes {
        load_document(src_tree, &include, merged, visited)?;
    }
    Ok(())
}

fn include_list(path: &Path, value: Value) -> Result<Vec<String>> {
    let items = match value {
        Value::Sequence(items) => items,
        Value::Null => return Ok(Vec::new()),
        _ => bail!("{}: `includes` must be a list of file names", path.display()),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => bail!(
                "{}: `includes` entries must be strings, found {:?}",
                path.display(),
                other
            ),
        })
        .collect()
}
