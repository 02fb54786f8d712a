//! Backend-agnostic lowering of the registry.
//!
//! An [`EmitPlan`] is the shared intermediate representation both backend
//! emitters render: the ordered entity list with globs expanded, per-source
//! flags resolved and `$(NAME)` command placeholders substituted. The two
//! emitters are pure renderers over the same plan, which is what keeps the
//! Make and Ninja outputs describing the same artifact-level dependency
//! graph.
//!
//! All validation happens here, before any output is written: unresolved
//! application libraries, unknown source languages and bad glob patterns
//! abort the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::entity::{Application, Entity, Library, Target};
use crate::core::registry::Registry;
use crate::core::ConfigError;

/// Source language, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLang {
    C,
    Cpp,
    Asm,
}

impl SourceLang {
    fn from_source(module: &str, source: &str) -> Result<Self, ConfigError> {
        let ext = Path::new(source)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        match ext.as_str() {
            "c" => Ok(SourceLang::C),
            "cc" | "cpp" | "cxx" => Ok(SourceLang::Cpp),
            "s" | "S" | "asm" => Ok(SourceLang::Asm),
            _ => Err(ConfigError::UnknownSourceLang {
                module: module.to_string(),
                src: source.to_string(),
            }),
        }
    }

    /// Compiler reference for Make recipes (make expands these itself).
    pub fn make_compiler(&self) -> &'static str {
        match self {
            SourceLang::C | SourceLang::Asm => "$(CC)",
            SourceLang::Cpp => "$(CXX)",
        }
    }

    /// Concrete compiler for Ninja per-edge `CC` bindings.
    pub fn ninja_compiler(&self) -> &'static str {
        match self {
            SourceLang::C | SourceLang::Asm => "gcc",
            SourceLang::Cpp => "g++",
        }
    }
}

/// One source-to-object compilation.
///
/// Paths are stored relative: `source` to the source tree, `object` to the
/// project directory. Emitters prefix them with their own `SRC_PATH` /
/// `PRJ_PATH` variable references.
#[derive(Debug, Clone)]
pub struct CompileEdge {
    pub module: String,
    pub source: String,
    pub object: String,
    pub lang: SourceLang,
    /// Resolved compile flags, without include directories.
    pub flags: String,
    /// Include directories relative to the source tree.
    pub include_dirs: Vec<String>,
}

impl CompileEdge {
    /// GCC-style dependency file, next to the object.
    pub fn depfile(&self) -> String {
        format!("{}.d", self.object)
    }

    /// Directory holding the object, relative to the project directory.
    pub fn object_dir(&self) -> String {
        Path::new(&self.object)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// A library lowered to its compile edges plus one archive.
#[derive(Debug, Clone)]
pub struct LibraryPlan {
    pub name: String,
    pub desc: String,
    pub compiles: Vec<CompileEdge>,
    /// Archive path relative to the project directory (`libs/libX.a`).
    pub archive: String,
}

/// An application lowered to its compile edges plus one link.
#[derive(Debug, Clone)]
pub struct AppPlan {
    pub name: String,
    pub desc: String,
    pub compiles: Vec<CompileEdge>,
    /// Executable path relative to the project directory (`apps/X`).
    pub output: String,
    /// Library names to link against (`-l` flags).
    pub libs: Vec<String>,
    /// Archive paths of those libraries, relative to the project directory.
    pub archives: Vec<String>,
    pub linkflags: String,
    /// Link with the C++ driver when any source is C++.
    pub use_cxx_linker: bool,
}

/// A custom target: command already substituted, dependencies by name.
#[derive(Debug, Clone)]
pub struct CommandEdge {
    pub name: String,
    pub desc: String,
    pub command: String,
    pub deps: Vec<String>,
}

/// A top-level variable binding.
#[derive(Debug, Clone)]
pub struct VarBinding {
    pub name: String,
    pub value: String,
    pub desc: String,
}

/// The complete backend-agnostic emission plan.
#[derive(Debug, Clone)]
pub struct EmitPlan {
    /// Generator name and version for the header comment.
    pub banner: String,
    /// Generation time for the header comment.
    pub timestamp: String,
    pub vars: Vec<VarBinding>,
    pub libs: Vec<LibraryPlan>,
    pub apps: Vec<AppPlan>,
    pub targets: Vec<CommandEdge>,
}

impl EmitPlan {
    /// Lower a finished registry against the source tree.
    pub fn build(
        registry: &Registry,
        src_tree: &Path,
        banner: String,
        timestamp: String,
    ) -> Result<Self> {
        let mut plan = EmitPlan {
            banner,
            timestamp,
            vars: Vec::new(),
            libs: Vec::new(),
            apps: Vec::new(),
            targets: Vec::new(),
        };

        for entity in registry.iter() {
            match entity {
                Entity::Variable(var) => plan.vars.push(VarBinding {
                    name: var.name.clone(),
                    value: var.value.clone(),
                    desc: var.desc.clone(),
                }),
                Entity::Library(lib) => plan.libs.push(lower_library(lib, src_tree)?),
                Entity::Application(app) => plan.apps.push(lower_application(app, registry)?),
                Entity::Target(target) => plan.targets.push(lower_target(target, registry)),
            }
        }
        Ok(plan)
    }
}

fn lower_library(lib: &Library, src_tree: &Path) -> Result<LibraryPlan> {
    let sources = expand_globs(&lib.name, &lib.sources, src_tree)?;
    if sources.is_empty() {
        tracing::warn!("library `{}` matched no source files", lib.name);
    }

    let compiles = sources
        .iter()
        .map(|source| {
            let lang = SourceLang::from_source(&lib.name, source)?;
            let flags = match lang {
                SourceLang::C => &lib.cflags,
                SourceLang::Cpp => &lib.cppflags,
                SourceLang::Asm => &lib.asmflags,
            };
            Ok(CompileEdge {
                module: lib.name.clone(),
                source: source.clone(),
                object: object_path(&lib.name, source),
                lang,
                flags: flags.clone(),
                include_dirs: lib.header_dirs.clone(),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    check_object_collisions(&lib.name, &compiles)?;

    Ok(LibraryPlan {
        name: lib.name.clone(),
        desc: lib.desc.clone(),
        compiles,
        archive: format!("libs/{}", lib.archive_name()),
    })
}

fn lower_application(app: &Application, registry: &Registry) -> Result<AppPlan> {
    // Reference integrity: every linked library must be registered by now.
    // Checked after the full declaration pass, so later-declared (or
    // gated-in) libraries resolve; a gated-out library does not.
    let mut archives = Vec::with_capacity(app.libs.len());
    for dep in &app.libs {
        match registry.lookup(dep) {
            Some(Entity::Library(lib)) => archives.push(format!("libs/{}", lib.archive_name())),
            _ => {
                return Err(ConfigError::UnresolvedLibrary {
                    app: app.name.clone(),
                    dep: dep.clone(),
                }
                .into())
            }
        }
    }

    let compiles = app
        .sources
        .iter()
        .map(|source| {
            let lang = SourceLang::from_source(&app.name, source)?;
            let flag_map = match lang {
                SourceLang::C => &app.cflags,
                SourceLang::Cpp => &app.cppflags,
                SourceLang::Asm => &app.asmflags,
            };
            Ok(CompileEdge {
                module: app.name.clone(),
                source: source.clone(),
                object: object_path(&app.name, source),
                lang,
                flags: flag_map.resolve(source).to_string(),
                include_dirs: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    check_object_collisions(&app.name, &compiles)?;

    let use_cxx_linker = compiles.iter().any(|c| c.lang == SourceLang::Cpp);

    Ok(AppPlan {
        name: app.name.clone(),
        desc: app.desc.clone(),
        compiles,
        output: format!("apps/{}", app.name),
        libs: app.libs.clone(),
        archives,
        linkflags: app.linkflags.clone(),
        use_cxx_linker,
    })
}

fn lower_target(target: &Target, registry: &Registry) -> CommandEdge {
    CommandEdge {
        name: target.name.clone(),
        desc: target.desc.clone(),
        command: substitute_vars(&target.command, registry),
        deps: target.deps.clone(),
    }
}

/// Replace `$(NAME)` placeholders naming registered variables with their
/// values. Unknown placeholders are left untouched.
pub fn substitute_vars(command: &str, registry: &Registry) -> String {
    let mut result = command.to_string();
    for entity in registry.iter() {
        if let Entity::Variable(var) = entity {
            let placeholder = format!("$({})", var.name);
            if result.contains(&placeholder) {
                result = result.replace(&placeholder, &var.value);
            }
        }
    }
    result
}

/// Same-stem sources in one module map to the same object path; that
/// would produce two build statements for one output.
fn check_object_collisions(module: &str, compiles: &[CompileEdge]) -> Result<(), ConfigError> {
    let mut by_object: HashMap<&str, &str> = HashMap::new();
    for edge in compiles {
        if let Some(first) = by_object.insert(&edge.object, &edge.source) {
            return Err(ConfigError::ObjectCollision {
                module: module.to_string(),
                first: first.to_string(),
                second: edge.source.clone(),
                object: edge.object.clone(),
            });
        }
    }
    Ok(())
}

/// Object path for a source, relative to the project directory:
/// `objs/<module>/<relative source with .o>`.
fn object_path(module: &str, source: &str) -> String {
    let object = PathBuf::from("objs")
        .join(module)
        .join(source)
        .with_extension("o");
    object.to_string_lossy().replace('\\', "/")
}

/// Expand library glob patterns against the source tree, in declaration
/// order, each pattern's matches in the glob crate's alphabetical order.
fn expand_globs(module: &str, patterns: &[String], src_tree: &Path) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    for pattern in patterns {
        let full = src_tree.join(pattern);
        let full = full.to_string_lossy();

        let walker = glob::glob(&full).map_err(|e| ConfigError::BadPattern {
            name: module.to_string(),
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        let mut matched = false;
        for entry in walker {
            let path = entry.with_context(|| format!("failed to read match for `{pattern}`"))?;
            if !path.is_file() {
                continue;
            }
            matched = true;
            let rel = path.strip_prefix(src_tree).unwrap_or(&path);
            sources.push(rel.to_string_lossy().replace('\\', "/"));
        }
        if !matched {
            tracing::warn!("library `{module}`: pattern `{pattern}` matched nothing");
        }
    }
    Ok(sources)
}
