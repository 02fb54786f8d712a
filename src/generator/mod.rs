//! Generation orchestration.
//!
//! One call to [`generate`] is one run: configure, load, gate, register,
//! lower, render, commit. The output file is staged and moved into place
//! only after everything has succeeded, so an error can never leave a
//! partially written build file behind.

pub mod make;
pub mod ninja;
pub mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config;
use crate::core::entity::{Entity, EntityKind, Target, Variable};
use crate::core::registry::Registry;
use crate::kconfig::ConfigTool;
use crate::util;
use self::plan::EmitPlan;

/// The build backend a registry is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Make,
    Ninja,
}

impl Backend {
    /// Name of the emitted build file.
    pub fn filename(&self) -> &'static str {
        match self {
            Backend::Make => "Makefile",
            Backend::Ninja => "build.ninja",
        }
    }
}

/// Options for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Source tree holding the YAML project description.
    pub src_tree: PathBuf,
    /// Project directory receiving the build file and build outputs.
    pub prj_dir: PathBuf,
    pub backend: Backend,
    /// Propagated into the regeneration command of the `config` target.
    pub verbose: bool,
    /// Root YAML document, relative to the source tree.
    pub root_document: String,
}

impl GenerateOptions {
    pub fn new(src_tree: impl Into<PathBuf>, prj_dir: impl Into<PathBuf>) -> Self {
        GenerateOptions {
            src_tree: src_tree.into(),
            prj_dir: prj_dir.into(),
            backend: Backend::default(),
            verbose: false,
            root_document: config::ROOT_DOCUMENT.to_string(),
        }
    }
}

/// Run one full generation and return the path of the emitted build file.
pub fn generate(opts: &GenerateOptions, tool: &dyn ConfigTool) -> Result<PathBuf> {
    tool.generate().context("configuration pass failed")?;
    let gate = tool.enabled_symbols()?;
    tracing::info!("{} option symbol(s) enabled", gate.len());

    let declarations = config::load(&opts.src_tree, &opts.root_document)?;

    let mut registry = Registry::new();
    register_system_variables(&mut registry, opts)?;

    tracing::info!("processing {} declaration(s)", declarations.len());
    config::populate(&mut registry, &declarations, &gate)?;
    register_system_targets(&mut registry, opts)?;

    let emit_plan = EmitPlan::build(&registry, &opts.src_tree, banner(), timestamp())?;
    let text = match opts.backend {
        Backend::Make => make::render(&emit_plan),
        Backend::Ninja => ninja::render(&emit_plan),
    };

    let output = opts.prj_dir.join(opts.backend.filename());
    util::fs::write_atomic(&output, &text)?;
    tracing::info!("generated {}", output.display());
    Ok(output)
}

fn banner() -> String {
    format!("buildgen {}", env!("CARGO_PKG_VERSION"))
}

fn timestamp() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Built-in variables, registered before the declaration pass so user
/// declarations cannot shadow them.
fn register_system_variables(registry: &mut Registry, opts: &GenerateOptions) -> Result<()> {
    tracing::debug!("creating system variables");
    let vars = [
        ("SRC_PATH", path_value(&opts.src_tree), "source code path"),
        ("PRJ_PATH", path_value(&opts.prj_dir), "project path"),
        (
            "KCONFIG_CONFIG",
            path_value(&opts.prj_dir),
            "Kconfig output path",
        ),
    ];
    for (name, value, desc) in vars {
        registry.register(Entity::Variable(Variable::new(name, value, desc)))?;
    }
    Ok(())
}

/// System targets, appended after the declaration pass through the normal
/// registration path (the reserved-name check in the declaration pass
/// keeps their names free).
fn register_system_targets(registry: &mut Registry, opts: &GenerateOptions) -> Result<()> {
    tracing::debug!("creating system targets");

    let mut config_cmd = "buildgen gen $(SRC_PATH) $(PRJ_PATH)".to_string();
    if opts.backend == Backend::Ninja {
        config_cmd.push_str(" -g ninja");
    }
    if opts.verbose {
        config_cmd.push_str(" -V");
    }
    registry.register(Entity::Target(Target::new(
        "config",
        "configure project and generate header and mk",
        config_cmd,
        vec![],
    )))?;

    // Library names first, then application names, both in registration
    // order. Concatenation, never a merge or sort.
    let mut all_deps: Vec<String> = registry
        .names_of_kind(EntityKind::Library)
        .into_iter()
        .map(str::to_string)
        .collect();
    all_deps.extend(
        registry
            .names_of_kind(EntityKind::Application)
            .into_iter()
            .map(str::to_string),
    );
    registry.register(Entity::Target(Target::new(
        "all",
        "Build all applications and libraries",
        "",
        all_deps,
    )))?;

    registry.register(Entity::Target(Target::new(
        "clean",
        "Clean all generated files",
        "rm -rf $(PRJ_PATH)/objs $(PRJ_PATH)/libs $(PRJ_PATH)/apps",
        vec![],
    )))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kconfig::OptionSet;
    use std::fs;
    use tempfile::TempDir;

    struct FakeTool {
        symbols: Vec<&'static str>,
    }

    impl ConfigTool for FakeTool {
        fn generate(&self) -> Result<()> {
            Ok(())
        }

        fn enabled_symbols(&self) -> Result<OptionSet> {
            Ok(self.symbols.iter().copied().collect())
        }
    }

    fn project(yaml: &str, files: &[&str]) -> (TempDir, TempDir) {
        let src = TempDir::new().unwrap();
        let prj = TempDir::new().unwrap();
        fs::write(src.path().join("top.yml"), yaml).unwrap();
        for file in files {
            let path = src.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        (src, prj)
    }

    fn strip_timestamp(text: &str) -> String {
        text.lines()
            .filter(|line| !line.starts_with("# Generated by"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_all_target_concatenates_libs_then_apps() {
        let mut registry = Registry::new();
        let opts = GenerateOptions::new("/src", "/prj");
        register_system_variables(&mut registry, &opts).unwrap();

        let decls: serde_yaml::Mapping = serde_yaml::from_str(
            "b:\n  type: app\n  src: [b.c]\nm:\n  type: lib\n  src: [m.c]\nz:\n  type: lib\n  src: [z.c]\n",
        )
        .unwrap();
        config::populate(&mut registry, &decls, &OptionSet::new()).unwrap();
        register_system_targets(&mut registry, &opts).unwrap();

        match registry.lookup("all").unwrap() {
            Entity::Target(t) => {
                // L + A entries: libraries first, each side in
                // registration order.
                assert_eq!(t.deps, vec!["m", "z", "b"]);
            }
            other => panic!("expected target, got {other:?}"),
        }
        assert!(registry.lookup("config").is_some());
        assert!(registry.lookup("clean").is_some());
    }

    #[test]
    fn test_config_command_reflects_backend_and_verbosity() {
        let mut opts = GenerateOptions::new("/src", "/prj");
        opts.backend = Backend::Ninja;
        opts.verbose = true;

        let mut registry = Registry::new();
        register_system_variables(&mut registry, &opts).unwrap();
        register_system_targets(&mut registry, &opts).unwrap();

        match registry.lookup("config").unwrap() {
            Entity::Target(t) => {
                assert_eq!(t.command, "buildgen gen $(SRC_PATH) $(PRJ_PATH) -g ninja -V");
            }
            other => panic!("expected target, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_is_idempotent_modulo_timestamp() {
        let (src, prj) = project(
            "m:\n  type: lib\n  src: ['*.c']\n",
            &["a.c", "b.c"],
        );
        let opts = GenerateOptions::new(src.path(), prj.path());
        let tool = FakeTool { symbols: vec![] };

        let first = generate(&opts, &tool).unwrap();
        let first_text = fs::read_to_string(&first).unwrap();
        let second = generate(&opts, &tool).unwrap();
        let second_text = fs::read_to_string(&second).unwrap();

        assert_eq!(strip_timestamp(&first_text), strip_timestamp(&second_text));
    }

    #[test]
    fn test_failed_run_leaves_previous_output_in_place() {
        let (src, prj) = project("b:\n  type: app\n  src: [b.c]\n  libs: [missing]\n", &[]);
        let makefile = prj.path().join("Makefile");
        fs::write(&makefile, "previous valid output\n").unwrap();

        let opts = GenerateOptions::new(src.path(), prj.path());
        let tool = FakeTool { symbols: vec![] };
        assert!(generate(&opts, &tool).is_err());

        // Validation failed after the old file existed: it must survive
        // untouched.
        assert_eq!(
            fs::read_to_string(&makefile).unwrap(),
            "previous valid output\n"
        );
    }

    #[test]
    fn test_backend_filenames() {
        assert_eq!(Backend::Make.filename(), "Makefile");
        assert_eq!(Backend::Ninja.filename(), "build.ninja");
    }

    #[test]
    fn test_system_variables_resist_shadowing() {
        let (src, prj) = project("SRC_PATH:\n  type: var\n  val: /elsewhere\n", &[]);
        let opts = GenerateOptions::new(src.path(), prj.path());
        let tool = FakeTool { symbols: vec![] };

        let err = generate(&opts, &tool).unwrap_err();
        let config = err.downcast_ref::<crate::core::ConfigError>().unwrap();
        assert!(matches!(config, crate::core::ConfigError::DuplicateName(_)));
    }
}
