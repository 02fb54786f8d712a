//! Kconfig integration: the option gate and the external configuration
//! tool.
//!
//! The gate decides whether a declaration is part of the build graph. Its
//! predicate source is the set of symbols enabled by a Kconfig pass
//! (`CONFIG_<NAME>=y` lines in the generated `config.mk`). The Kconfig
//! tools themselves run as subprocesses behind the [`ConfigTool`] trait so
//! the core can be exercised with a fake implementation in tests.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};
use regex::Regex;
use thiserror::Error;

/// Errors evaluating a declaration's `opt` field.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("declaration `{name}`: `opt` must be a string, found {found}")]
    NotAString { name: String, found: String },
}

/// The set of enabled option symbols, used as a membership predicate.
///
/// Symbol names are stored without the `CONFIG_` prefix.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    symbols: BTreeSet<String>,
}

impl OptionSet {
    pub fn new() -> Self {
        OptionSet::default()
    }

    /// Is a declaration with this `opt` value part of the build graph?
    ///
    /// The empty string always gates in; any other value gates in iff it
    /// names an enabled symbol.
    pub fn included(&self, opt: &str) -> bool {
        opt.is_empty() || self.symbols.contains(opt)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for OptionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        OptionSet {
            symbols: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// The external configuration collaborator.
///
/// This is a process boundary, not an in-core dependency: the core only
/// needs "produce the config files" and "which symbols are enabled".
pub trait ConfigTool {
    /// Run the configuration pass, producing `config.h` and `config.mk`.
    fn generate(&self) -> Result<()>;

    /// The enabled symbols from the last configuration pass.
    fn enabled_symbols(&self) -> Result<OptionSet>;
}

/// Subprocess-backed [`ConfigTool`] driving the kconfiglib command-line
/// tools (`genconfig`, `menuconfig`).
#[derive(Debug)]
pub struct Genconfig {
    src_tree: PathBuf,
    kconfig_root: String,
    defconfig: Option<PathBuf>,
    config_dir: PathBuf,
}

impl Genconfig {
    /// `config_dir` is where `config.h` and `config.mk` are written,
    /// conventionally `<project>/config`.
    pub fn new(
        src_tree: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
        kconfig_root: Option<String>,
        defconfig: Option<PathBuf>,
    ) -> Self {
        Genconfig {
            src_tree: src_tree.into(),
            kconfig_root: kconfig_root.unwrap_or_else(|| "Kconfig".to_string()),
            defconfig,
            config_dir: config_dir.into(),
        }
    }

    fn config_mk(&self) -> PathBuf {
        self.config_dir.join("config.mk")
    }

    fn config_h(&self) -> PathBuf {
        self.config_dir.join("config.h")
    }

    fn run_genconfig(&self) -> Result<()> {
        let mut cmd = Command::new("genconfig");
        cmd.arg("--header-path")
            .arg(self.config_h())
            .arg("--config-out")
            .arg(self.config_mk())
            .arg(&self.kconfig_root)
            .env("srctree", &self.src_tree)
            .current_dir(&self.src_tree);

        // The defconfig seed rides on the subprocess environment only,
        // never on our own.
        match &self.defconfig {
            Some(defconfig) => {
                cmd.env("KCONFIG_CONFIG", defconfig);
            }
            None => {
                cmd.env_remove("KCONFIG_CONFIG");
            }
        }

        let status = cmd
            .status()
            .context("failed to run `genconfig` (is kconfiglib installed?)")?;

        if !status.success() {
            bail!("genconfig failed with {status}");
        }
        Ok(())
    }

    /// Run interactive `menuconfig` against an existing project config,
    /// then regenerate `config.h` and `config.mk`.
    pub fn menuconfig(&self) -> Result<()> {
        let config_mk = self.config_mk();
        if !config_mk.is_file() {
            bail!(
                "menuconfig can only be used after the project is configured ({} is missing)",
                config_mk.display()
            );
        }

        tracing::info!("set KCONFIG_CONFIG to {}", config_mk.display());
        let status = Command::new("menuconfig")
            .arg(&self.kconfig_root)
            .env("srctree", &self.src_tree)
            .env("KCONFIG_CONFIG", &config_mk)
            .current_dir(&self.src_tree)
            .status()
            .context("failed to run `menuconfig` (is kconfiglib installed?)")?;

        if !status.success() {
            bail!("menuconfig failed with {status}");
        }

        self.generate()
    }
}

impl ConfigTool for Genconfig {
    fn generate(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "failed to create config directory {}",
                self.config_dir.display()
            )
        })?;

        // A defconfig, when given, seeds the pass through the standard
        // KCONFIG_CONFIG environment switch of the genconfig subprocess.
        if let Some(defconfig) = &self.defconfig {
            if !defconfig.is_file() {
                bail!("defconfig {} does not exist", defconfig.display());
            }
            tracing::info!("seeding configuration from {}", defconfig.display());
        }

        tracing::info!(
            "generating {} and {}",
            self.config_h().display(),
            self.config_mk().display()
        );
        self.run_genconfig()
    }

    fn enabled_symbols(&self) -> Result<OptionSet> {
        let config_mk = self.config_mk();
        let contents = std::fs::read_to_string(&config_mk)
            .with_context(|| format!("failed to read {}", config_mk.display()))?;
        Ok(parse_config_mk(&contents))
    }
}

/// Extract enabled symbols from `config.mk` contents.
///
/// Only boolean `CONFIG_<NAME>=y` lines contribute; string and numeric
/// symbols are not valid gates.
pub fn parse_config_mk(contents: &str) -> OptionSet {
    // Unwrap is fine: the pattern is a compile-time constant.
    let pattern = Regex::new(r"^CONFIG_(\w+)=y$").unwrap();

    contents
        .lines()
        .filter_map(|line| pattern.captures(line.trim_end()))
        .map(|caps| {
            let symbol = caps[1].to_string();
            tracing::debug!("enabled option: {symbol}");
            symbol
        })
        .collect()
}
