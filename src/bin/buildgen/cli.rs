//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use buildgen::Backend;

/// buildgen - a Kconfig-gated build file generator for C projects
#[derive(Parser)]
#[command(name = "buildgen")]
#[command(author, version, about, long_about = None)]
// `-V` means verbose here; the auto `-V/--version` flag would collide.
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure the project and generate a build file
    Gen(GenArgs),

    /// Reconfigure an existing project interactively
    Menuconfig(MenuconfigArgs),
}

#[derive(Args)]
pub struct GenArgs {
    /// Source tree containing top.yml and the Kconfig root
    pub src_tree: PathBuf,

    /// Project directory receiving the build file
    pub prj_dir: PathBuf,

    /// Build backend to emit
    #[arg(short = 'g', long = "generator", value_enum, default_value_t = BackendArg::Make)]
    pub generator: BackendArg,

    /// Seed the configuration pass from a defconfig file
    #[arg(short = 'd', long)]
    pub defconfig: Option<PathBuf>,

    /// Kconfig root file, relative to the source tree
    #[arg(long, default_value = "Kconfig")]
    pub kconfig: String,
}

#[derive(Args)]
pub struct MenuconfigArgs {
    /// Source tree containing the Kconfig root
    pub src_tree: PathBuf,

    /// Project directory holding the existing configuration
    pub prj_dir: PathBuf,

    /// Kconfig root file, relative to the source tree
    #[arg(long, default_value = "Kconfig")]
    pub kconfig: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Make,
    Ninja,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Make => Backend::Make,
            BackendArg::Ninja => Backend::Ninja,
        }
    }
}
