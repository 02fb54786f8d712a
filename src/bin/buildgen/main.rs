//! buildgen CLI - generate Make or Ninja build files from YAML + Kconfig

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use buildgen::generator::GenerateOptions;
use buildgen::kconfig::Genconfig;
use cli::{Cli, Commands, GenArgs, MenuconfigArgs};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("buildgen=debug")
    } else {
        EnvFilter::new("buildgen=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Gen(args) => gen(args, cli.verbose),
        Commands::Menuconfig(args) => menuconfig(args),
    }
}

fn gen(args: GenArgs, verbose: bool) -> Result<()> {
    let tool = Genconfig::new(
        &args.src_tree,
        args.prj_dir.join("config"),
        Some(args.kconfig),
        args.defconfig,
    );

    let mut opts = GenerateOptions::new(&args.src_tree, &args.prj_dir);
    opts.backend = args.generator.into();
    opts.verbose = verbose;

    buildgen::generate(&opts, &tool)?;
    Ok(())
}

fn menuconfig(args: MenuconfigArgs) -> Result<()> {
    let tool = Genconfig::new(
        &args.src_tree,
        args.prj_dir.join("config"),
        Some(args.kconfig),
        None,
    );
    tool.menuconfig()
}
