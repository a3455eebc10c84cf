//! SumatraPDF release CLI
//!
//! Entry point for the `sumatra-release` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;
use sumatra_release::config::{EffectiveConfig, REPO_CONFIG_PATH};
use sumatra_release::layout::BuildLayout;
use sumatra_release::logging::{init_logging, LogConfig};
use sumatra_release::pipeline::{self, Collaborators, Mode, Pipeline, PipelineContext, RunOptions};
use sumatra_release::tasks::{count_lines, format_sources};
use sumatra_release::{Environment, ReleaseConfig, ReleaseError};

#[derive(Parser)]
#[command(name = "sumatra-release")]
#[command(about = "Build, sign, package and publish SumatraPDF pre-releases", version)]
struct Cli {
    /// Repository root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path to repo config file, relative to the root (default: .release/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Use a local directory as the only object store
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quick x64 build with self-tests, nothing published
    Smoke,

    /// Full release build of every variant
    PreRelease {
        /// Publish to the configured stores
        #[arg(long)]
        upload: bool,

        /// Allow uncommitted changes
        #[arg(long)]
        no_clean_check: bool,
    },

    /// Full build on CI, never published
    Ci {
        /// Allow uncommitted changes
        #[arg(long)]
        no_clean_check: bool,
    },

    /// Publish the output of an earlier `ci` run
    CiUpload {
        /// Publish to the configured stores
        #[arg(long)]
        upload: bool,
    },

    /// Delete all but the newest pre-releases
    DeleteOldBuilds {
        /// Log deletes instead of performing them
        #[arg(long)]
        dry_run: bool,

        /// Number of newest versions to keep
        #[arg(long)]
        retain: Option<usize>,
    },

    /// List published pre-release versions
    ListBuilds {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Build and sign MakeLZSA.exe
    BuildLzsa,

    /// Run clang-format over the sources
    Format,

    /// Count source lines
    Wc {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove build outputs
    Clean,

    /// Show the effective configuration
    ShowConfig,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(LogConfig {
        verbose: cli.verbose,
    }) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Cannot determine current directory: {}", e);
                process::exit(1);
            }
        },
    };

    let code = match &cli.command {
        Commands::Smoke => run_mode(&cli, &root, Mode::Smoke, RunOptions::default(), None),
        Commands::PreRelease {
            upload,
            no_clean_check,
        } => run_mode(
            &cli,
            &root,
            Mode::PreRelease,
            RunOptions {
                upload: *upload,
                no_clean_check: *no_clean_check,
                ..Default::default()
            },
            None,
        ),
        Commands::Ci { no_clean_check } => run_mode(
            &cli,
            &root,
            Mode::CiBuild,
            RunOptions {
                no_clean_check: *no_clean_check,
                ..Default::default()
            },
            None,
        ),
        Commands::CiUpload { upload } => run_mode(
            &cli,
            &root,
            Mode::CiUpload,
            RunOptions {
                upload: *upload,
                ..Default::default()
            },
            None,
        ),
        Commands::DeleteOldBuilds { dry_run, retain } => run_mode(
            &cli,
            &root,
            Mode::DeleteOldBuilds,
            RunOptions {
                dry_run_prune: *dry_run,
                ..Default::default()
            },
            retain.map(|n| json!({"publish": {"retain": n}})),
        ),
        Commands::BuildLzsa => run_mode(&cli, &root, Mode::BuildLzsa, RunOptions::default(), None),
        Commands::ListBuilds { json } => list_builds(&cli, &root, *json),
        Commands::Format => format(&cli, &root),
        Commands::Wc { json } => line_count(&cli, &root, *json),
        Commands::Clean => clean(&cli, &root),
        Commands::ShowConfig => show_config(&cli, &root),
    };
    process::exit(code);
}

fn config_path(cli: &Cli, root: &Path) -> PathBuf {
    root.join(cli.config.as_deref().unwrap_or(Path::new(REPO_CONFIG_PATH)))
}

fn load_config(
    cli: &Cli,
    root: &Path,
    overrides: Option<serde_json::Value>,
) -> Result<(EffectiveConfig, ReleaseConfig), ReleaseError> {
    let effective = EffectiveConfig::build(Some(&config_path(cli, root)), overrides)?;
    let config = ReleaseConfig::from_effective(&effective)?;
    Ok((effective, config))
}

fn report(e: &ReleaseError) -> i32 {
    eprintln!("Error: {}", e);
    e.exit_code()
}

fn run_mode(
    cli: &Cli,
    root: &Path,
    mode: Mode,
    options: RunOptions,
    overrides: Option<serde_json::Value>,
) -> i32 {
    let config = match load_config(cli, root, overrides) {
        Ok((_, config)) => config,
        Err(e) => return report(&e),
    };
    let env = Environment::from_process();
    let ctx = PipelineContext::new(root, config, mode, env, options);
    let with_stores = mode.needs_stores(&ctx.upload);

    let tools = match Collaborators::from_config(
        root,
        &ctx.config,
        &ctx.env,
        with_stores,
        cli.store_dir.as_deref(),
    ) {
        Ok(tools) => tools,
        Err(e) => return report(&e.into()),
    };
    let pipeline = match Pipeline::new(ctx, tools) {
        Ok(p) => p,
        Err(e) => return report(&e),
    };

    match pipeline.run() {
        Ok(summary) => {
            if let Some(v) = &summary.versions {
                println!(
                    "{} {} (pre-release {}, revision {})",
                    mode, v.product_version, v.pre_release, v.revision_id
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn list_builds(cli: &Cli, root: &Path, json: bool) -> i32 {
    let config = match load_config(cli, root, None) {
        Ok((_, config)) => config,
        Err(e) => return report(&e),
    };
    let env = Environment::from_process();
    let ctx = PipelineContext::new(root, config, Mode::DeleteOldBuilds, env, RunOptions::default());
    let tools =
        match Collaborators::from_config(root, &ctx.config, &ctx.env, true, cli.store_dir.as_deref()) {
            Ok(tools) => tools,
            Err(e) => return report(&e.into()),
        };
    let listings = match Pipeline::new(ctx, tools).and_then(|p| p.list_builds()) {
        Ok(listings) => listings,
        Err(e) => return report(&e),
    };

    if json {
        match serde_json::to_string_pretty(&listings) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return 1;
            }
        }
        return 0;
    }

    for store in &listings {
        println!("{}: {} versions", store.store, store.listing.groups.len());
        for group in &store.listing.groups {
            let marker = if group.has_manifest() { "" } else { " (incomplete)" };
            println!("  {}{}", group.version, marker);
            for name in group.names() {
                println!("    {}", name);
            }
        }
        for key in &store.listing.unrecognized {
            println!("  ? {}", key);
        }
    }
    0
}

fn format(cli: &Cli, root: &Path) -> i32 {
    let config = match load_config(cli, root, None) {
        Ok((_, config)) => config,
        Err(e) => return report(&e),
    };
    match format_sources(root, &config.source, &config.tools) {
        Ok(n) => {
            println!("Formatted {} files", n);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    }
}

fn line_count(cli: &Cli, root: &Path, json: bool) -> i32 {
    let config = match load_config(cli, root, None) {
        Ok((_, config)) => config,
        Err(e) => return report(&e),
    };
    let counts = match count_lines(root, &config.source) {
        Ok(counts) => counts,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    if json {
        match serde_json::to_string_pretty(&counts) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return 1;
            }
        }
        return 0;
    }

    for (ext, stats) in &counts.by_extension {
        println!("{:>8} {:>6} .{}", stats.lines, stats.files, ext);
    }
    let total = counts.total();
    println!("{:>8} {:>6} total", total.lines, total.files);
    0
}

fn clean(cli: &Cli, root: &Path) -> i32 {
    let config = match load_config(cli, root, None) {
        Ok((_, config)) => config,
        Err(e) => return report(&e),
    };
    match pipeline::clean(&BuildLayout::new(root, &config.paths)) {
        Ok(()) => 0,
        Err(e) => report(&e.into()),
    }
}

fn show_config(cli: &Cli, root: &Path) -> i32 {
    let effective = match load_config(cli, root, None) {
        Ok((effective, _)) => effective,
        Err(e) => return report(&e),
    };
    match effective.to_json() {
        Ok(s) => {
            println!("{}", s);
            0
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            1
        }
    }
}
