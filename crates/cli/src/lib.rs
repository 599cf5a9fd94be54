mod build;
mod create;
mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "scadwatch",
    version,
    about = "Incremental OpenSCAD builds with deterministic previews",
    long_about = "scadwatch keeps the meshes and preview images of every model under models/ \
                  up to date. Sources are rebuilt only when they are newer than their outputs, \
                  previews are re-encoded into a reproducible PNG form, and models/README.md \
                  indexes every model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold a new dated model directory from a template
    Create {
        /// Long project name, used for the directory and display name
        #[arg(value_name = "LONG_NAME")]
        long_name: Option<String>,
        /// Short name for the source file. Defaults to the long name
        #[arg(value_name = "SHORT_NAME")]
        short_name: Option<String>,
        /// Template under templates/<name>.scad
        #[arg(value_name = "TEMPLATE")]
        template: Option<String>,
        /// Description written into the template
        #[arg(long)]
        description: Option<String>,
        /// Project root. Defaults to the current directory
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },
    /// Build every stale model once and exit non-zero if any failed
    Build {
        /// Project root. Defaults to the current directory
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Build everything, then rebuild models as their sources change
    #[command(
        long_about = "Performs a full build pass, writes the index, then watches models/ and \
                      rebuilds each changed source after a quiet period. Configured through \
                      OPENSCAD_CMD, PREVIEW_IMGSIZE, WATCH_DEBOUNCE_MS, WATCH_POLL_INTERVAL, \
                      WATCH_FORCE_POLL, PREVIEW_DIMENSIONS, BUILD_CONCURRENCY and MESH_DETACHED."
    )]
    Watch {
        /// Project root. Defaults to the current directory
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },
}

fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| PathBuf::from("."))
}

pub fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Create { .. } => "create",
        Commands::Build { .. } => "build",
        Commands::Watch { .. } => "watch",
    };
    let _guard = scadwatch_core::logging::init_logging(component, true);

    match cli.command {
        Commands::Create {
            long_name,
            short_name,
            template,
            description,
            root,
        } => create::run(
            resolve_root(root),
            long_name,
            short_name,
            template,
            description,
        ),
        Commands::Build { root, json } => build::run(resolve_root(root), json),
        Commands::Watch { root } => watch::run(resolve_root(root)),
    }
}
