//! Tagpress CLI
//!
//! Publishes a tree of tagged documents into static feeds.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for tagpress.
#[derive(Parser)]
#[command(
    name = "tagpress",
    version,
    about = "Publish tagged documents into static feeds"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tagpress.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build every feed into the output directory
    Build {
        /// Output directory (overrides the configuration)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Validate configuration, feeds and content without writing output
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    tagpress::init_tracing(cli.verbose);
    let meta = tagpress::build_meta();

    match cli.command {
        Commands::Build { output } => {
            tagpress::cmd::build::run(&cli.config, output.as_deref(), cli.verbose > 0, meta)?;
        }
        Commands::Check { strict } => {
            tagpress::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}
