use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use sluice_core::{Config, Encoding, Level, LoggerBuilder};
use sluice_utils::{debug, init_diagnostics};

/// Pipe text through a bounded, leveled logging pipeline.
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version)]
#[command(about = "Pipe text through a bounded, leveled logging pipeline", long_about = None)]
struct Cli
{
    /// Configuration file (TOML); `config.<mode>.toml` next to it is merged on top
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the configured level (beats SLUICE_LOG_LEVEL)
    #[arg(short, long, global = true)]
    level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the resolved configuration and exit
    Check,
    /// Log every line read from stdin, then drain and exit on EOF
    Pipe
    {
        /// Scope name attached to every event
        #[arg(long)]
        scope: Option<String>,
        /// Severity to log each line at
        #[arg(long = "as", value_name = "LEVEL", default_value_t = Level::Info)]
        severity: Level,
    },
}

fn main()
{
    let cli = Cli::parse();

    // Diagnostics go to stderr (or SLUICE_DIAG_FILE); RUST_LOG overrides the level
    let _diagnostics = match init_diagnostics(Level::Warn) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize diagnostics: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let config = resolve_config(cli.config, cli.level, |key| std::env::var(key).ok())?;

    match cli.command {
        Commands::Check => {
            println!("mode:     {}", config.mode);
            println!("level:    {}", config.level()?);
            println!("encoding: {:?}", Encoding::from(config.mode));
            Ok(())
        }
        Commands::Pipe { scope, severity } => {
            let root = LoggerBuilder::new(config).init()?;
            let logger = match scope {
                Some(name) => root.with_scope(name),
                None => root,
            };
            debug!(level = %logger.level(), %severity, "piping stdin");

            let mut lines = 0u64;
            for line in io::stdin().lock().lines() {
                let line = line?;
                logger.log(severity, "{}", None, &[&line])?;
                lines += 1;
            }

            debug!(lines, "stdin closed, draining");
            logger.close()?;
            Ok(())
        }
    }
}

/// Load the file (if any), apply environment overrides, then the CLI level.
fn resolve_config<F>(path: Option<PathBuf>, level: Option<String>, lookup: F) -> Result<Config, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_overrides(lookup)?;
    if let Some(level) = level {
        config.logger.level = level;
    }
    // Fail here rather than at logger init so `check` reports bad levels too
    config.level()?;
    Ok(config)
}
