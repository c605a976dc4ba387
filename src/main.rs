use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use fuser::config::{LOG_ENV, Settings};
use fuser::diagnostics::{FuserError, render_error};

#[derive(Parser)]
#[command(name = "fuser", version, about = "Inspect and check fusion IR")]
struct Cli {
    /// Path to fuser.toml (defaults to ./fuser.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fusion file with the IR printer
    Print {
        /// Fusion file path (JSON)
        file: PathBuf,
    },
    /// Run the identity rewrite over a fusion file and report its kind census
    Check {
        /// Fusion file path (JSON)
        file: PathBuf,
    },
}

fn load_settings(explicit: Option<&Path>) -> Result<Settings, FuserError> {
    match explicit {
        Some(path) => Settings::load(path),
        None => {
            let default = Path::new("fuser.toml");
            if default.is_file() { Settings::load(default) } else { Ok(Settings::default()) }
        }
    }
}

/// An unparsable filter is a config error pointing at where it came from:
/// the `FUSER_LOG` variable or the config file.
fn init_logging(settings: &Settings, config: &Path) -> Result<(), FuserError> {
    let directive = settings.log_filter();
    let filter = EnvFilter::try_new(&directive).map_err(|e| {
        let origin = match std::env::var_os(LOG_ENV) {
            Some(_) => PathBuf::from(format!("${LOG_ENV}")),
            None => config.to_path_buf(),
        };
        FuserError::config(format!("invalid log filter `{directive}`: {e}"), origin)
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(cli: Cli) -> Result<(), FuserError> {
    let settings = load_settings(cli.config.as_deref())?;
    let config = cli.config.as_deref().unwrap_or(Path::new("fuser.toml"));
    init_logging(&settings, config)?;

    match cli.command {
        Commands::Print { file } => {
            print!("{}", fuser::print_file(&file, &settings)?);
        }
        Commands::Check { file } => {
            let fusion = fuser::load_fusion(&file)?;
            let census = fuser::check_fusion(&fusion)?;
            tracing::info!(file = %file.display(), statements = fusion.len(), "identity rewrite preserved the fusion");
            print!("{}", fuser::format_census(&census));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{}", render_error(&err));
        std::process::exit(1);
    }
}
