use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mbuild_lib::target::TargetError;

mod cmd;
mod output;

use cmd::{ReleaseArgs, UsageError, cmd_info, cmd_release, cmd_version};
use output::print_error;

/// Exit code for invalid arguments or platforms.
const EXIT_USAGE: u8 = 2;

/// mbuild - cross-platform release builder
#[derive(Parser)]
#[command(name = "mbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build, archive and publish every target
  Release(ReleaseArgs),

  /// Print the version a release would use
  Version {
    /// Repository used to derive the version
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show host platform information
  Info {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Release(args) => cmd_release(args),
    Commands::Version { repo, json } => cmd_version(&repo, json),
    Commands::Info { json } => cmd_info(json),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      if err.downcast_ref::<TargetError>().is_some() || err.downcast_ref::<UsageError>().is_some() {
        ExitCode::from(EXIT_USAGE)
      } else {
        ExitCode::FAILURE
      }
    }
  }
}
