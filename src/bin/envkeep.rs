use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use clap::{ArgAction, Parser, Subcommand};
use envkeep::{EnvStore, Error, ParseMode, SaveFormat};
use tracing_subscriber::EnvFilter;

/// Read, override and persist `.env` files.
#[derive(Debug, Parser)]
#[command(name = "envkeep", version, about)]
struct Cli {
    /// Backing file.
    #[arg(short, long, env = "ENVKEEP_FILE", default_value = ".env", global = true)]
    file: PathBuf,

    /// Fail on lines without `=` or with an empty key.
    #[arg(long, global = true)]
    strict: bool,

    /// Save entries back to back without newlines.
    #[arg(long, global = true)]
    concatenated: bool,

    /// Log to stderr (-v debug, -vv trace). `ENVKEEP_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Print the value of KEY (empty when absent).
    Get { key: String },
    /// Set KEY to VALUE and save the file.
    Set {
        key: String,
        value: String,
        /// Only validate and apply in memory; leave the file as it is.
        #[arg(long)]
        no_save: bool,
    },
    /// Print every entry as KEY=VALUE.
    List,
    /// Run COMMAND with the loaded variables in its environment.
    Run {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<OsString>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("envkeep: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "envkeep=debug",
        _ => "envkeep=trace",
    };
    let filter =
        EnvFilter::try_from_env("ENVKEEP_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_store(cli: &Cli) -> EnvStore {
    let parse_mode = if cli.strict {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    };
    let save_format = if cli.concatenated {
        SaveFormat::Concatenated
    } else {
        SaveFormat::LineSeparated
    };

    EnvStore::new()
        .path(&cli.file)
        .parse_mode(parse_mode)
        .save_format(save_format)
}

fn execute(cli: Cli) -> Result<ExitCode, Error> {
    let store = build_store(&cli);
    store.load()?;

    match cli.command {
        Cmd::Get { key } => {
            println!("{}", store.get(&key));
        }
        Cmd::Set {
            key,
            value,
            no_save,
        } => {
            store.set(&key, &value)?;
            if !no_save {
                store.save()?;
            }
        }
        Cmd::List => {
            for (key, value) in store.snapshot() {
                println!("{key}={value}");
            }
        }
        Cmd::Run { command } => return Ok(run_command(&store, command)),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_command(store: &EnvStore, command: Vec<OsString>) -> ExitCode {
    let Some((program, args)) = command.split_first() else {
        eprintln!("envkeep: missing command after `run`");
        return ExitCode::FAILURE;
    };

    let mut child = Command::new(program);
    child.args(args);
    // Only what made it into the mirror; rejected keys would make spawn fail.
    child.envs(store.mirror_snapshot().unwrap_or_default());

    match execute_command(child) {
        Ok(code) => code,
        Err(err) => {
            eprintln!(
                "envkeep: failed to execute `{}`: {err}",
                program.to_string_lossy()
            );
            ExitCode::FAILURE
        }
    }
}

#[cfg(unix)]
fn execute_command(mut command: Command) -> std::io::Result<ExitCode> {
    Err(command.exec())
}

#[cfg(not(unix))]
fn execute_command(mut command: Command) -> std::io::Result<ExitCode> {
    let status = command.status()?;
    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
