use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use exectest::commands::run::{self, OutputFormat, RunOptions};
use exectest::commands::statuses;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `exectest=debug`)
const LOG_ENV: &str = "EXECTEST_LOG";

#[derive(Parser)]
#[command(name = "exectest")]
#[command(
    about = "Run a test program with a timeout and report a normalized verdict",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one test program and print its result
    Run {
        /// Test name used in logs (defaults to the program name)
        #[arg(short, long)]
        name: Option<String>,

        /// Kill the test and its children after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Harness configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run the test under the configured diagnostic wrapper
        #[arg(long)]
        wrapper: bool,

        /// Retry once when stdout shows the spurious-artifact marker
        #[arg(long)]
        retry_on_artifact: bool,

        /// Extra environment variable for the test (KEY=VALUE, repeatable)
        #[arg(short, long = "env", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Working directory for the test
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Output format for the result
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Test program and its arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// List result statuses in severity order
    Statuses,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Human,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Human => OutputFormat::Human,
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Run {
            name,
            timeout,
            config,
            wrapper,
            retry_on_artifact,
            env,
            cwd,
            format,
            command,
        } => {
            let result = run::execute(RunOptions {
                name,
                command,
                timeout_secs: timeout,
                config_path: config,
                wrapper,
                retry_on_artifact,
                env,
                cwd,
                format: format.into(),
            })?;
            std::process::exit(run::exit_code(result.status));
        }
        Commands::Statuses => statuses::execute(),
    }
}
