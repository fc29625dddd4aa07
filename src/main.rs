//! @ai:module:intent CLI entry point for the SCATR test runner
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on runner, marvin, output

use clap::{Parser, Subcommand, ValueEnum};
use scatr::{marvin, output, Error, OutputFormat, RunOptions, Runner};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scatr")]
#[command(author, version, about = "SCATR - Static Code Analysis Testing Runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checks and autofix tests of a directory
    Run {
        /// Directory holding .scatr.toml
        #[arg(long, short = 'c', default_value = ".")]
        cwd: PathBuf,

        /// Pretty print the output
        #[arg(long, short)]
        pretty: bool,

        /// Output format, overrides --pretty
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Use verbose logging
        #[arg(long, short)]
        verbose: bool,

        /// Only test these files, relative to the code path
        #[arg(long, short)]
        files: Vec<PathBuf>,

        /// Write autofixed files here instead of fixing in place
        #[arg(long, short)]
        autofix_dir: Option<PathBuf>,
    },

    /// Convert a marvin-style result, read from $INPUT_FILE, into a SCATR result
    ProcessMarvinResult {
        /// Use verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Print version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Plain,
    Pretty,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Plain => OutputFormat::Plain,
            Format::Pretty => OutputFormat::Pretty,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "scatr=debug" } else { "scatr=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            cwd,
            pretty,
            format,
            verbose,
            files,
            autofix_dir,
        } => {
            init_tracing(verbose);

            let format = match format {
                Some(format) => format.into(),
                None if pretty || std::io::stdout().is_terminal() => OutputFormat::Pretty,
                None => OutputFormat::Plain,
            };

            let options = RunOptions {
                cwd,
                files,
                autofix_dir,
            };

            let runner = match Runner::new(&options.cwd) {
                Ok(runner) => runner,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            };

            match runner.execute(&options) {
                Ok(report) => {
                    print!("{}", output::format_run_report(&report, format, runner.root()));
                    if report.passed {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    }
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        Commands::ProcessMarvinResult { verbose } => {
            init_tracing(verbose);

            let result = std::env::var_os("INPUT_FILE")
                .filter(|input| !input.is_empty())
                .ok_or(Error::MissingEnv("INPUT_FILE"))
                .and_then(|input| marvin::process_marvin_result(&PathBuf::from(input)))
                .and_then(|result| Ok(serde_json::to_string(&result)?));

            match result {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Version => {
            println!(
                "scatr {} {}/{}",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            );
            ExitCode::SUCCESS
        }
    }
}
