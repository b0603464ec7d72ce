mod commands;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use commands::{cmd_parse, cmd_symbols, cmd_tokens};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Parse Octave source files and print their syntax trees.
#[derive(Parser)]
#[command(
    name = "octave-parse",
    version,
    about = "Parse Octave source files and print their syntax trees"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print its syntax tree as an S-expression
    Parse {
        /// Path to the source file
        file: PathBuf,
        /// Include anonymous tokens (keywords and punctuation)
        #[arg(long)]
        all: bool,
    },

    /// Print the token stream of a file
    Tokens {
        /// Path to the source file
        file: PathBuf,
    },

    /// Print the grammar symbol table
    Symbols,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, all } => {
            cmd_parse(&file, all, cli.output, cli.quiet);
        }
        Commands::Tokens { file } => {
            cmd_tokens(&file, cli.output, cli.quiet);
        }
        Commands::Symbols => {
            cmd_symbols(cli.output);
        }
    }
}

/// Read a source file, or report the failure and exit 1.
pub(crate) fn read_source(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
