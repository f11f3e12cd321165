use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use miette::IntoDiagnostic;
use pgquery::{ParseMode, SplitAlgorithm};

mod commands;
mod config;
mod error;
mod io;

use commands::Session;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "pgquery")]
#[command(about = "Parse, normalize, fingerprint and format PostgreSQL with libpg_query", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./pgquery.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path of the libpg_query shared library
    #[arg(long, global = true, value_name = "PATH")]
    library: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print the parse tree as JSON
    Parse {
        /// SQL file (reads stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Grammar entry point, overriding the configuration
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
        /// Only list the statements with their locations and node tags
        #[arg(short, long)]
        statements: bool,
    },

    /// Replace constants with parameter references
    Normalize {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Normalize utility statements (SET, CREATE, ...)
        #[arg(short, long)]
        utility: bool,
    },

    /// Print the query fingerprint
    Fingerprint {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
        /// Print both the numeric and hex forms as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split a batch into statements
    Split {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Splitting algorithm, overriding the configuration
        #[arg(short, long, value_enum)]
        algorithm: Option<AlgorithmArg>,
        /// Print byte spans as JSON instead of statement text
        #[arg(long)]
        spans: bool,
    },

    /// List scanner tokens
    Scan {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Pretty-print SQL using the [deparse] options
    Format {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// List the comments in the input as JSON
    Comments {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Default,
    TypeName,
    PlpgsqlExpr,
    PlpgsqlAssign1,
    PlpgsqlAssign2,
    PlpgsqlAssign3,
}

impl From<ModeArg> for ParseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => ParseMode::Default,
            ModeArg::TypeName => ParseMode::TypeName,
            ModeArg::PlpgsqlExpr => ParseMode::PlpgsqlExpr,
            ModeArg::PlpgsqlAssign1 => ParseMode::PlpgsqlAssign1,
            ModeArg::PlpgsqlAssign2 => ParseMode::PlpgsqlAssign2,
            ModeArg::PlpgsqlAssign3 => ParseMode::PlpgsqlAssign3,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AlgorithmArg {
    /// Scanner only; fast and tolerant of invalid statements
    Scanner,
    /// Full parser; fails on invalid SQL
    Parser,
}

impl From<AlgorithmArg> for SplitAlgorithm {
    fn from(algorithm: AlgorithmArg) -> Self {
        match algorithm {
            AlgorithmArg::Scanner => SplitAlgorithm::Scanner,
            AlgorithmArg::Parser => SplitAlgorithm::Parser,
        }
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let cwd = std::env::current_dir().into_diagnostic()?;
    let config = Config::load(args.config.as_deref(), &cwd)?;
    let session = Session::open(config, args.library)?;

    match args.command {
        Command::Parse {
            file,
            mode,
            statements,
        } => {
            let input = io::read_input(file)?;
            commands::parse::handle_parse(&session, &input, mode.map(Into::into), statements)?;
        }
        Command::Normalize { file, utility } => {
            let input = io::read_input(file)?;
            commands::normalize::handle_normalize(&session, &input, utility)?;
        }
        Command::Fingerprint { file, mode, json } => {
            let input = io::read_input(file)?;
            commands::fingerprint::handle_fingerprint(&session, &input, mode.map(Into::into), json)?;
        }
        Command::Split {
            file,
            algorithm,
            spans,
        } => {
            let input = io::read_input(file)?;
            commands::split::handle_split(&session, &input, algorithm.map(Into::into), spans)?;
        }
        Command::Scan { file } => {
            let input = io::read_input(file)?;
            commands::scan::handle_scan(&session, &input)?;
        }
        Command::Format { file } => {
            let input = io::read_input(file)?;
            commands::format::handle_format(&session, &input)?;
        }
        Command::Comments { file } => {
            let input = io::read_input(file)?;
            commands::format::handle_comments(&session, &input)?;
        }
    }
    Ok(())
}
