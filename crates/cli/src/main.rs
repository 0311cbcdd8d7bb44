mod commands;
mod config;
mod logging;
mod report;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Settings every command needs, resolved from flags and config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub output: OutputFormat,
    pub pretty: bool,
    pub quiet: bool,
}

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_ERROR: i32 = 1;
pub(crate) const EXIT_INVALID: i32 = 2;

/// Receipt consistency checker and editor.
#[derive(Parser)]
#[command(name = "tally", version, about = "Receipt consistency checker and editor")]
struct Cli {
    /// Output format (text or json); overrides the config file
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a tally.toml config file (default: ./tally.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a receipt's arithmetic and field values
    Check {
        /// Path to the receipt JSON file
        file: PathBuf,
    },

    /// Apply edits through the receipt form and print the settled receipt
    ///
    /// Edits run in this order: --set (paths address the input file), then
    /// --remove, then the row additions (each new row goes first in its list).
    Edit {
        /// Path to the receipt JSON file
        file: PathBuf,
        /// Set a field from user input, e.g. positions.0.quantity=3
        #[arg(long = "set", value_name = "PATH=INPUT")]
        set: Vec<String>,
        /// Add a position
        #[arg(long = "add-position", value_name = "NAME:QTY:PRICE[:OVERALL]")]
        add_position: Vec<String>,
        /// Add a fee
        #[arg(long = "add-fee", value_name = "NAME:VALUE")]
        add_fee: Vec<String>,
        /// Add a discount
        #[arg(long = "add-discount", value_name = "NAME:VALUE")]
        add_discount: Vec<String>,
        /// Remove a row, e.g. fees:0
        #[arg(long = "remove", value_name = "LIST:INDEX")]
        remove: Vec<String>,
        /// Write the settled receipt JSON to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Move a receipt from review to confirmation
    Proceed {
        /// Path to the receipt JSON file
        file: PathBuf,
        /// Write the confirmed receipt JSON to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(msg) => {
            let ctx = Context {
                output: cli.output.unwrap_or(OutputFormat::Text),
                pretty: true,
                quiet: cli.quiet,
            };
            report_error(&msg, &ctx);
            process::exit(EXIT_ERROR);
        }
    };
    logging::init(&config, cli.quiet);

    let ctx = Context {
        output: config.output_format(cli.output),
        pretty: config.pretty(),
        quiet: cli.quiet,
    };

    let code = match cli.command {
        Commands::Check { file } => commands::check::cmd_check(&file, &ctx),
        Commands::Edit {
            file,
            set,
            add_position,
            add_fee,
            add_discount,
            remove,
            out,
        } => commands::edit::cmd_edit(
            &file,
            &commands::edit::Edits {
                set,
                add_position,
                add_fee,
                add_discount,
                remove,
            },
            out.as_deref(),
            &ctx,
        ),
        Commands::Proceed { file, out } => {
            commands::proceed::cmd_proceed(&file, out.as_deref(), &ctx)
        }
    };
    process::exit(code);
}

pub(crate) fn report_error(msg: &str, ctx: &Context) {
    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
