// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scantron — grade photographed OMR answer sheets.
//
// Entry point. Initialises logging, parses the command line and dispatches to
// the subcommands in `commands`.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use scantron_core::human_errors::humanize_error;

#[derive(Parser)]
#[command(name = "scantron")]
#[command(about = "Rectify photographed answer sheets and read the filled bubbles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more card images and print a JSON report.
    Grade {
        /// Card images (JPEG, PNG, TIFF, ...); `-` reads one from stdin.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Grader configuration (JSON). Defaults apply when omitted.
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Write the report here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Worker threads for batch grading (default: one per core).
        #[arg(long, short)]
        jobs: Option<usize>,
    },

    /// Flatten one card image onto the canonical frame and save it.
    Rectify {
        /// Photo of the card; `-` reads it from stdin.
        image: PathBuf,

        /// Where to write the rectified image; format follows the extension,
        /// `-` writes PNG to stdout.
        #[arg(long, short)]
        output: PathBuf,

        /// Grader configuration (JSON); only the rectification part is used.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration, or write it to a file.
    Config {
        /// Write the configuration here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so that JSON on stdout stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            images,
            config,
            output,
            jobs,
        } => commands::load_config(config.as_deref())
            .and_then(|config| commands::grade(&images, config, jobs))
            .and_then(|batch| commands::write_json(&batch, output.as_deref())),
        Commands::Rectify {
            image,
            output,
            config,
        } => commands::load_config(config.as_deref())
            .and_then(|config| commands::rectify(&image, &output, config))
            .map(|_| ()),
        Commands::Config { output } => commands::write_default_config(output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "scantron failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}
