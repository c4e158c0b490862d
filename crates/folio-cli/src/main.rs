mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Extract page text and tables from PDF, Word, Excel and image files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a document, or every file in a ZIP archive, to JSON
    Extract {
        /// Path to a supported file or a .zip archive
        input_file: PathBuf,

        /// Where to write the JSON array
        #[arg(
            short = 'O',
            long = "out",
            value_name = "FILE",
            default_value = "extracted_data.json"
        )]
        out: PathBuf,

        /// TOML file overriding extraction settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Do not start tesseract; scanned pages get placeholder text
        #[arg(long)]
        ocr_disabled: bool,
    },
    /// Report the detected file type (and digital/scanned for PDFs)
    Classify {
        /// Path to the file
        input_file: PathBuf,
    },
    /// Extract a single document and print a summary
    Inspect {
        /// Path to a supported file
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// TOML file overriding extraction settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input_file,
            out,
            config,
            ocr_disabled,
        } => commands::extract::run(input_file, out, config, ocr_disabled),
        Commands::Classify { input_file } => commands::classify::run(input_file),
        Commands::Inspect {
            input_file,
            output,
            config,
        } => commands::inspect::run(input_file, &output, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
