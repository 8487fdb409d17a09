//! Command-line interface.
//!
//! - `serve` (default): run the web UI
//! - `extract FILE`: print the text extracted from a local PDF

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::media::PdfExtractor;

#[derive(Parser, Debug)]
#[command(name = "pdf-learning-assistant")]
#[command(about = "Turn a PDF into a multiple-choice quiz and explain what you got wrong")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the web UI (default if no subcommand given)
    Serve {
        /// Address to listen on, overrides QUIZ_BIND_ADDR
        #[arg(long, env = "QUIZ_BIND_ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Print the text extracted from a PDF, as the model would see it
    Extract {
        /// Path to the PDF file
        file: PathBuf,
    },
}

impl Cli {
    /// The subcommand to run, defaulting to `serve`.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Serve { bind: None })
    }
}

/// Run `extract`: print the document text to stdout.
pub fn run_extract_command(file: &Path) -> anyhow::Result<()> {
    let text = PdfExtractor::new().extract_file(file)?;
    tracing::info!(file = %file.display(), chars = text.chars().count(), "Extracted text");
    println!("{}", text);
    Ok(())
}
