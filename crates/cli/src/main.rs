//! CELV CLI - celv command

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod shell;

/// CELV - In-memory versioned file system console
#[derive(Parser)]
#[command(name = "celv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command file to play back instead of reading from the terminal
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut shell = shell::Shell::new();

    match cli.script {
        Some(path) => shell.run_script(&path),
        None => shell.run_interactive(),
    }
}
