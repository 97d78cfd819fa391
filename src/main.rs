//! dcgen CLI entry point
//!
//! Parses the command line, runs the command, and prints failures with
//! suggestions:
//! - `generate` - resolve and write every target document
//! - `validate` - resolve and render without writing
//! - `show` - inspect the resolved arguments

use anyhow::Result;
use clap::Parser;
use dcgen_cli::cli;
use dcgen_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
