//! `dcgen generate`: resolve, render and write every target document.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use super::CliConfig;
use super::common::CommandContext;
use crate::secrecy::json_prettyprint;
use crate::templating::render_all_parallel;
use crate::utils::write_documents;

#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Directory the documents are written to
    #[arg(short, long, default_value = "genconf/serve")]
    pub output_dir: PathBuf,

    /// Resolve and render, but print the document names instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let ctx = CommandContext::load(config)?;
        let resolution = ctx.resolve()?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Final arguments:\n{}", json_prettyprint(&resolution.masked_arguments())?);
        }

        let documents = render_all_parallel(ctx.targets, Arc::new(resolution.into_arguments())).await?;

        if self.dry_run {
            for name in documents.keys() {
                println!("{} {}", "would write".cyan(), self.output_dir.join(name).display());
            }
            return Ok(());
        }

        let written = write_documents(&self.output_dir, &documents).await?;
        for path in &written {
            tracing::info!("Wrote {}", path.display());
        }
        println!(
            "{} Generated {} document(s) in {}",
            "✓".green(),
            written.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}
