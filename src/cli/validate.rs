//! `dcgen validate`: resolve and render without writing anything.
//!
//! Every missing or invalid variable found during resolution is reported, not just
//! the first. Rendering runs too, so a template that references a name no target
//! requirement covers is caught here rather than at generate time.
//!
//! # Output Formats
//!
//! ## Text (default)
//! ```text
//! ✓ dcgen.toml: 14 variable(s) resolved, 3 target(s) rendered
//! ⚠ Unused argument: legacy_flag
//! ```
//!
//! ## JSON
//! ```json
//! {
//!   "valid": false,
//!   "errors": ["Missing required variable 'cluster_name'"],
//!   "warnings": []
//! }
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::CliConfig;
use super::common::{CommandContext, print_problems, problems};
use crate::core::GenError;
use crate::templating::render_all;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Treat unused user arguments as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Machine-readable validation outcome.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResults {
    pub valid: bool,
    pub variables: usize,
    pub targets: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidateCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        match self.check(config) {
            Ok(results) => self.report_success(config, results),
            Err(error) => {
                match self.format {
                    OutputFormat::Json => {
                        let results = ValidationResults {
                            errors: match error.downcast_ref::<GenError>() {
                                Some(gen_error) => problems(gen_error),
                                None => vec![format!("{error:#}")],
                            },
                            ..ValidationResults::default()
                        };
                        println!("{}", serde_json::to_string_pretty(&results)?);
                    }
                    OutputFormat::Text => print_problems(&error),
                }
                Err(error)
            }
        }
    }

    fn check(&self, config: &CliConfig) -> Result<ValidationResults> {
        let ctx = CommandContext::load(config)?;
        let resolution = ctx.resolve()?;
        let documents = render_all(&ctx.targets, resolution.arguments())?;

        Ok(ValidationResults {
            valid: true,
            variables: resolution.arguments().len(),
            targets: documents.len(),
            errors: Vec::new(),
            warnings: resolution.unused_arguments().iter().map(|name| format!("Unused argument: {name}")).collect(),
        })
    }

    fn report_success(&self, config: &CliConfig, mut results: ValidationResults) -> Result<()> {
        if self.strict && !results.warnings.is_empty() {
            results.valid = false;
            results.errors = std::mem::take(&mut results.warnings);
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
            OutputFormat::Text => {
                if results.valid {
                    println!(
                        "{} {}: {} variable(s) resolved, {} target(s) rendered",
                        "✓".green(),
                        config.manifest_path.display(),
                        results.variables,
                        results.targets
                    );
                }
                for warning in &results.warnings {
                    println!("{} {}", "⚠".yellow(), warning);
                }
                for error in &results.errors {
                    println!("{} {}", "✗".red(), error);
                }
            }
        }

        if results.valid {
            Ok(())
        } else {
            anyhow::bail!("Validation failed in strict mode: {} unused argument(s)", results.errors.len())
        }
    }
}
