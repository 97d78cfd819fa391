//! `dcgen show`: inspect a resolution without rendering.

use anyhow::Result;
use clap::Args;

use super::CliConfig;
use super::common::CommandContext;
use crate::constants::EXPANDED_CONFIG;
use crate::secrecy::masked_json;

#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Print the expanded config (secrets removed) instead of the JSON arguments
    #[arg(long, conflicts_with = "tree")]
    pub expanded: bool,

    /// Print what VARIABLE depends on
    #[arg(long, value_name = "VARIABLE")]
    pub tree: Option<String>,

    /// Include how each value was obtained (user-provided, default, ...)
    #[arg(long, conflicts_with_all = ["tree", "expanded"])]
    pub kinds: bool,
}

impl ShowCommand {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let ctx = CommandContext::load(config)?;
        let resolution = ctx.resolve()?;

        if let Some(name) = &self.tree {
            let Some(tree) = resolution.dependency_tree(name) else {
                anyhow::bail!("Variable '{name}' was not part of this resolution");
            };
            print!("{tree}");
            return Ok(());
        }

        if self.expanded {
            print!("{}", resolution.get(EXPANDED_CONFIG).unwrap_or_default());
            return Ok(());
        }

        if self.kinds {
            let masked = resolution.masked_arguments();
            let listing: serde_json::Map<String, serde_json::Value> = masked
                .into_iter()
                .map(|(name, value)| {
                    let kind = resolution.kind(&name).map(|k| k.to_string()).unwrap_or_default();
                    (name, serde_json::json!({ "value": value, "kind": kind }))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(());
        }

        println!("{}", serde_json::to_string_pretty(&masked_json(resolution.arguments(), resolution.secrets()))?);
        Ok(())
    }
}
