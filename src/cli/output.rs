//! Output formatting for resolved configuration

use crate::tree::Tree;
use anyhow::{Context, Result};
use clap::ValueEnum;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Render a resolved tree in the requested format
pub fn render(tree: &Tree, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(tree).context("Failed to serialize to JSON")
        }
        OutputFormat::Yaml => serde_yaml::to_string(tree).context("Failed to serialize to YAML"),
    }
}

/// Print a resolved tree to stdout
pub fn print_tree(tree: &Tree, format: OutputFormat) -> Result<()> {
    let rendered = render(tree, format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}
