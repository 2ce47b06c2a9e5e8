//! TOML parser with helpful error messages

use super::schema::FaboxConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse fabox.toml with detailed error messages
pub fn parse_fabox_toml(path: &Path) -> Result<FaboxConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_fabox_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse fabox.toml content from string
pub fn parse_fabox_toml_str(content: &str) -> Result<FaboxConfig> {
    let config: FaboxConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Point at the offending line when the error carries a location.
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    let line = error
        .span()
        .map(|span| {
            let end = span.start.min(content.len());
            content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
        });

    match line {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            message
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Two lines either side of `line_num`, the offending one marked.
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(3);
    let end = (line_num + 2).min(lines.len());

    lines
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &FaboxConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration to TOML")
}
