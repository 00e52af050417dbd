//! Conversion commands for the dagmo CLI.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use dagmo_convert::{Conversion, ConversionConfig, Converter};
use tracing::{debug, info};

/// Which way a file is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToDagster,
    ToMarimo,
}

/// Flags shared by both subcommands.
#[derive(Debug, Default)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub strict: bool,
    pub warnings_json: bool,
}

/// Execute a conversion command.
pub fn execute(
    direction: Direction,
    input: &Path,
    output: &Path,
    options: &Options,
) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("Input not found: {}", input.display());
    }

    let config = match &options.config {
        Some(path) => load_config(path)?,
        None => ConversionConfig::default(),
    };
    let converter = Converter::new(config);

    let source = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let conversion = match direction {
        Direction::ToDagster => converter.notebook_to_pipeline(&source),
        Direction::ToMarimo => converter.pipeline_to_notebook(&source),
    }
    .with_context(|| format!("Failed to convert {}", input.display()))?;

    report_warnings(&conversion, options)?;
    if options.strict && !conversion.warnings.is_empty() {
        bail!(
            "{} warning(s) produced, not writing {}",
            conversion.warnings.len(),
            output.display()
        );
    }

    fs::write(output, &conversion.source)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Converted {} -> {}", input.display(), output.display());
    for warning in &conversion.warnings {
        println!("  warning: {warning}");
    }
    info!(
        "Converted {:?} with {} warning(s)",
        direction,
        conversion.warnings.len()
    );

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<ConversionConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn report_warnings(conversion: &Conversion, options: &Options) -> anyhow::Result<()> {
    if options.warnings_json {
        let json = serde_json::to_string_pretty(&conversion.warnings)?;
        eprintln!("{json}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"emit_definitions": false}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.emit_definitions);
        assert_eq!(config.notebook, ConversionConfig::default().notebook);
    }

    #[test]
    fn test_missing_input() {
        let err = execute(
            Direction::ToDagster,
            Path::new("/nonexistent/notebook.py"),
            Path::new("/nonexistent/assets.py"),
            &Options::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config"));
    }
}
