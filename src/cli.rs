use std::path::PathBuf;
use clap::{Parser, ValueEnum};

use crate::core::SelectionMode;
use crate::diff::{DiffMode, Layout};

#[derive(Parser)]
#[command(name = "diffsync")]
#[command(author = "diffsync contributors")]
#[command(version = "0.1.0")]
#[command(about = "Compare two text files with pluggable diff engines")]
#[command(long_about = "diffsync picks a diff engine for the given inputs (or uses the one you name), computes the edit script and prints it inline or as two aligned columns.")]
pub struct Cli {
    /// Original file
    #[arg(value_name = "LEFT", help = "Original (left) file")]
    pub left: PathBuf,

    /// Modified file
    #[arg(value_name = "RIGHT", help = "Modified (right) file")]
    pub right: PathBuf,

    /// Engine id; selects the engine manually instead of automatically
    #[arg(short, long, help = "Engine id to use (e.g. dmp, dtl)")]
    pub engine: Option<String>,

    /// Granularity hint passed to the engine
    #[arg(short, long, default_value = "auto", help = "Diff granularity")]
    pub mode: DiffMode,

    /// Inline or side-by-side display
    #[arg(short, long, default_value = "inline", help = "Output layout")]
    pub layout: Layout,

    /// Output format
    #[arg(long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Total width for side-by-side output
    #[arg(long, default_value = "120", help = "Width of side-by-side output")]
    pub width: usize,

    /// Run the engine on a worker thread
    #[arg(long = "async", help = "Compute asynchronously")]
    pub use_async: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text (default)
    Text,
    /// JSON output for scripting
    Json,
}

impl Cli {
    pub fn selection(&self) -> (SelectionMode, String) {
        match &self.engine {
            Some(id) => (SelectionMode::Manual, id.clone()),
            None => (SelectionMode::Auto, String::new()),
        }
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        for path in [&self.left, &self.right] {
            if !path.exists() {
                return Err(format!("Path does not exist: {}", path.display()));
            }

            if !path.is_file() {
                return Err(format!("Path is not a file: {}", path.display()));
            }
        }

        if let Some(engine) = &self.engine {
            if engine.trim().is_empty() {
                return Err("Engine id must not be empty".to_string());
            }
        }

        if self.layout == Layout::SideBySide && self.width < 20 {
            return Err("Width must be at least 20 for side-by-side output".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["diffsync", "a.txt", "b.txt"]).unwrap();
        assert_eq!(cli.mode, DiffMode::Auto);
        assert_eq!(cli.layout, Layout::Inline);
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.use_async);
        assert_eq!(cli.selection(), (SelectionMode::Auto, String::new()));
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::try_parse_from([
            "diffsync", "a.txt", "b.txt", "--engine", "dmp", "--mode", "char", "--layout", "side-by-side",
            "--output", "json", "--async",
        ])
        .unwrap();
        assert_eq!(cli.mode, DiffMode::Char);
        assert_eq!(cli.layout, Layout::SideBySide);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.use_async);
        assert_eq!(cli.selection(), (SelectionMode::Manual, "dmp".to_string()));
    }

    #[test]
    fn test_validate() {
        let left_file = NamedTempFile::new().unwrap();
        let right_file = NamedTempFile::new().unwrap();
        let left = left_file.path().to_string_lossy().into_owned();
        let right_path = right_file.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["diffsync", left.as_str(), right_path.as_str()]).unwrap();
        assert!(cli.validate().is_ok());

        let cli = Cli::try_parse_from(["diffsync", left.as_str(), "/nonexistent/file"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from([
            "diffsync", left.as_str(), right_path.as_str(), "--layout", "side-by-side", "--width", "10",
        ])
        .unwrap();
        assert!(cli.validate().is_err());
    }
}
