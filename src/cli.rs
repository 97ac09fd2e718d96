use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show each invalid record with its messages
    Verbose,
    /// Also show warnings of valid records
    Debug,
}

/// Format of the batch report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Summary,
}

/// Rendering printed for each valid record
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Html,
    Text,
    Xml,
}

/// Validate DDMS metadata records
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-ddms")]
#[command(about = "Validate DDMS metadata records against the rules of their version")]
#[command(version)]
pub struct Cli {
    /// Directory or record document to validate
    #[arg(required_unless_present = "versions")]
    pub path: Option<PathBuf>,

    /// File extensions of record documents (comma-separated)
    #[arg(short = 'e', long = "extensions", help = "File extensions to process (e.g., 'json,ddms')")]
    pub extensions: Option<String>,

    /// Number of worker threads
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// Increase verbosity (-v shows invalid records, -vv also warnings)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// DDMS version used for records whose namespace is shared by several versions
    #[arg(long = "ddms-version")]
    pub ddms_version: Option<String>,

    /// Extra controlled vocabulary file (TOML); may be repeated
    #[arg(long = "vocabulary", action = ArgAction::Append)]
    pub vocabulary_files: Vec<PathBuf>,

    /// Count records with warnings as invalid
    #[arg(long = "warnings-as-errors")]
    pub warnings_as_errors: bool,

    /// Stop after the first invalid record
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Report format
    #[arg(long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Print a rendering of every valid record
    #[arg(long = "render", value_enum)]
    pub render: Option<RenderFormat>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Follow symbolic links while walking directories
    #[arg(long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Maximum directory depth to descend (0 = only the given directory)
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// List the supported DDMS versions and exit
    #[arg(long = "versions")]
    pub versions: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn get_extensions(&self) -> Vec<String> {
        self.extensions
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.path
            && !path.exists()
        {
            return Err(format!("Path does not exist: {}", path.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        match (self.quiet, self.verbose) {
            (true, _) => VerbosityLevel::Quiet,
            (false, 0) => VerbosityLevel::Normal,
            (false, 1) => VerbosityLevel::Verbose,
            (false, _) => VerbosityLevel::Debug,
        }
    }
}
