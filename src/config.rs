use crate::cli::{Cli, OutputFormat};
use crate::version::VersionRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_NAMES: [&str; 4] = [
    "validate-ddms.toml",
    "validate-ddms.json",
    ".validate-ddms.toml",
    ".validate-ddms.json",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub ddms: DdmsConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
    pub files: FileConfig,
}

/// DDMS version and vocabulary settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DdmsConfig {
    /// Version token records are built for when none can be inferred
    pub version: String,
    /// Extra controlled vocabulary tables, layered on the built-in ones
    pub vocabulary_files: Vec<PathBuf>,
    /// Count a record with warnings as invalid
    pub warnings_as_errors: bool,
}

/// Batch validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Number of worker threads
    pub threads: Option<usize>,
    /// Stop validation on first invalid record
    pub fail_fast: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormatConfig,
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

/// File processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Extensions of record documents
    pub extensions: Vec<String>,
    /// Include patterns (glob syntax)
    pub include_patterns: Vec<String>,
    /// Exclude patterns (glob syntax)
    pub exclude_patterns: Vec<String>,
    /// Follow symbolic links while walking directories
    pub follow_symlinks: bool,
    /// Maximum directory depth; records directly under the root are at depth 0
    pub max_depth: Option<usize>,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Default for DdmsConfig {
    fn default() -> Self {
        Self {
            version: VersionRegistry::global()
                .latest()
                .map(|v| v.token().to_string())
                .unwrap_or_else(|| "5.0".to_string()),
            vocabulary_files: Vec::new(),
            warnings_as_errors: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            include_patterns: vec![],
            exclude_patterns: vec![],
            follow_symlinks: false,
            max_depth: None,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli)
    }

    pub fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path)?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file()? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loading configuration from {}", path.display());

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in the working directory, then the user config directory
    pub fn find_config_file() -> Result<Option<Config>> {
        Self::find_config_file_in(Path::new("."))
    }

    pub fn find_config_file_in(dir: &Path) -> Result<Option<Config>> {
        let mut candidates = vec![dir.to_path_buf()];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("validate-ddms"));
        }

        for candidate in candidates {
            for name in &CONFIG_NAMES {
                let path = candidate.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path)?));
                }
            }
        }
        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(version) = env.get("VALIDATE_DDMS_VERSION") {
            config.ddms.version = version;
        }

        if let Some(files) = env.get("VALIDATE_DDMS_VOCABULARY_FILES") {
            config.ddms.vocabulary_files = split_list(&files).into_iter().map(PathBuf::from).collect();
        }

        if let Some(strict) = env.get("VALIDATE_DDMS_WARNINGS_AS_ERRORS") {
            config.ddms.warnings_as_errors = parse_env("VALIDATE_DDMS_WARNINGS_AS_ERRORS", &strict)?;
        }

        if let Some(threads) = env.get("VALIDATE_DDMS_THREADS") {
            config.validation.threads = Some(parse_env("VALIDATE_DDMS_THREADS", &threads)?);
        }

        if let Some(fail_fast) = env.get("VALIDATE_DDMS_FAIL_FAST") {
            config.validation.fail_fast = parse_env("VALIDATE_DDMS_FAIL_FAST", &fail_fast)?;
        }

        if let Some(verbose) = env.get("VALIDATE_DDMS_VERBOSE") {
            config.output.verbose = parse_env("VALIDATE_DDMS_VERBOSE", &verbose)?;
        }

        if let Some(quiet) = env.get("VALIDATE_DDMS_QUIET") {
            config.output.quiet = parse_env("VALIDATE_DDMS_QUIET", &quiet)?;
        }

        if let Some(format) = env.get("VALIDATE_DDMS_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_DDMS_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        if let Some(extensions) = env.get("VALIDATE_DDMS_EXTENSIONS") {
            config.files.extensions = split_list(&extensions);
        }

        if let Some(follow) = env.get("VALIDATE_DDMS_FOLLOW_SYMLINKS") {
            config.files.follow_symlinks = parse_env("VALIDATE_DDMS_FOLLOW_SYMLINKS", &follow)?;
        }

        if let Some(depth) = env.get("VALIDATE_DDMS_MAX_DEPTH") {
            config.files.max_depth = Some(parse_env("VALIDATE_DDMS_MAX_DEPTH", &depth)?);
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration. Only flags the user gave override.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(version) = &cli.ddms_version {
            config.ddms.version = version.clone();
        }
        config
            .ddms
            .vocabulary_files
            .extend(cli.vocabulary_files.iter().cloned());
        config.ddms.warnings_as_errors |= cli.warnings_as_errors;

        if cli.threads.is_some() {
            config.validation.threads = cli.threads;
        }
        config.validation.fail_fast |= cli.fail_fast;

        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose > 0 {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        let extensions = cli.get_extensions();
        if !extensions.is_empty() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }
        config.files.follow_symlinks |= cli.follow_symlinks;
        if cli.max_depth.is_some() {
            config.files.max_depth = cli.max_depth;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-empty values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.ddms.version = override_config.ddms.version;
        if !override_config.ddms.vocabulary_files.is_empty() {
            base.ddms.vocabulary_files = override_config.ddms.vocabulary_files;
        }
        base.ddms.warnings_as_errors = override_config.ddms.warnings_as_errors;

        if override_config.validation.threads.is_some() {
            base.validation.threads = override_config.validation.threads;
        }
        base.validation.fail_fast = override_config.validation.fail_fast;

        base.output = override_config.output;

        if !override_config.files.extensions.is_empty() {
            base.files.extensions = override_config.files.extensions;
        }
        if !override_config.files.include_patterns.is_empty() {
            base.files.include_patterns = override_config.files.include_patterns;
        }
        if !override_config.files.exclude_patterns.is_empty() {
            base.files.exclude_patterns = override_config.files.exclude_patterns;
        }
        base.files.follow_symlinks = override_config.files.follow_symlinks;
        if override_config.files.max_depth.is_some() {
            base.files.max_depth = override_config.files.max_depth;
        }

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if !VersionRegistry::global().is_supported(&config.ddms.version) {
            return Err(ConfigError::Validation(format!(
                "Unsupported DDMS version: {}",
                config.ddms.version
            )));
        }

        if let Some(threads) = config.validation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }

        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.validation.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self::default()
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.ddms.version, "5.0");
        assert!(config.ddms.vocabulary_files.is_empty());
        assert!(!config.ddms.warnings_as_errors);

        assert_eq!(config.validation.threads, None);
        assert!(!config.validation.fail_fast);

        assert_eq!(config.output.format, OutputFormatConfig::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);

        assert_eq!(config.files.extensions, vec!["json"]);
        assert!(config.files.include_patterns.is_empty());
        assert!(config.files.exclude_patterns.is_empty());
    }

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[ddms]
version = "4.1"
vocabulary_files = ["extra.toml"]
warnings_as_errors = true

[validation]
threads = 8
fail_fast = true

[output]
format = "json"
verbose = true

[files]
extensions = ["json", "ddms"]
exclude_patterns = ["*.bak"]
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();

        assert_eq!(config.ddms.version, "4.1");
        assert_eq!(config.ddms.vocabulary_files, vec![PathBuf::from("extra.toml")]);
        assert!(config.ddms.warnings_as_errors);
        assert_eq!(config.validation.threads, Some(8));
        assert!(config.validation.fail_fast);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.files.extensions, vec!["json", "ddms"]);
        assert!(config.files.include_patterns.is_empty());
        assert_eq!(config.files.exclude_patterns, vec!["*.bak"]);
    }

    #[test]
    fn test_load_partial_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(&config_path, r#"{ "ddms": { "version": "3.1" }, "output": { "format": "summary" } }"#).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();

        assert_eq!(config.ddms.version, "3.1");
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
        assert_eq!(config.files.extensions, vec!["json"]);
    }

    #[test]
    fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "invalid: yaml").unwrap();

        match ConfigManager::load_from_file(&config_path).unwrap_err() {
            ConfigError::UnsupportedFormat(ext) => assert_eq!(ext, "yaml"),
            other => panic!("Expected UnsupportedFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[test]
    fn test_find_config_file_in_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("validate-ddms.toml"),
            "[ddms]\nversion = \"2.0\"\n",
        )
        .unwrap();

        let config = ConfigManager::find_config_file_in(temp_dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(config.ddms.version, "2.0");
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_DDMS_VERSION", "3.0");
        mock_env.set("VALIDATE_DDMS_WARNINGS_AS_ERRORS", "true");
        mock_env.set("VALIDATE_DDMS_THREADS", "16");
        mock_env.set("VALIDATE_DDMS_FAIL_FAST", "true");
        mock_env.set("VALIDATE_DDMS_VERBOSE", "true");
        mock_env.set("VALIDATE_DDMS_FORMAT", "json");
        mock_env.set("VALIDATE_DDMS_EXTENSIONS", "json,ddms");
        mock_env.set("VALIDATE_DDMS_FOLLOW_SYMLINKS", "true");
        mock_env.set("VALIDATE_DDMS_MAX_DEPTH", "2");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.ddms.version, "3.0");
        assert!(config.ddms.warnings_as_errors);
        assert_eq!(config.validation.threads, Some(16));
        assert!(config.validation.fail_fast);
        assert!(config.output.verbose);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert_eq!(config.files.extensions, vec!["json", "ddms"]);
        assert!(config.files.follow_symlinks);
        assert_eq!(config.files.max_depth, Some(2));
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_DDMS_THREADS", "invalid");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));
    }

    #[test]
    fn test_merge_with_cli() {
        let temp_dir = TempDir::new().unwrap();
        let args = vec![
            "validate-ddms",
            "--threads",
            "12",
            "--verbose",
            "--ddms-version",
            "4.0",
            "--extensions",
            "json,ddms",
            "--format",
            "summary",
            temp_dir.path().to_str().unwrap(),
        ];

        let cli = Cli::try_parse_from(args).unwrap();
        let config = ConfigManager::merge_with_cli(Config::default(), &cli);

        assert_eq!(config.validation.threads, Some(12));
        assert!(config.output.verbose);
        assert_eq!(config.ddms.version, "4.0");
        assert_eq!(config.files.extensions, vec!["json", "ddms"]);
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
    }

    #[test]
    fn test_cli_without_flags_keeps_file_values() {
        let temp_dir = TempDir::new().unwrap();
        let mut base = Config::default();
        base.validation.fail_fast = true;
        base.ddms.version = "3.1".to_string();

        let cli = Cli::try_parse_from(["validate-ddms", temp_dir.path().to_str().unwrap()]).unwrap();
        let config = ConfigManager::merge_with_cli(base, &cli);

        assert!(config.validation.fail_fast);
        assert_eq!(config.ddms.version, "3.1");
        assert_eq!(config.files.extensions, vec!["json"]);
    }

    #[test]
    fn test_merge_configs() {
        let mut base = Config::default();
        base.validation.threads = Some(4);
        base.files.exclude_patterns = vec!["*.tmp".to_string()];

        let mut override_config = Config::default();
        override_config.validation.threads = Some(8);
        override_config.ddms.version = "4.1".to_string();

        let merged = ConfigManager::merge_configs(base, override_config);

        assert_eq!(merged.validation.threads, Some(8));
        assert_eq!(merged.ddms.version, "4.1");
        assert_eq!(merged.files.exclude_patterns, vec!["*.tmp"]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.ddms.version = "4.0".to_string();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.ddms.version = "9.9".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());
        config.ddms.version = "5.0".to_string();

        config.validation.threads = Some(0);
        assert!(ConfigManager::validate_config(&config).is_err());
        config.validation.threads = Some(4);

        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.output.quiet = false;

        config.files.extensions = vec![];
        assert!(ConfigManager::validate_config(&config).is_err());

        config.files.extensions = vec!["invalid/ext".to_string()];
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_integration() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(
            &config_path,
            "[ddms]\nversion = \"3.1\"\n\n[validation]\nthreads = 6\nfail_fast = true\n",
        )
        .unwrap();

        let args = vec![
            "validate-ddms",
            "--config",
            config_path.to_str().unwrap(),
            "--threads",
            "8",
            temp_dir.path().to_str().unwrap(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let mut env = MockEnvProvider::new();
        env.set("VALIDATE_DDMS_VERSION", "4.1");

        let config = ConfigManager::load_config_with(&env, &cli).unwrap();

        assert_eq!(config.validation.threads, Some(8));
        assert!(config.validation.fail_fast);
        assert_eq!(config.ddms.version, "4.1");
    }
}
