use std::collections::HashMap;

use clap::Parser;
use tempfile::TempDir;
use validate_ddms::config::OutputFormatConfig;
use validate_ddms::{Cli, ConfigManager, EnvProvider, OutputFormat, RenderFormat, Session, VerbosityLevel};

#[derive(Default)]
struct FixedEnv(HashMap<&'static str, &'static str>);

impl EnvProvider for FixedEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|v| v.to_string())
    }
}

fn config_file(dir: &TempDir) -> String {
    let path = dir.path().join("validate-ddms.toml");
    std::fs::write(
        &path,
        r#"
[ddms]
version = "3.1"
warnings_as_errors = true

[validation]
threads = 2

[files]
extensions = ["json", "ddms"]
"#,
    )
    .unwrap();
    path.display().to_string()
}

#[test]
fn test_file_then_environment_then_cli() {
    let temp_dir = TempDir::new().unwrap();
    let path = config_file(&temp_dir);
    let root = temp_dir.path().display().to_string();

    let cli = Cli::try_parse_from(["validate-ddms", "-c", &path, &root]).unwrap();
    let config = ConfigManager::load_config_with(&FixedEnv::default(), &cli).unwrap();
    assert_eq!(config.ddms.version, "3.1");
    assert!(config.ddms.warnings_as_errors);
    assert_eq!(ConfigManager::get_thread_count(&config), 2);
    assert_eq!(config.files.extensions, vec!["json", "ddms"]);

    let env = FixedEnv(HashMap::from([
        ("VALIDATE_DDMS_VERSION", "4.1"),
        ("VALIDATE_DDMS_FORMAT", "summary"),
    ]));
    let config = ConfigManager::load_config_with(&env, &cli).unwrap();
    assert_eq!(config.ddms.version, "4.1");
    assert_eq!(config.output.format, OutputFormatConfig::Summary);

    let cli = Cli::try_parse_from([
        "validate-ddms",
        "-c",
        &path,
        "--ddms-version",
        "4.0",
        "--format",
        "json",
        "-t",
        "3",
        &root,
    ])
    .unwrap();
    let config = ConfigManager::load_config_with(&env, &cli).unwrap();
    assert_eq!(config.ddms.version, "4.0");
    assert_eq!(OutputFormat::from(config.output.format), OutputFormat::Json);
    assert_eq!(ConfigManager::get_thread_count(&config), 3);

    let session = Session::from_config(&config).unwrap();
    assert_eq!(session.version().token(), "4.0.1");
}

#[test]
fn test_traversal_options_reach_the_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("validate-ddms.toml");
    std::fs::write(&path, "[files]\nfollow_symlinks = true\nmax_depth = 3\n").unwrap();
    let path = path.display().to_string();
    let root = temp_dir.path().display().to_string();

    let cli = Cli::try_parse_from(["validate-ddms", "-c", &path, &root]).unwrap();
    let config = ConfigManager::load_config_with(&FixedEnv::default(), &cli).unwrap();
    assert!(config.files.follow_symlinks);
    assert_eq!(config.files.max_depth, Some(3));

    let cli = Cli::try_parse_from(["validate-ddms", "-c", &path, "--max-depth", "0", &root]).unwrap();
    let config = ConfigManager::load_config_with(&FixedEnv::default(), &cli).unwrap();
    assert!(config.files.follow_symlinks);
    assert_eq!(config.files.max_depth, Some(0));

    let cli = Cli::try_parse_from(["validate-ddms", "--follow-symlinks", &root]).unwrap();
    assert!(cli.follow_symlinks);
    assert_eq!(cli.max_depth, None);
}

#[test]
fn test_unsupported_version_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().display().to_string();
    let cli = Cli::try_parse_from(["validate-ddms", "--ddms-version", "9.9", &root]).unwrap();
    assert!(ConfigManager::load_config_with(&FixedEnv::default(), &cli).is_err());
}

#[test]
fn test_cli_flags() {
    let cli = Cli::try_parse_from([
        "validate-ddms",
        "-vv",
        "--render",
        "html",
        "--vocabulary",
        "a.toml",
        "--vocabulary",
        "b.toml",
        "-e",
        ".json, ddms",
        "records",
    ])
    .unwrap();
    assert_eq!(cli.verbosity(), VerbosityLevel::Debug);
    assert_eq!(cli.render, Some(RenderFormat::Html));
    assert_eq!(cli.vocabulary_files.len(), 2);
    assert_eq!(cli.get_extensions(), vec!["json", "ddms"]);

    assert!(Cli::try_parse_from(["validate-ddms"]).is_err());
    assert!(Cli::try_parse_from(["validate-ddms", "--versions"]).is_ok());
    assert!(Cli::try_parse_from(["validate-ddms", "-q", "-v", "records"]).is_err());
}
