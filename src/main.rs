use std::process::ExitCode;

use anyhow::Context;
use tracing::{debug, info};

use validate_ddms::{
    Cli, ConfigManager, FileDiscovery, Output, Session, ValidationConfig, ValidationEngine,
    VersionRegistry,
};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    setup_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn setup_logging(verbosity: u8, quiet: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match (quiet, verbosity) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Returns whether every record was valid.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    if cli.versions {
        for token in VersionRegistry::global().supported_versions() {
            println!("{}", token);
        }
        return Ok(true);
    }

    cli.validate().map_err(anyhow::Error::msg)?;
    let path = cli.path.as_deref().context("A path to validate is required")?;

    let config = ConfigManager::load_config(cli).context("Failed to load configuration")?;
    debug!("Effective configuration: {:?}", config);

    let session = Session::from_config(&config).context("Failed to prepare DDMS session")?;
    info!("Validating records under {} with DDMS {}", path.display(), session.version());

    let discovery = FileDiscovery::new()
        .with_extensions(config.files.extensions.clone())
        .with_include_patterns(config.files.include_patterns.clone())?
        .with_exclude_patterns(config.files.exclude_patterns.clone())?
        .with_follow_symlinks(config.files.follow_symlinks)
        .with_max_depth(config.files.max_depth);

    let engine = ValidationEngine::new(
        session,
        ValidationConfig {
            threads: ConfigManager::get_thread_count(&config),
            fail_fast: config.validation.fail_fast,
            warnings_as_errors: config.ddms.warnings_as_errors,
            render: cli.render,
        },
    );
    let results = engine.validate_path(path, &discovery)?;

    for result in &results.file_results {
        if let Some(rendering) = &result.rendering {
            println!("# {}", result.path.display());
            println!("{}", rendering);
        }
    }

    let verbosity = if config.output.quiet {
        validate_ddms::VerbosityLevel::Quiet
    } else if config.output.verbose {
        cli.verbosity().max(validate_ddms::VerbosityLevel::Verbose)
    } else {
        cli.verbosity()
    };
    let output = Output::new(verbosity);
    print!("{}", output.render(&results, config.output.format.into())?);

    Ok(!results.has_errors())
}
