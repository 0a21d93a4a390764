//! Abacus command-line calculator
//!
//! `abacus <value1> <value2> <operation>` performs one calculation and
//! exits. With any other number of positionals it starts the interactive
//! loop.

mod logging;
mod repl;

use abacus::{render, CalcConfig, Calculator};
use abacus_core::{codes, CalcError};
use abacus_plugin::{CommandRegistry, PluginLoader};
use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "abacus", version)]
#[command(about = "Command-dispatch calculator with pluggable operations")]
struct Cli {
    /// First operand
    #[arg(allow_negative_numbers = true)]
    value1: Option<String>,

    /// Second operand
    #[arg(allow_negative_numbers = true)]
    value2: Option<String>,

    /// Operation name, e.g. add
    operation: Option<String>,

    /// Surplus positionals; their presence means interactive mode
    #[arg(hide = true, allow_negative_numbers = true)]
    extra: Vec<String>,

    /// Config file (defaults to ./abacus.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Env file with ABACUS_* variables (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Directory scanned for plugin manifests
    #[arg(long)]
    plugin_dir: Option<PathBuf>,

    /// Per-calculation timeout in milliseconds, 0 disables it
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Only the built-in operations
    #[arg(long)]
    no_plugins: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,

    /// Exit non-zero when a batch calculation fails
    #[arg(long)]
    strict: bool,
}

impl Cli {
    /// Defaults < config file < environment < flags
    fn resolve_config(&self) -> Result<CalcConfig> {
        let mut config = CalcConfig::load(self.config.as_deref())
            .context("failed to load configuration")?
            .with_env(self.env_file.as_deref())
            .context("invalid ABACUS_* environment")?;

        if let Some(dir) = &self.plugin_dir {
            config.plugin_dir = dir.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        Ok(config)
    }

    /// All three positionals, or `None` for interactive mode
    fn batch_args(&self) -> Option<(&str, &str, &str)> {
        match (&self.value1, &self.value2, &self.operation) {
            (Some(value1), Some(value2), Some(operation)) if self.extra.is_empty() => {
                Some((value1.as_str(), value2.as_str(), operation.as_str()))
            }
            _ => None,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    logging::init_logger(&config, cli.verbose)?;
    logging::install_panic_hook();

    info!(environment = %config.environment, "abacus started");
    debug!(?config, "resolved configuration");

    let registry = build_registry(&config, cli.no_plugins);
    let mut calc = Calculator::new(registry).with_timeout(config.timeout());

    match cli.batch_args() {
        Some((value1, value2, operation)) => {
            info!(%value1, %value2, %operation, "command-line input detected");
            let outcome = calc.perform(value1, value2, operation);
            println!("{}", render::outcome_line(value1, value2, operation, &outcome));
            match outcome {
                Err(e) if cli.strict => Ok(ExitCode::from(exit_code(&e))),
                _ => Ok(ExitCode::SUCCESS),
            }
        }
        None => {
            if cli.value1.is_some() || !cli.extra.is_empty() {
                info!("command-line input is not <value1> <value2> <operation>, starting REPL instead");
            }
            info!("starting REPL");
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            repl::run(&mut calc, stdin.lock(), &mut stdout).context("terminal I/O failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Built-in operations plus whatever the plugin directory provides.
/// Plugin problems are logged, never fatal.
fn build_registry(config: &CalcConfig, no_plugins: bool) -> CommandRegistry {
    let mut registry = abacus_std::standard_registry();
    if no_plugins {
        debug!("plugin loading disabled");
        return registry;
    }
    if !config.plugin_dir.is_dir() {
        info!(dir = %config.plugin_dir.display(), "no plugin directory, using built-in operations only");
        return registry;
    }

    match PluginLoader::new().load_all(&config.plugin_dir, &mut registry) {
        Ok(report) => {
            for name in &report.overridden {
                info!(operation = %name, "plugin overrides an existing operation");
            }
            for failure in &report.failures {
                warn!(unit = %failure.unit, error = %failure.error, "plugin unit skipped");
            }
        }
        Err(e) => warn!(dir = %config.plugin_dir.display(), error = %e, "plugin directory unreadable"),
    }
    registry
}

/// Process exit code for a failed batch calculation under `--strict`
fn exit_code(error: &CalcError) -> u8 {
    match error.code.as_str() {
        codes::PARSE_ERROR => 2,
        codes::UNKNOWN_OPERATION => 3,
        codes::DIV_ZERO => 4,
        codes::WORKER_FAULT => 5,
        codes::TIMEOUT => 6,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_batch_positionals_accept_negatives() {
        let cli = Cli::try_parse_from(["abacus", "-5", "-3", "add"]).unwrap();
        assert_eq!(cli.value1.as_deref(), Some("-5"));
        assert_eq!(cli.value2.as_deref(), Some("-3"));
        assert_eq!(cli.operation.as_deref(), Some("add"));
    }

    #[test]
    fn test_partial_positionals_start_repl() {
        let cli = Cli::try_parse_from(["abacus", "5", "3"]).unwrap();
        assert!(cli.batch_args().is_none());
        let cli = Cli::try_parse_from(["abacus", "5"]).unwrap();
        assert!(cli.batch_args().is_none());
        let cli = Cli::try_parse_from(["abacus", "5", "3", "add", "4"]).unwrap();
        assert!(cli.batch_args().is_none());
        let cli = Cli::try_parse_from(["abacus", "5", "3", "add"]).unwrap();
        assert_eq!(cli.batch_args(), Some(("5", "3", "add")));
    }

    #[test]
    fn test_no_positionals_means_repl() {
        let cli = Cli::try_parse_from(["abacus", "--strict", "-v"]).unwrap();
        assert!(cli.value1.is_none());
        assert!(cli.strict && cli.verbose);
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abacus.toml");
        std::fs::write(&path, "plugin_dir = \"from-file\"\ntimeout_ms = 100\n").unwrap();

        let config_arg = path.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["abacus", "--config", &config_arg, "--timeout-ms", "0"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_env_file_flag() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("abacus.env");
        std::fs::write(&env_path, "ABACUS_PLUGIN_DIR=/srv/abacus-cli-env-plugins\n").unwrap();

        let env_arg = env_path.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["abacus", "--env-file", &env_arg]).unwrap();
        assert_eq!(cli.resolve_config().unwrap().plugin_dir, PathBuf::from("/srv/abacus-cli-env-plugins"));

        // Flags still win over the env file
        let cli = Cli::try_parse_from(["abacus", "--env-file", &env_arg, "--plugin-dir", "mine"]).unwrap();
        assert_eq!(cli.resolve_config().unwrap().plugin_dir, PathBuf::from("mine"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["abacus", "--config", "/nonexistent/abacus.toml"]).unwrap();
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&CalcError::parse_error("x")), 2);
        assert_eq!(exit_code(&CalcError::unknown_operation("pow")), 3);
        assert_eq!(exit_code(&CalcError::div_zero()), 4);
        assert_eq!(exit_code(&CalcError::worker_fault("boom")), 5);
        assert_eq!(exit_code(&CalcError::timeout(10)), 6);
        assert_eq!(exit_code(&CalcError::internal("?")), 1);
    }

    #[test]
    fn test_registry_with_plugins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extras.toml"),
            "[[operation]]\nname = \"hypot2\"\nformula = \"a^2 + b^2\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[[operation]]\nname = \"bad\"\nformula = \"a +\"\n").unwrap();

        let config = CalcConfig { plugin_dir: dir.path().to_path_buf(), ..CalcConfig::default() };
        let registry = build_registry(&config, false);
        assert!(registry.contains("hypot2"));
        assert!(!registry.contains("bad"));
        assert_eq!(registry.len(), 6);

        let registry = build_registry(&config, true);
        assert_eq!(registry.len(), 5);

        let mut calc = Calculator::new(build_registry(&config, false));
        assert_eq!(calc.perform_and_render("3", "4", "hypot2"), "The result of 3 hypot2 4 is 25");
    }

    #[test]
    fn test_missing_plugin_dir_falls_back() {
        let config = CalcConfig { plugin_dir: PathBuf::from("/nonexistent/plugins"), ..CalcConfig::default() };
        assert_eq!(build_registry(&config, false).len(), 5);
    }
}
