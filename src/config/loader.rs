//! Configuration Loader
//!
//! Layers `config/prototyper.toml`, an optional environment overlay
//! (`config/prototyper.<env>.toml`) and `PROTOTYPER__SECTION__KEY` variables.

use super::PrototyperConfig;
use crate::error::Result;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG_DIR: &str = "config";
const CONFIG_BASENAME: &str = "prototyper";

/// Runtime environment name, lowercased; `development` when unset.
pub fn detect_environment() -> String {
    env::var("PROTOTYPER_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `./config`, falling back to defaults for anything missing.
    pub fn load() -> Result<PrototyperConfig> {
        Self::load_from_directory(Path::new(DEFAULT_CONFIG_DIR))
    }

    pub fn load_from_directory(dir: &Path) -> Result<PrototyperConfig> {
        let environment = detect_environment();
        debug!(
            environment = %environment,
            directory = %dir.display(),
            "Loading configuration"
        );

        let base = dir.join(format!("{CONFIG_BASENAME}.toml"));
        let overlay = dir.join(format!("{CONFIG_BASENAME}.{environment}.toml"));
        let builder = Config::builder()
            .add_source(File::from(base).format(FileFormat::Toml).required(false))
            .add_source(File::from(overlay).format(FileFormat::Toml).required(false))
            .add_source(env_source());

        Self::finish(builder.build()?)
    }

    /// Load one explicit file; it must exist.
    pub fn load_from_path(path: &Path) -> Result<PrototyperConfig> {
        debug!(path = %path.display(), "Loading configuration file");
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(env_source())
            .build()?;
        Self::finish(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<PrototyperConfig> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    fn finish(config: Config) -> Result<PrototyperConfig> {
        let config: PrototyperConfig = config.try_deserialize()?;
        config.validate()?;
        debug!(
            max_concurrency = config.scheduler.max_concurrency,
            timeout_ms = config.scheduler.timeout_ms,
            retry_attempts = config.scheduler.retry_attempts,
            policy = %config.scheduler.dependency_failure_policy,
            "Configuration loaded"
        );
        Ok(config)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("PROTOTYPER")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
