use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use delvenet_ledger::ProtocolConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub gateway: GatewaySection,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GatewaySection {
    /// Identity that owns the protocol instance.
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Providers registered at startup; each submits once per round.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    /// Seed for the mock oracle's request-id nonces and the demo attribute
    /// values, so repeated runs replay identically.
    #[serde(default = "default_oracle_seed")]
    pub oracle_seed: u64,
}

fn default_owner() -> String {
    "delvenet-owner".to_owned()
}

fn default_providers() -> Vec<String> {
    vec!["alice".into(), "bob".into(), "carol".into()]
}

const fn default_oracle_seed() -> u64 {
    42
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.owner.is_empty() {
            return Err(ConfigError::Validation("owner must not be empty".into()));
        }
        if self.gateway.providers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one provider is required".into(),
            ));
        }
        if self
            .gateway
            .providers
            .iter()
            .any(|provider| provider == &self.gateway.owner)
        {
            return Err(ConfigError::Validation(
                "the owner must not double as a provider".into(),
            ));
        }
        self.protocol
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(())
    }

    pub fn sample() -> Self {
        Self {
            gateway: GatewaySection {
                owner: default_owner(),
                providers: default_providers(),
                oracle_seed: default_oracle_seed(),
            },
            protocol: ProtocolConfig::sample(),
        }
    }
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = resolve_format(path, format);
    let config: Config = match format {
        ConfigFormat::Toml => toml::from_str(&contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Yaml => serde_yaml::from_str(&contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Auto => unreachable!(),
    }?;
    config.validate()?;
    Ok(config)
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_is_valid() {
        Config::sample().validate().unwrap();
    }

    #[test]
    fn owner_cannot_be_a_provider() {
        let mut config = Config::sample();
        config.gateway.providers.push(config.gateway.owner.clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn toml_round_trips_through_the_loader_defaults() {
        let parsed: Config = toml::from_str(
            "[gateway]\nproviders = [\"p1\", \"p2\"]\n\n[protocol]\ncooldown-secs = 5\n",
        )
        .expect("parse");
        assert_eq!(parsed.gateway.owner, "delvenet-owner");
        assert_eq!(parsed.gateway.providers.len(), 2);
        assert_eq!(parsed.protocol.cooldown_secs, 5);
    }
}
