use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolConfigError {
    #[error("configuration invalid: {0}")]
    Validation(String),
}

/// Tunables for one protocol instance.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProtocolConfig {
    /// Identity salt folded into every state-snapshot hash. Two instances
    /// with different identities never produce colliding snapshots.
    #[serde(default = "default_protocol_id")]
    pub protocol_id: String,
    /// Cooldown applied per actor and action kind, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_protocol_id() -> String {
    "delvenet/party/v1".to_owned()
}

const fn default_cooldown_secs() -> u64 {
    60
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_id: default_protocol_id(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl ProtocolConfig {
    pub fn sample() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ProtocolConfigError> {
        if self.protocol_id.is_empty() {
            return Err(ProtocolConfigError::Validation(
                "protocol id must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_is_valid() {
        ProtocolConfig::sample().validate().unwrap();
    }

    #[test]
    fn empty_protocol_id_is_rejected() {
        let config = ProtocolConfig {
            protocol_id: String::new(),
            ..ProtocolConfig::sample()
        };
        assert!(config.validate().is_err());
    }
}
