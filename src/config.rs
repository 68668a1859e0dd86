//! Configuration for the escrow store.
//!
//! Values come from environment variables (a `.env` file is honoured by the
//! binary) with defaults suitable for local development.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::EscrowStatus;

pub const DEFAULT_STORAGE_KEY: &str = "gametrust_escrow_transaction";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment value: {0}")]
    InvalidValue(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

/// Which status changes the store accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may follow any other.
    #[default]
    Permissive,
    /// `in_escrow -> released | disputed`, `disputed -> released | refunded`.
    Guarded,
}

impl TransitionPolicy {
    pub fn allows(&self, from: EscrowStatus, to: EscrowStatus) -> bool {
        use EscrowStatus::*;
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Guarded => matches!(
                (from, to),
                (InEscrow, Released) | (InEscrow, Disputed) | (Disputed, Released) | (Disputed, Refunded)
            ),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "guarded" => Ok(TransitionPolicy::Guarded),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid transition policy: '{}'. Expected: permissive or guarded",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Storage key holding the serialized escrow
    pub storage_key: String,

    /// System notifications are only raised outside production
    pub environment: Environment,

    pub transition_policy: TransitionPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            environment: Environment::default(),
            transition_policy: TransitionPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Reads `GAMETRUST_ENV`, `GAMETRUST_ESCROW_KEY` and
    /// `GAMETRUST_TRANSITIONS`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("GAMETRUST_ENV")
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let storage_key = match lookup("GAMETRUST_ESCROW_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "GAMETRUST_ESCROW_KEY must not be empty".into(),
                ))
            }
            Some(key) => key,
            None => DEFAULT_STORAGE_KEY.to_string(),
        };

        let transition_policy = lookup("GAMETRUST_TRANSITIONS")
            .map(|v| v.parse::<TransitionPolicy>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            storage_key,
            environment,
            transition_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert!(!config.environment.is_production());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("GAMETRUST_ENV", "prod"),
            ("GAMETRUST_ESCROW_KEY", "escrow_v2"),
            ("GAMETRUST_TRANSITIONS", "Guarded"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.storage_key, "escrow_v2");
        assert_eq!(config.transition_policy, TransitionPolicy::Guarded);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(StoreConfig::from_lookup(lookup(&[("GAMETRUST_ENV", "qa")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[("GAMETRUST_ESCROW_KEY", " ")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[("GAMETRUST_TRANSITIONS", "strict")])).is_err());
    }

    #[test]
    fn test_permissive_allows_everything() {
        for from in EscrowStatus::ALL {
            for to in EscrowStatus::ALL {
                assert!(TransitionPolicy::Permissive.allows(from, to));
            }
        }
    }

    #[test]
    fn test_guarded_graph() {
        use EscrowStatus::*;
        let allowed: Vec<_> = EscrowStatus::ALL
            .into_iter()
            .flat_map(|from| EscrowStatus::ALL.into_iter().map(move |to| (from, to)))
            .filter(|&(from, to)| TransitionPolicy::Guarded.allows(from, to))
            .collect();
        assert_eq!(
            allowed,
            vec![
                (InEscrow, Released),
                (InEscrow, Disputed),
                (Disputed, Released),
                (Disputed, Refunded),
            ]
        );
    }
}
