//! Player service configuration, read from the environment.

use fhe_rps_core::config::LedgerConfig;
use fhe_rps_core::protocol::{Address, HexParseError};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name}: {source}")]
    BadAddress {
        name: &'static str,
        source: HexParseError,
    },

    #[error("{name}: unknown value {value:?}")]
    UnknownValue { name: &'static str, value: String },
}

/// Which encryption backend to run with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FheBackendKind {
    /// Never becomes ready; every submission fails with `EncryptionUnavailable`
    Disabled,
    Mock,
}

impl FromStr for FheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::UnknownValue {
                name: "FHE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Which ledger the gateway talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerBackendKind {
    Rpc,
    /// In-process registry, lost on restart
    Mock,
}

impl FromStr for LedgerBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rpc" => Ok(Self::Rpc),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::UnknownValue {
                name: "LEDGER_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub port: u16,
    pub player: Address,
    pub refresh_interval: Duration,
    pub fhe_backend: FheBackendKind,
    pub ledger_backend: LedgerBackendKind,
    pub ledger: LedgerConfig,
}

impl PlayerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3001);
        let player = match lookup("PLAYER_ADDRESS") {
            Some(s) => s.parse().map_err(|source| ConfigError::BadAddress {
                name: "PLAYER_ADDRESS",
                source,
            })?,
            None => Address::random(),
        };
        let refresh_ms = match lookup("REFRESH_INTERVAL_MS") {
            Some(s) => match s.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::UnknownValue {
                        name: "REFRESH_INTERVAL_MS",
                        value: s,
                    })
                }
            },
            None => 4000,
        };

        let fhe_backend = lookup("FHE_BACKEND")
            .as_deref()
            .unwrap_or("disabled")
            .parse()?;
        let ledger_backend = lookup("LEDGER_BACKEND")
            .as_deref()
            .unwrap_or("rpc")
            .parse()?;

        let ledger = LedgerConfig::from_lookup(&lookup).map_err(|source| {
            ConfigError::BadAddress {
                name: "CONTRACT_ADDRESS",
                source,
            }
        })?;

        Ok(Self {
            port,
            player,
            refresh_interval: Duration::from_millis(refresh_ms),
            fhe_backend,
            ledger_backend,
            ledger,
        })
    }
}
