// src/config.rs
use serde::Deserialize;

use crate::anomaly::{AnomalyParams, DEFAULT_CONTAMINATION, DEFAULT_N_ESTIMATORS, DEFAULT_SEED};

const ENV_PREFIX: &str = "TIMESHEET_";

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_contamination() -> f64 {
    DEFAULT_CONTAMINATION
}

fn default_n_estimators() -> usize {
    DEFAULT_N_ESTIMATORS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Runtime configuration, read from `TIMESHEET_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    // Server Configuration
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    // Anomaly detection defaults
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            contamination: default_contamination(),
            n_estimators: default_n_estimators(),
            seed: default_seed(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        envy::prefixed(ENV_PREFIX).from_env::<AppConfig>()
    }

    /// Parses configuration from an explicit set of (unprefixed-name, value) pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    pub fn anomaly_params(&self) -> AnomalyParams {
        AnomalyParams {
            contamination: self.contamination,
            n_estimators: self.n_estimators,
            seed: self.seed,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
