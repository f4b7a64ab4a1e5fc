//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (Supabase key, login password) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSection,
    #[serde(default)]
    pub defaults: BankrollDefaults,
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
    pub currency: String,
}

/// Values used to create a bankroll for a user who has none yet.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BankrollDefaults {
    pub label: String,
    pub initial_amount: Decimal,
    pub daily_goal_percent: Decimal,
}

impl Default for BankrollDefaults {
    fn default() -> Self {
        Self {
            label: "Banca Principal".to_string(),
            initial_amount: dec!(100),
            daily_goal_percent: dec!(25),
        }
    }
}

/// Which adapter backs authentication and persistence.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Sqlite,
    Supabase,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub email_env: String,
    pub password_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email_env: "BANCA_EMAIL".to_string(),
            password_env: "BANCA_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Login credentials from the environment, if both are set.
    pub fn credentials(&self) -> Option<(String, String)> {
        let email = std::env::var(&self.auth.email_env).ok()?;
        let password = std::env::var(&self.auth.password_env).ok()?;
        Some((email, password))
    }
}
