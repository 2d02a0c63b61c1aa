//! Environment configuration for the instrumentation switch and collector address.

use std::env;

pub const ENABLE_VAR: &str = "JARMO_ENABLE";
pub const HOST_VAR: &str = "JARMO_HOST";
pub const PORT_VAR: &str = "JARMO_PORT";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;

/// Jarmo environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: enabled_from_env(),
            host: env::var(HOST_VAR)
                .ok()
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env::var(PORT_VAR)
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .unwrap_or(DEFAULT_PORT),
        }
    }
}

/// Instrumentation is on only when `JARMO_ENABLE` is set to a non-empty value.
pub fn enabled_from_env() -> bool {
    env::var_os(ENABLE_VAR).is_some_and(|v| !v.is_empty())
}
