//! Configuration module for Jarmo.
//!
//! `JarmoConfig` is the setup-time configuration handed to the interceptor.
//! `EnvConfig` carries what the process environment decides: whether
//! instrumentation is on at all, and the collector address used by the
//! bundled binaries.

mod env_config;
mod jarmo_config;

pub use env_config::{
    DEFAULT_HOST, DEFAULT_PORT, ENABLE_VAR, EnvConfig, HOST_VAR, PORT_VAR, enabled_from_env,
};
pub use jarmo_config::{JarmoConfig, JarmoConfigBuilder};

impl From<&EnvConfig> for JarmoConfig {
    fn from(env: &EnvConfig) -> Self {
        JarmoConfig::builder()
            .host(env.host.clone())
            .port(env.port)
            .build()
    }
}
