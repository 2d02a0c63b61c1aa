use super::env_config::{DEFAULT_HOST, DEFAULT_PORT};
use crate::domain::ports::{ErrorHandler, Resolver};
use crate::domain::strategies::{DefaultResolver, LogErrorHandler};
use std::fmt;
use std::sync::Arc;

/// Setup-time configuration of the interceptor.
///
/// Immutable once built; the interceptor shares it across requests.
#[derive(Clone)]
pub struct JarmoConfig {
    pub host: String,
    pub port: u16,
    pub resolver: Arc<dyn Resolver>,
    pub error_handler: Arc<dyn ErrorHandler>,
}

impl JarmoConfig {
    pub fn builder() -> JarmoConfigBuilder {
        JarmoConfigBuilder::default()
    }
}

impl Default for JarmoConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for JarmoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JarmoConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// Builder where every field falls back to its default on its own.
///
/// An empty host or a zero port counts as unset.
#[derive(Default)]
pub struct JarmoConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    resolver: Option<Arc<dyn Resolver>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl JarmoConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> JarmoConfig {
        JarmoConfig {
            host: self
                .host
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.filter(|p| *p != 0).unwrap_or(DEFAULT_PORT),
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(DefaultResolver) as Arc<dyn Resolver>),
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::new(LogErrorHandler) as Arc<dyn ErrorHandler>),
        }
    }
}
