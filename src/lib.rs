//! Response-time instrumentation for HTTP servers.
//!
//! Each finished request is turned into a small JSON payload and sent, fire and
//! forget, as a single UDP datagram to a Jarmo collector. Instrumentation is
//! off unless `JARMO_ENABLE` is set, in which case the layer is a pass-through.
//!
//! ```ignore
//! let transmitter = Arc::new(UdpTransmitter::bind().await?);
//! let interceptor = Interceptor::from_env(Some(JarmoConfig::default()), transmitter);
//! let app = Router::new()
//!     .route("/", get(index))
//!     .layer(ResponseTimeLayer::new(interceptor));
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use application::{Interceptor, RequestObserver};
pub use config::{EnvConfig, JarmoConfig};
pub use domain::{ErrorHandler, Resolver, TransmitError, Transport};
pub use infrastructure::{Metrics, UdpTransmitter};
pub use interfaces::ResponseTimeLayer;
