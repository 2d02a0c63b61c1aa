pub mod errors;
pub mod lifecycle;
pub mod payload;
pub mod ports;
pub mod strategies;

pub use errors::TransmitError;
pub use lifecycle::{Lifecycle, LifecycleState, TerminalEvent};
pub use payload::{DefaultPayload, RequestInfo, ResponseInfo};
pub use ports::{ErrorHandler, Resolver, Transport};
pub use strategies::{DefaultResolver, LogErrorHandler};
