pub mod interceptor;

pub use interceptor::{Interceptor, RequestObserver};
