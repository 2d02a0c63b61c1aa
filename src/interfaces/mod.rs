pub mod layer;

pub use layer::{ObservedBody, ResponseFuture, ResponseTime, ResponseTimeLayer};
