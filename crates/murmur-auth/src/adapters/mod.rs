//! Concrete resolver and routing-table adapters.

pub mod http;
pub mod memory;

pub use http::{HttpActivationFetcher, UrlResolver};
pub use memory::{MemActivationFetcher, MemResolver, RecordingRouteSink};
