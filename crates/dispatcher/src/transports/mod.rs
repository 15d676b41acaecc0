//! Transport implementations

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, RecordedRequest, Reply};
