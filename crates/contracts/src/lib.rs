//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data path
//! `Record` (caller) -> `NormalizedRecord` (flattened attributes) ->
//! `SerializedItem` (JSON bytes held by a buffer) -> `Batch` (one request body).

mod batch;
mod config;
mod error;
mod normalizer;
mod record;
mod transport;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use normalizer::Normalizer;
pub use record::*;
pub use transport::*;
