//! Command implementations.

mod config;
mod info;
mod input;
mod send;
mod validate;

pub use info::run_info;
pub use send::run_send;
pub use validate::run_validate;
