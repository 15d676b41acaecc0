//! Transport trait - outbound wire interface
//!
//! One call is one request attempt. Retrying is the caller's job.

use bytes::Bytes;

use crate::ContractError;

/// Response of a single request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP-like status code
    pub status: u16,
    /// Response body, kept only for error reporting
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Any 2xx status counts as delivered
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response sender used to deliver encoded batches
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// POST a JSON body to `path`, relative to the transport's base endpoint.
    ///
    /// # Errors
    /// Returns `ContractError::Transport` when no response was obtained.
    /// A response with a non-success status is NOT an error at this level.
    async fn post_json(&self, path: &str, body: Bytes)
        -> Result<TransportResponse, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(302, "").is_success());
        assert!(!TransportResponse::new(500, "oops").is_success());
    }
}
