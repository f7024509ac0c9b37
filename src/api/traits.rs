use crate::catalog::types::Payload;
use async_trait::async_trait;
use serde_json::Value;

/// Normalized result of one request against the payment-instructions API.
/// Transport failures are captured here and never surface as errors; they
/// are the engine's only source of `error`-state results.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A response was received and its body decoded as JSON
    Responded { http_status: u16, body: Value },
    /// The request could not be completed (unreachable endpoint,
    /// undecodable body, ...)
    TransportFailed { message: String },
}

/// The sole seam through which the engine touches the network. Implemented
/// by [`super::HttpApiClient`] in production and by scripted mocks in tests.
#[async_trait]
pub trait InstructionApi: Send + Sync {
    /// Send one payload to the endpoint. Infallible by contract: every
    /// failure mode is folded into [`Outcome::TransportFailed`].
    async fn execute(&self, payload: &Payload) -> Outcome;
}
