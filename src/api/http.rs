//! HTTP client for the payment-instructions endpoint.
//!
//! One POST per test case, `Content-Type: application/json`, no retries and
//! no caching. Failures are normalized into [`Outcome::TransportFailed`] at
//! this boundary so the engine never sees a transport error as a fault.

use crate::api::traits::{InstructionApi, Outcome};
use crate::catalog::types::Payload;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::time::Duration;

/// Published conformance endpoint
pub const DEFAULT_ENDPOINT: &str = "https://payment-instructions-api.vercel.app/payment-instructions";

pub struct HttpApiClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InstructionApi for HttpApiClient {
    async fn execute(&self, payload: &Payload) -> Outcome {
        debug!("POST {} instruction={:?}", self.endpoint, payload.instruction);

        let response = match self.client.post(&self.endpoint).json(payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Request failed: {}", e);
                return Outcome::TransportFailed {
                    message: e.to_string(),
                };
            }
        };

        let http_status = response.status().as_u16();
        match response.json::<Value>().await {
            Ok(body) => Outcome::Responded { http_status, body },
            Err(e) => {
                warn!("Failed to decode response body: {}", e);
                Outcome::TransportFailed {
                    message: format!("Failed to decode response body: {}", e),
                }
            }
        }
    }
}
