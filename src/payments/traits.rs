//! Payment gateway trait definition
//!
//! Defines the boundary the payment session drives. The gateway is a pure
//! RPC wrapper: one call per operation, no retries, no business logic.

use crate::error::GatewayResult;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Parameters for one push-payment initiation
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    /// Customer phone number, already normalized to international form
    pub phone_number: String,
    /// Amount due
    pub amount: Decimal,
    /// Client-side reference identifying this attempt
    pub reference: String,
    /// Human-readable line shown on the customer's device
    pub description: String,
}

/// Gateway acknowledgement of an accepted initiation
#[derive(Debug, Clone)]
pub struct InitiateReply {
    /// Correlation id used to poll for the outcome
    pub checkout_id: String,
    /// True when the gateway is running without provider credentials
    pub simulated: bool,
}

/// Result of one status poll
#[derive(Debug, Clone, Copy)]
pub struct StatusReply {
    pub confirmed: bool,
    pub simulated: bool,
}

/// Trait for push-payment gateway implementations
///
/// The session treats `initiate` failures as terminal and `check_status`
/// failures as transient, so implementations should report both faithfully
/// rather than retry internally.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Ask the gateway to push a payment prompt to the customer's device.
    ///
    /// Issues exactly one network call and is never retried automatically.
    async fn initiate(&self, request: InitiateRequest) -> GatewayResult<InitiateReply>;

    /// Poll the gateway for the outcome of an initiated payment.
    ///
    /// Issues exactly one network call. Callers poll this until the payment
    /// confirms or the attempt cap is reached.
    async fn check_status(&self, checkout_id: &str) -> GatewayResult<StatusReply>;
}
