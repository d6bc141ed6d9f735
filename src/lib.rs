//! dukapay — checkout and payment layer for a point-of-sale terminal
//!
//! The crate takes one `PaymentRequest` per sale and resolves it to exactly
//! one outcome. Cash and card are validated and settled synchronously.
//! Mobile-money is a push payment: the gateway prompts the customer's phone,
//! and a [`payments::session::PaymentSession`] polls for the out-of-band
//! confirmation, falling back to a cashier-entered confirmation code when the
//! gateway never reports success. The checkout collaborator receives
//! completion and cancellation through a single-resolution channel, so a
//! payment can never be recorded twice.

pub mod config;
pub mod error;
pub mod payments;

pub use config::PaymentConfig;
pub use error::{GatewayError, GatewayResult, PaymentError, PaymentResult};
pub use payments::orchestrator::{PaymentOrchestrator, PendingPayment, SubmitOutcome};
pub use payments::providers::mpesa::{MpesaConfig, MpesaGateway};
pub use payments::scheduler::{PollScheduler, TimerHandle};
pub use payments::traits::{InitiateReply, InitiateRequest, PushGateway, StatusReply};
pub use payments::types::{
    change_due, CompletedPayment, PaymentMethod, PaymentOutcome, PaymentRequest, SessionState,
    Tender,
};
