//! Checkout payment core
//!
//! Orchestrates how a sale gets paid: cash and card settle synchronously,
//! mobile-money runs through an async confirmation session that polls the
//! gateway until the customer confirms on their device.

pub mod orchestrator;
pub mod providers;
pub mod scheduler;
pub mod session;
pub mod traits;
pub mod types;
