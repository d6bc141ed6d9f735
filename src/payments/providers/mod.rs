//! Payment gateway implementations
//!
//! Concrete implementations of the PushGateway trait.

pub mod mpesa;

pub use mpesa::MpesaGateway;
