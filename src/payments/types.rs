//! Payment types and tender validation
//!
//! Common types exchanged between the checkout flow and the payment core,
//! plus the method-specific input checks that run before any network call.

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{PaymentError, PaymentResult};

/// Payment method selected at the register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileMoney,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile-money",
        };
        write!(f, "{}", name)
    }
}

/// Method-specific tender details captured by the checkout UI
#[derive(Debug, Clone)]
pub enum Tender {
    /// Notes and coins handed over at the till
    Cash { tendered: Decimal },
    /// Card swiped or keyed at the terminal
    Card {
        number: String,
        /// MM/YY
        expiry: String,
        cvv: String,
        /// Issuer label used in the payment reference, e.g. "VISA"
        card_type: String,
    },
    /// Push payment confirmed on the customer's phone
    MobileMoney { phone_number: String },
}

impl Tender {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash { .. } => PaymentMethod::Cash,
            Tender::Card { .. } => PaymentMethod::Card,
            Tender::MobileMoney { .. } => PaymentMethod::MobileMoney,
        }
    }
}

/// Immutable input to one payment attempt
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Amount due, in currency minor-unit precision
    pub amount: Decimal,
    pub tender: Tender,
}

/// What the checkout collaborator receives once a sale is paid
#[derive(Debug, Clone, Serialize)]
pub struct CompletedPayment {
    pub method: PaymentMethod,
    /// Opaque reference recorded on the transaction
    pub reference: String,
    pub amount: Decimal,
    pub completed_at: DateTime<Utc>,
}

/// Terminal result of one submission: completion or cancellation, never both
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Completed(CompletedPayment),
    Cancelled,
}

/// Lifecycle of a payment session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Validating,
    Initiating,
    PendingConfirmation,
    Verifying,
    AwaitingManualCode,
    Confirmed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Confirmed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// Change owed on a cash tender. Never negative; zero when exactly equal.
pub fn change_due(tendered: Decimal, amount_due: Decimal) -> Decimal {
    (tendered - amount_due).max(Decimal::ZERO)
}

/// Generate a client-side payment reference: fixed prefix plus six
/// zero-padded random digits.
pub fn new_reference() -> String {
    let digits = rand::thread_rng().gen_range(0..1_000_000u32);
    format!("TRX-{:06}", digits)
}

/// Normalize a phone number to international form before it is sent to the
/// gateway: the leading trunk `0` is replaced by `country_code`, an already
/// international number passes through unchanged.
pub fn normalize_phone(raw: &str, country_code: &str) -> PaymentResult<String> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if digits.len() < 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::validation("Please enter a valid phone number"));
    }

    if digits.starts_with(country_code) {
        return Ok(digits);
    }

    if let Some(rest) = digits.strip_prefix('0') {
        return Ok(format!("{}{}", country_code, rest));
    }

    Err(PaymentError::validation(format!(
        "Phone number should be in the format {}XXXXXXXXX",
        country_code
    )))
}

fn expiry_pattern() -> &'static Regex {
    static EXPIRY: OnceLock<Regex> = OnceLock::new();
    EXPIRY.get_or_init(|| Regex::new(r"^\d{2}/\d{2}$").expect("expiry pattern is well-formed"))
}

/// Validate card details and return the card number with spaces stripped.
pub fn validate_card(number: &str, expiry: &str, cvv: &str) -> PaymentResult<String> {
    let digits: String = number.chars().filter(|c| !c.is_whitespace()).collect();

    if digits.len() < 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::validation("Please enter a valid card number"));
    }

    if !expiry_pattern().is_match(expiry) {
        return Err(PaymentError::validation("Please enter a valid expiry date"));
    }

    if cvv.len() < 3 || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::validation("Please enter a valid CVV"));
    }

    Ok(digits)
}
