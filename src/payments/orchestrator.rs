//! Payment orchestrator façade
//!
//! The single entry point the checkout flow drives. Validates tender input,
//! completes cash and card synchronously, and hands mobile-money off to an
//! async [`PaymentSession`] whose outcome resolves exactly once.

use std::sync::{Arc, Mutex, Weak};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{oneshot, watch};
use tracing::info;

use crate::config::PaymentConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::payments::session::PaymentSession;
use crate::payments::traits::PushGateway;
use crate::payments::types::{
    self, CompletedPayment, PaymentMethod, PaymentOutcome, PaymentRequest, SessionState, Tender,
};

/// Façade used by the checkout flow. One sale is paid at a time; submitting
/// while a prior mobile-money attempt is still live is refused without
/// touching the network.
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PushGateway>,
    config: PaymentConfig,
    active: Mutex<Weak<PaymentSession>>,
}

/// What `submit` hands back: an immediately settled sale or a handle to an
/// in-flight push payment.
#[derive(Debug)]
pub enum SubmitOutcome {
    Completed(CompletedPayment),
    Pending(PendingPayment),
}

/// Handle to an in-flight mobile-money payment.
///
/// Owns the session: dropping the handle tears the session and its timer
/// down. `outcome` consumes the handle and resolves exactly once.
pub struct PendingPayment {
    session: Arc<PaymentSession>,
    outcome_rx: oneshot::Receiver<PaymentOutcome>,
}

impl std::fmt::Debug for PendingPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingPayment").finish_non_exhaustive()
    }
}

impl PendingPayment {
    pub fn reference(&self) -> &str {
        self.session.reference()
    }

    pub fn checkout_id(&self) -> Option<String> {
        self.session.checkout_id()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Polling ticks elapsed so far.
    pub fn attempts(&self) -> u32 {
        self.session.attempts()
    }

    /// Watch state changes; presentation layers subscribe here.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Enter the confirmation code read off the customer's device. Only
    /// accepted once polling has fallen back to manual entry.
    pub fn enter_manual_code(&self, code: &str) -> PaymentResult<()> {
        self.session.enter_manual_code(code)
    }

    /// Cancel the attempt. Returns false if it had already finished.
    pub fn cancel(&self) -> bool {
        self.session.cancel()
    }

    /// Wait for the terminal outcome. Resolves exactly once with either a
    /// completed payment or a cancellation.
    pub async fn outcome(self) -> PaymentOutcome {
        match self.outcome_rx.await {
            Ok(outcome) => outcome,
            // the sender can only vanish if the session was torn down
            Err(_) => PaymentOutcome::Cancelled,
        }
    }
}

impl PaymentOrchestrator {
    pub fn new(gateway: Arc<dyn PushGateway>, config: PaymentConfig) -> Self {
        Self {
            gateway,
            config,
            active: Mutex::new(Weak::new()),
        }
    }

    /// Take payment for one sale.
    ///
    /// Cash and card settle synchronously after local validation and never
    /// start a timer. Mobile-money initiates a push payment and returns a
    /// [`PendingPayment`] whose outcome resolves when the customer confirms,
    /// the cashier enters a manual code, or the attempt is cancelled.
    pub async fn submit(&self, request: PaymentRequest) -> PaymentResult<SubmitOutcome> {
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::validation(
                "Amount due must be greater than zero",
            ));
        }
        self.ensure_idle()?;

        match request.tender {
            Tender::Cash { tendered } => {
                if tendered < request.amount {
                    return Err(PaymentError::validation(
                        "Cash amount is less than total amount",
                    ));
                }
                let change = types::change_due(tendered, request.amount);
                info!(amount = %request.amount, %change, "cash payment accepted");
                Ok(SubmitOutcome::Completed(CompletedPayment {
                    method: PaymentMethod::Cash,
                    reference: format!("Cash: {:.2}", tendered),
                    amount: request.amount,
                    completed_at: Utc::now(),
                }))
            }
            Tender::Card {
                number,
                expiry,
                cvv,
                card_type,
            } => {
                let digits = types::validate_card(&number, &expiry, &cvv)?;
                let last_four = &digits[digits.len() - 4..];
                let reference = format!("{}-{}", card_type, last_four);
                info!(amount = %request.amount, %reference, "card payment accepted");
                Ok(SubmitOutcome::Completed(CompletedPayment {
                    method: PaymentMethod::Card,
                    reference,
                    amount: request.amount,
                    completed_at: Utc::now(),
                }))
            }
            Tender::MobileMoney { phone_number } => {
                let phone = types::normalize_phone(&phone_number, &self.config.country_code)?;
                let reference = types::new_reference();
                let (session, outcome_rx) = PaymentSession::new(
                    Arc::clone(&self.gateway),
                    self.config.clone(),
                    phone,
                    request.amount,
                    reference,
                );
                Arc::clone(&session).start().await?;
                *self.lock_active() = Arc::downgrade(&session);
                Ok(SubmitOutcome::Pending(PendingPayment {
                    session,
                    outcome_rx,
                }))
            }
        }
    }

    fn ensure_idle(&self) -> PaymentResult<()> {
        if let Some(session) = self.lock_active().upgrade() {
            if !session.state().is_terminal() {
                return Err(PaymentError::PaymentInProgress);
            }
        }
        Ok(())
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Weak<PaymentSession>> {
        self.active.lock().expect("orchestrator lock poisoned")
    }
}
