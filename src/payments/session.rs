//! Push-payment session state machine
//!
//! One `PaymentSession` owns the lifecycle of a single mobile-money attempt:
//! it drives initiation, polls the gateway for out-of-band confirmation, and
//! resolves a single-shot completion channel exactly once. The grace period
//! avoids polling before the customer could plausibly have acted; the attempt
//! cap bounds how long the till can be stuck before the cashier falls back to
//! the confirmation code shown on the customer's device.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::payments::scheduler::{PollScheduler, TimerHandle};
use crate::payments::traits::{InitiateRequest, PushGateway};
use crate::payments::types::{CompletedPayment, PaymentMethod, PaymentOutcome, SessionState};

/// Description line shown on the customer's device with the payment prompt.
const PAYMENT_DESCRIPTION: &str = "Payment for goods";

/// One mobile-money payment attempt.
///
/// Sessions share no mutable state with each other; the orchestrator keeps at
/// most one alive at a time but nothing here depends on that.
pub struct PaymentSession {
    id: Uuid,
    reference: String,
    amount: Decimal,
    phone_number: String,
    gateway: Arc<dyn PushGateway>,
    config: PaymentConfig,
    state_tx: watch::Sender<SessionState>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: SessionState,
    checkout_id: Option<String>,
    attempt_count: u32,
    /// Reentrancy guard: true while a status check is in flight
    checking: bool,
    timer: Option<TimerHandle>,
    /// Completion latch. Taken on first resolution; once gone, no further
    /// transition can produce an outcome.
    outcome_tx: Option<oneshot::Sender<PaymentOutcome>>,
}

impl PaymentSession {
    pub(crate) fn new(
        gateway: Arc<dyn PushGateway>,
        config: PaymentConfig,
        phone_number: String,
        amount: Decimal,
        reference: String,
    ) -> (Arc<Self>, oneshot::Receiver<PaymentOutcome>) {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (state_tx, _) = watch::channel(SessionState::Validating);
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            reference,
            amount,
            phone_number,
            gateway,
            config,
            state_tx,
            inner: Mutex::new(Inner {
                state: SessionState::Validating,
                checkout_id: None,
                attempt_count: 0,
                checking: false,
                timer: None,
                outcome_tx: Some(outcome_tx),
            }),
        });
        (session, outcome_rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn checkout_id(&self) -> Option<String> {
        self.lock().checkout_id.clone()
    }

    /// Polling ticks elapsed since the payment entered the pending state.
    pub fn attempts(&self) -> u32 {
        self.lock().attempt_count
    }

    /// Subscribe to state-change notifications. Presentation layers render
    /// from these; the session itself never formats anything user-facing.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Drive initiation. On success the session is pending confirmation and
    /// the poll timer is running; on failure the session is dead and the
    /// error is the caller's to surface.
    pub(crate) async fn start(self: Arc<Self>) -> PaymentResult<()> {
        {
            let mut inner = self.lock();
            self.transition(&mut inner, SessionState::Initiating);
        }
        info!(
            session = %self.id,
            reference = %self.reference,
            amount = %self.amount,
            "initiating push payment"
        );

        let request = InitiateRequest {
            phone_number: self.phone_number.clone(),
            amount: self.amount,
            reference: self.reference.clone(),
            description: PAYMENT_DESCRIPTION.to_string(),
        };

        match self.gateway.initiate(request).await {
            Ok(reply) => {
                if reply.simulated {
                    info!(session = %self.id, "gateway is running in simulation mode");
                }
                {
                    let mut inner = self.lock();
                    inner.checkout_id = Some(reply.checkout_id);
                    self.transition(&mut inner, SessionState::PendingConfirmation);
                }
                let weak = Arc::downgrade(&self);
                let handle = PollScheduler::start(self.config.poll_interval(), move || {
                    let weak = Weak::clone(&weak);
                    async move {
                        match weak.upgrade() {
                            Some(session) => session.on_tick().await,
                            None => ControlFlow::Break(()),
                        }
                    }
                });
                self.lock().timer = Some(handle);
                Ok(())
            }
            Err(err) => {
                error!(session = %self.id, error = %err, "push payment initiation failed");
                let mut inner = self.lock();
                self.transition(&mut inner, SessionState::Failed);
                // no outcome for a failed initiation; the error is returned
                inner.outcome_tx.take();
                Err(err.into())
            }
        }
    }

    async fn on_tick(&self) -> ControlFlow<()> {
        let checkout_id = {
            let mut inner = self.lock();
            if inner.state != SessionState::PendingConfirmation {
                return ControlFlow::Break(());
            }
            if inner.checking {
                // a slow status check is still in flight; skip this tick
                return ControlFlow::Continue(());
            }
            if inner.attempt_count < self.config.grace_ticks {
                inner.attempt_count += 1;
                debug!(
                    session = %self.id,
                    attempt = inner.attempt_count,
                    "grace tick, no status check yet"
                );
                if inner.attempt_count >= self.config.max_attempts {
                    return self.fall_back_to_manual(&mut inner);
                }
                return ControlFlow::Continue(());
            }
            let Some(id) = inner.checkout_id.clone() else {
                return ControlFlow::Break(());
            };
            self.transition(&mut inner, SessionState::Verifying);
            inner.checking = true;
            id
        };

        let result = self.gateway.check_status(&checkout_id).await;

        let mut inner = self.lock();
        inner.checking = false;
        if inner.state != SessionState::Verifying {
            // cancelled while the check was in flight; the latch is gone
            return ControlFlow::Break(());
        }
        inner.attempt_count += 1;
        match result {
            Ok(reply) if reply.confirmed => {
                info!(
                    session = %self.id,
                    attempts = inner.attempt_count,
                    simulated = reply.simulated,
                    "payment confirmed by gateway"
                );
                self.resolve(&mut inner, self.reference.clone());
                ControlFlow::Break(())
            }
            Ok(_) => {
                debug!(
                    session = %self.id,
                    attempt = inner.attempt_count,
                    "payment not yet confirmed"
                );
                self.continue_or_fall_back(&mut inner)
            }
            Err(err) => {
                warn!(
                    session = %self.id,
                    attempt = inner.attempt_count,
                    error = %err,
                    "status check failed, will retry"
                );
                self.continue_or_fall_back(&mut inner)
            }
        }
    }

    fn continue_or_fall_back(&self, inner: &mut Inner) -> ControlFlow<()> {
        if inner.attempt_count >= self.config.max_attempts {
            self.fall_back_to_manual(inner)
        } else {
            self.transition(inner, SessionState::PendingConfirmation);
            ControlFlow::Continue(())
        }
    }

    fn fall_back_to_manual(&self, inner: &mut Inner) -> ControlFlow<()> {
        if let Some(timer) = inner.timer.take() {
            timer.cancel();
        }
        self.transition(inner, SessionState::AwaitingManualCode);
        info!(
            session = %self.id,
            attempts = inner.attempt_count,
            "confirmation attempts exhausted, awaiting manual code"
        );
        ControlFlow::Break(())
    }

    /// Accept the confirmation code read off the customer's device once
    /// polling has given up. The code becomes the payment reference.
    pub fn enter_manual_code(&self, code: &str) -> PaymentResult<()> {
        let code = code.trim();
        let mut inner = self.lock();
        if inner.state != SessionState::AwaitingManualCode {
            return Err(PaymentError::NotAwaitingCode);
        }
        if code.len() < self.config.min_confirmation_code_len {
            return Err(PaymentError::validation(format!(
                "Confirmation code must be at least {} characters",
                self.config.min_confirmation_code_len
            )));
        }
        info!(session = %self.id, "manual confirmation code accepted");
        self.resolve(&mut inner, code.to_string());
        Ok(())
    }

    /// Cancel the attempt. Returns false when the session had already reached
    /// a terminal state, in which case nothing happens.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return false;
        }
        if let Some(timer) = inner.timer.take() {
            timer.cancel();
        }
        self.transition(&mut inner, SessionState::Cancelled);
        if let Some(tx) = inner.outcome_tx.take() {
            let _ = tx.send(PaymentOutcome::Cancelled);
        }
        info!(session = %self.id, reference = %self.reference, "payment cancelled");
        true
    }

    fn resolve(&self, inner: &mut Inner, reference: String) {
        if let Some(timer) = inner.timer.take() {
            timer.cancel();
        }
        self.transition(inner, SessionState::Confirmed);
        if let Some(tx) = inner.outcome_tx.take() {
            let completed = CompletedPayment {
                method: PaymentMethod::MobileMoney,
                reference,
                amount: self.amount,
                completed_at: Utc::now(),
            };
            let _ = tx.send(PaymentOutcome::Completed(completed));
        }
    }

    fn transition(&self, inner: &mut Inner, state: SessionState) {
        inner.state = state;
        let _ = self.state_tx.send(state);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("payment session lock poisoned")
    }
}
