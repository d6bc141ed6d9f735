//! Mobile-money confirmation flow, driven end to end against a scripted
//! gateway with the tokio clock paused. Default tuning throughout: 3 s poll
//! interval, 2 grace ticks, 10 attempts before the manual-code fallback.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::time::sleep;

use common::{confirmed, glitch, init_tracing, pending, test_config, ScriptedGateway};
use dukapay::{
    GatewayError, PaymentError, PaymentMethod, PaymentOrchestrator, PaymentOutcome,
    PaymentRequest, SessionState, SubmitOutcome, Tender,
};

fn mobile_money(amount: rust_decimal::Decimal) -> PaymentRequest {
    PaymentRequest {
        amount,
        tender: Tender::MobileMoney {
            phone_number: "0712345678".to_string(),
        },
    }
}

async fn submit_pending(
    orchestrator: &PaymentOrchestrator,
    amount: rust_decimal::Decimal,
) -> dukapay::PendingPayment {
    match orchestrator.submit(mobile_money(amount)).await.unwrap() {
        SubmitOutcome::Pending(pending) => pending,
        SubmitOutcome::Completed(_) => panic!("mobile money must not settle synchronously"),
    }
}

#[tokio::test(start_paused = true)]
async fn confirms_after_grace_and_two_unconfirmed_checks() {
    init_tracing();
    let gateway = Arc::new(ScriptedGateway::accepting(
        "abc",
        vec![pending(), pending(), confirmed()],
    ));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;
    assert_eq!(payment.checkout_id().as_deref(), Some("abc"));
    assert_eq!(payment.state(), SessionState::PendingConfirmation);
    let reference = payment.reference().to_string();
    assert!(reference.starts_with("TRX-"));

    let outcome = payment.outcome().await;
    let PaymentOutcome::Completed(completed) = outcome else {
        panic!("payment must confirm");
    };
    assert_eq!(completed.method, PaymentMethod::MobileMoney);
    assert_eq!(completed.reference, reference);
    assert_eq!(completed.amount, dec!(150.00));
    assert_eq!(gateway.status_calls(), 3);

    // the timer is gone; nothing polls a finished session
    sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn no_status_check_before_the_grace_threshold() {
    let gateway = Arc::new(ScriptedGateway::accepting("abc", vec![]));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;

    // two grace ticks pass without touching the gateway
    sleep(Duration::from_millis(6100)).await;
    assert_eq!(gateway.status_calls(), 0);
    assert_eq!(payment.attempts(), 2);

    // the third tick issues the first check
    sleep(Duration::from_secs(3)).await;
    assert_eq!(gateway.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_fall_back_to_manual_entry() {
    let gateway = Arc::new(ScriptedGateway::accepting("abc", vec![]));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());
    let config = test_config();

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;

    // 10 ticks: 2 grace + 8 unconfirmed checks
    sleep(Duration::from_millis(
        config.poll_interval_ms * u64::from(config.max_attempts) + 500,
    )).await;
    assert_eq!(payment.state(), SessionState::AwaitingManualCode);
    assert_eq!(payment.attempts(), config.max_attempts);
    let checks = gateway.status_calls();
    assert_eq!(
        checks,
        (config.max_attempts - config.grace_ticks) as usize
    );

    // the timer was cancelled with the fallback; polling is over
    sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls(), checks);

    // too-short codes are refused and the fallback state holds
    let err = payment.enter_manual_code("ABC12").unwrap_err();
    assert!(err.is_validation());
    assert_eq!(payment.state(), SessionState::AwaitingManualCode);

    // an acceptable code becomes the payment reference
    payment.enter_manual_code("  QGH7TI61JK  ").unwrap();
    let PaymentOutcome::Completed(completed) = payment.outcome().await else {
        panic!("manual code must complete the payment");
    };
    assert_eq!(completed.reference, "QGH7TI61JK");
    assert_eq!(completed.method, PaymentMethod::MobileMoney);
}

#[tokio::test(start_paused = true)]
async fn completion_resolves_once_and_polling_stops() {
    // every poll would confirm; only the first ever runs
    let gateway = Arc::new(ScriptedGateway::new(
        Ok(dukapay::InitiateReply {
            checkout_id: "abc".to_string(),
            simulated: false,
        }),
        vec![confirmed(), confirmed(), confirmed()],
    ));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;

    sleep(Duration::from_millis(9100)).await;
    assert_eq!(payment.state(), SessionState::Confirmed);
    assert_eq!(gateway.status_calls(), 1);

    // a finished session ignores cancellation
    assert!(!payment.cancel());

    let PaymentOutcome::Completed(_) = payment.outcome().await else {
        panic!("payment confirmed above");
    };

    sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_polling_and_resolves_cancelled() {
    let gateway = Arc::new(ScriptedGateway::accepting("abc", vec![]));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;

    // one grace tick in, cancel from the till
    sleep(Duration::from_millis(3100)).await;
    assert!(payment.cancel());
    assert!(!payment.cancel());
    assert_eq!(payment.state(), SessionState::Cancelled);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls(), 0);

    assert!(matches!(payment.outcome().await, PaymentOutcome::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn cancel_works_from_the_manual_fallback() {
    let gateway = Arc::new(ScriptedGateway::accepting("abc", vec![]));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;
    sleep(Duration::from_secs(40)).await;
    assert_eq!(payment.state(), SessionState::AwaitingManualCode);

    assert!(payment.cancel());
    assert!(matches!(payment.outcome().await, PaymentOutcome::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn transient_check_errors_are_retried() {
    let gateway = Arc::new(ScriptedGateway::accepting(
        "abc",
        vec![glitch(), glitch(), confirmed()],
    ));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;

    let PaymentOutcome::Completed(_) = payment.outcome().await else {
        panic!("network blips must not abort the confirmation");
    };
    assert_eq!(gateway.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_check_errors_count_toward_the_attempt_cap() {
    let failures = vec![glitch(), glitch(), glitch(), glitch(), glitch(), glitch(), glitch(), glitch()];
    let gateway = Arc::new(ScriptedGateway::accepting("abc", failures));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;
    sleep(Duration::from_secs(40)).await;

    assert_eq!(payment.state(), SessionState::AwaitingManualCode);
    assert_eq!(gateway.status_calls(), 8);
}

#[tokio::test(start_paused = true)]
async fn rejected_initiation_surfaces_the_gateway_error() {
    let gateway = Arc::new(ScriptedGateway::new(
        Err(GatewayError::rejected("Missing required field: phone_number")),
        vec![],
    ));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let err = orchestrator
        .submit(mobile_money(dec!(150.00)))
        .await
        .expect_err("rejected initiation must fail the submission");
    assert!(matches!(
        err,
        PaymentError::Gateway(GatewayError::Rejected { .. })
    ));
    assert_eq!(gateway.initiate_calls(), 1);
    assert_eq!(gateway.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn a_live_session_blocks_further_submissions() {
    let gateway = Arc::new(ScriptedGateway::accepting("abc", vec![]));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;

    let err = orchestrator
        .submit(PaymentRequest {
            amount: dec!(20.00),
            tender: Tender::Cash {
                tendered: dec!(20.00),
            },
        })
        .await
        .expect_err("a live push payment must block the till");
    assert!(matches!(err, PaymentError::PaymentInProgress));

    // cancelling the push payment frees the till
    payment.cancel();
    let outcome = orchestrator
        .submit(PaymentRequest {
            amount: dec!(20.00),
            tender: Tender::Cash {
                tendered: dec!(20.00),
            },
        })
        .await;
    assert!(outcome.is_ok());
}

#[tokio::test(start_paused = true)]
async fn state_changes_reach_subscribers() {
    let gateway = Arc::new(ScriptedGateway::accepting("abc", vec![confirmed()]));
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), test_config());

    let payment = submit_pending(&orchestrator, dec!(150.00)).await;
    let mut states = payment.state_changes();

    assert_eq!(*states.borrow_and_update(), SessionState::PendingConfirmation);

    let PaymentOutcome::Completed(_) = payment.outcome().await else {
        panic!("payment must confirm");
    };
    assert_eq!(*states.borrow_and_update(), SessionState::Confirmed);
}
