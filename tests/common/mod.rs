#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dukapay::{
    GatewayError, GatewayResult, InitiateReply, InitiateRequest, PaymentConfig, PushGateway,
    StatusReply,
};

/// Scripted gateway double: one initiate reply and a queue of status
/// responses drained one per poll. Once the script runs dry every further
/// poll reports "not confirmed".
pub struct ScriptedGateway {
    initiate: Mutex<Option<GatewayResult<InitiateReply>>>,
    script: Mutex<VecDeque<GatewayResult<StatusReply>>>,
    last_initiate: Mutex<Option<InitiateRequest>>,
    initiate_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(
        initiate: GatewayResult<InitiateReply>,
        script: Vec<GatewayResult<StatusReply>>,
    ) -> Self {
        Self {
            initiate: Mutex::new(Some(initiate)),
            script: Mutex::new(script.into_iter().collect()),
            last_initiate: Mutex::new(None),
            initiate_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Gateway that accepts the initiation and then plays back `script`.
    pub fn accepting(checkout_id: &str, script: Vec<GatewayResult<StatusReply>>) -> Self {
        Self::new(
            Ok(InitiateReply {
                checkout_id: checkout_id.to_string(),
                simulated: false,
            }),
            script,
        )
    }

    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// The request captured by the last `initiate` call.
    pub fn last_initiate(&self) -> Option<InitiateRequest> {
        self.last_initiate.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for ScriptedGateway {
    async fn initiate(&self, request: InitiateRequest) -> GatewayResult<InitiateReply> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_initiate.lock().unwrap() = Some(request);
        self.initiate
            .lock()
            .unwrap()
            .take()
            .expect("initiate called more than once")
    }

    async fn check_status(&self, _checkout_id: &str) -> GatewayResult<StatusReply> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(pending)
    }
}

pub fn pending() -> GatewayResult<StatusReply> {
    Ok(StatusReply {
        confirmed: false,
        simulated: false,
    })
}

pub fn confirmed() -> GatewayResult<StatusReply> {
    Ok(StatusReply {
        confirmed: true,
        simulated: false,
    })
}

pub fn glitch() -> GatewayResult<StatusReply> {
    Err(GatewayError::network("connection reset by peer"))
}

pub fn test_config() -> PaymentConfig {
    PaymentConfig::default()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
