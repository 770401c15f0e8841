//! Shared utilities for integration testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ledger_client::config::schema::NodeConfig;
use ledger_client::network::Node;
use ledger_client::transaction::OperationBody;
use ledger_client::{
    AccountId, ClientConfig, Status, TransactionEnvelope, TransactionId, Transport, TransportError,
    TransportResponse,
};

type Answer = Result<TransportResponse, TransportError>;
type Handler = dyn Fn(u32, AccountId) -> Pin<Box<dyn Future<Output = Answer> + Send>> + Send + Sync;

/// Transport whose answers come from a closure over the call number
/// (0-based) and the target node. Records every call.
pub struct ProgrammableTransport {
    handler: Box<Handler>,
    calls: AtomicU32,
    nodes: Mutex<Vec<AccountId>>,
    requests: Mutex<Vec<Vec<u8>>>,
}

impl ProgrammableTransport {
    pub fn new<F, Fut>(f: F) -> Arc<Self>
    where
        F: Fn(u32, AccountId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Answer> + Send + 'static,
    {
        Arc::new(Self {
            handler: Box::new(move |call, node| -> Pin<Box<dyn Future<Output = Answer> + Send>> {
                Box::pin(f(call, node))
            }),
            calls: AtomicU32::new(0),
            nodes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answer with `status`.
    #[allow(dead_code)]
    pub fn fixed(status: Status) -> Arc<Self> {
        Self::new(move |_, _| async move { Ok(TransportResponse::new(status, Vec::new())) })
    }

    /// Answer with each status in turn, repeating the last one.
    #[allow(dead_code)]
    pub fn scripted(statuses: Vec<Status>) -> Arc<Self> {
        Self::new(move |call, _| {
            let status = statuses
                .get(call as usize)
                .or(statuses.last())
                .copied()
                .unwrap_or(Status::Ok);
            async move { Ok(TransportResponse::new(status, call.to_be_bytes().to_vec())) }
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn nodes(&self) -> Vec<AccountId> {
        self.nodes.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ProgrammableTransport {
    async fn send(&self, node: &Node, request: Vec<u8>) -> Answer {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.nodes.lock().unwrap().push(node.account_id());
        self.requests.lock().unwrap().push(request);
        (self.handler)(call, node.account_id()).await
    }
}

/// Config with `nodes` local nodes (0.0.3, 0.0.4, ...) and millisecond backoffs.
pub fn test_config(nodes: u64) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.network.nodes = (0..nodes)
        .map(|i| NodeConfig {
            account_id: format!("0.0.{}", i + 3),
            address: format!("127.0.0.1:{}", 50211 + i),
        })
        .collect();
    config.retries.max_attempts = 5;
    config.retries.min_backoff_ms = 1;
    config.retries.max_backoff_ms = 8;
    config
}

/// A frozen, unsigned envelope addressed to `nodes`.
#[allow(dead_code)]
pub fn frozen_envelope(nodes: &[AccountId]) -> TransactionEnvelope {
    let mut envelope = TransactionEnvelope::new(OperationBody::new("crypto_transfer", vec![1, 2, 3]));
    envelope
        .set_transaction_id(TransactionId::generate(AccountId::from(1001)))
        .unwrap();
    envelope.freeze(nodes).unwrap();
    envelope
}
