//! Execution engine: submits a frozen envelope node by node until a
//! definitive answer.
//!
//! # Responsibilities
//! - Sign with the operator when the envelope carries no signatures
//! - Rotate through the envelope's locked node list, skipping nodes in backoff
//! - Classify each response and retry with exponential backoff
//! - Stop on an attempt timeout, the request deadline or caller cancellation
//! - Replace an expired transaction id that was generated at freeze time
//!
//! # Design Decisions
//! - The only shared state touched per attempt is the node-list cursor and
//!   the selected node's health
//! - An attempt timeout cancels the execution; the silent node is still
//!   backed off
//! - Cancellation and the request deadline never retry

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::config::loader::ConfigError;
use crate::config::schema::ClientConfig;
use crate::config::validation::validate_config;
use crate::crypto::PrivateKey;
use crate::error::Result;
use crate::execution::cancel::CancelSignal;
use crate::execution::outcome::{AttemptDecision, ExecuteError, ExecuteResult, TransactionResponse};
use crate::execution::transport::{Transport, TransportError};
use crate::network::{Network, Node, NodeList};
use crate::observability::metrics::{self, AttemptOutcome};
use crate::resilience::backoff::calculate_backoff;
use crate::transaction::envelope::{RetryOverrides, TransactionEnvelope, TransactionError};
use crate::transaction::id::AccountId;
use crate::transaction::status::Status;

/// Default payer and signer.
#[derive(Debug, Clone)]
struct Operator {
    account_id: AccountId,
    key: PrivateKey,
}

/// Effective retry settings for one execution.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
}

/// Why the previous attempt did not succeed.
#[derive(Debug)]
enum Failure {
    Status(Status),
    Transport(TransportError),
}

/// Entry point for executing transactions against a network.
pub struct Client {
    network: Arc<Network>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    operator: Option<Operator>,
}

impl Client {
    /// Build a client from a validated configuration.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        // 1. Semantic checks
        validate_config(&config).map_err(ConfigError::Validation)?;

        // 2. Node set
        let network = Arc::new(Network::from_config(&config.network)?);

        // 3. Operator
        let operator = match &config.operator {
            Some(op) => Some(Operator {
                account_id: op.account_id.parse()?,
                key: PrivateKey::from_str_der(&op.private_key_der_hex)?,
            }),
            None => None,
        };

        tracing::info!(
            nodes = network.len(),
            operator = ?operator.as_ref().map(|o| o.account_id.to_string()),
            max_attempts = config.retries.max_attempts,
            "Client initialized"
        );

        Ok(Self {
            network,
            transport,
            config,
            operator,
        })
    }

    pub fn set_operator(&mut self, account_id: AccountId, key: PrivateKey) -> &mut Self {
        self.operator = Some(Operator { account_id, key });
        self
    }

    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.operator.as_ref().map(|o| o.account_id)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Execute without caller cancellation.
    pub async fn execute(&self, envelope: &mut TransactionEnvelope) -> ExecuteResult<TransactionResponse> {
        self.execute_with_cancel(envelope, CancelSignal::never()).await
    }

    /// Execute until success, a fatal status, exhausted attempts, the request
    /// deadline, or `cancel` firing.
    pub async fn execute_with_cancel(
        &self,
        envelope: &mut TransactionEnvelope,
        mut cancel: CancelSignal,
    ) -> ExecuteResult<TransactionResponse> {
        let log_id = Uuid::new_v4();

        // 1. Require a frozen envelope
        if !envelope.is_frozen() {
            return Err(TransactionError::NotFrozen.into());
        }

        // 2. Operator signs unsigned envelopes
        if !envelope.is_signed() {
            if let Some(operator) = &self.operator {
                envelope.sign(&operator.key)?;
                tracing::debug!(%log_id, operator = %operator.account_id, "Signed with operator");
            }
        }

        let policy = self.retry_policy(envelope.retry_overrides());
        let deadline = Instant::now() + self.config.timeouts.request();

        // 3. Race the attempt loop against the deadline and the caller
        let result = tokio::select! {
            result = self.run_attempts(&mut *envelope, policy, log_id) => result,
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(%log_id, timeout_secs = self.config.timeouts.request_secs, "Request deadline exceeded");
                Err(ExecuteError::Cancelled)
            }
            _ = cancel.cancelled() => {
                tracing::info!(%log_id, "Execution cancelled by caller");
                Err(ExecuteError::Cancelled)
            }
        };

        if result.is_ok() {
            envelope.mark_executed();
        }
        result
    }

    fn retry_policy(&self, overrides: &RetryOverrides) -> RetryPolicy {
        let retries = &self.config.retries;
        let min_backoff = overrides.min_backoff.unwrap_or_else(|| retries.min_backoff());
        let max_backoff = overrides.max_backoff.unwrap_or_else(|| retries.max_backoff());
        RetryPolicy {
            max_attempts: overrides.max_attempts.unwrap_or(retries.max_attempts),
            min_backoff,
            max_backoff: max_backoff.max(min_backoff),
        }
    }

    async fn run_attempts(
        &self,
        envelope: &mut TransactionEnvelope,
        policy: RetryPolicy,
        log_id: Uuid,
    ) -> ExecuteResult<TransactionResponse> {
        let mut last_failure: Option<Failure> = None;

        for attempt in 1..=policy.max_attempts {
            // 1. Pick the next eligible node
            let frozen = envelope.frozen()?;
            let transaction_id = frozen.transaction_id();
            let (index, node) = self.select_node(frozen.node_ids())?;
            let request = envelope.signed_bytes_for(index)?;

            tracing::debug!(
                %log_id,
                node = %node.account_id(),
                address = %node.address(),
                attempt = attempt,
                "Submitting transaction"
            );

            // 2. Send, bounded by the attempt timeout
            let sent = tokio::time::timeout(
                self.config.timeouts.attempt(),
                self.transport.send(&node, request),
            )
            .await;

            let response = match sent {
                Err(_) => {
                    node.mark_failure();
                    metrics::record_attempt(&node.account_id(), AttemptOutcome::Timeout);
                    tracing::warn!(
                        %log_id,
                        node = %node.account_id(),
                        attempt = attempt,
                        timeout_secs = self.config.timeouts.attempt_secs,
                        "Attempt timed out, cancelling execution"
                    );
                    return Err(ExecuteError::Cancelled);
                }
                Ok(Err(err)) => {
                    node.mark_failure();
                    metrics::record_attempt(&node.account_id(), AttemptOutcome::TransportError);
                    tracing::warn!(
                        %log_id,
                        node = %node.account_id(),
                        attempt = attempt,
                        error = %err,
                        "Transport failure"
                    );
                    if !err.is_retryable() {
                        return Err(ExecuteError::Transport(err));
                    }
                    last_failure = Some(Failure::Transport(err));
                    continue;
                }
                Ok(Ok(response)) => response,
            };

            // 3. Any answer means the node is reachable
            node.mark_success();

            // 4. Classify; an expired generated id is replaced and retried
            let mut decision = AttemptDecision::from(response.status.classify());
            if response.status == Status::TransactionExpired
                && self.regenerate_expired(envelope, log_id)?
            {
                decision = AttemptDecision::Retry;
            }

            match decision {
                AttemptDecision::Success => {
                    metrics::record_attempt(&node.account_id(), AttemptOutcome::Success);
                    tracing::debug!(
                        %log_id,
                        node = %node.account_id(),
                        attempt = attempt,
                        status = %response.status,
                        "Transaction accepted"
                    );
                    return Ok(TransactionResponse {
                        node_id: node.account_id(),
                        transaction_id,
                        transaction_hash: envelope.transaction_hash_for(index)?,
                        status: response.status,
                        payload: response.payload,
                    });
                }
                AttemptDecision::Fail => {
                    metrics::record_attempt(&node.account_id(), AttemptOutcome::Fatal);
                    tracing::debug!(
                        %log_id,
                        node = %node.account_id(),
                        status = %response.status,
                        "Transaction rejected"
                    );
                    return Err(ExecuteError::Status {
                        status: response.status,
                        transaction_id,
                    });
                }
                AttemptDecision::Retry => {
                    metrics::record_attempt(&node.account_id(), AttemptOutcome::Retryable);
                    last_failure = Some(Failure::Status(response.status));
                    if attempt == policy.max_attempts {
                        break;
                    }

                    let delay = calculate_backoff(attempt, policy.min_backoff, policy.max_backoff);
                    metrics::record_retry();
                    tracing::info!(
                        %log_id,
                        node = %node.account_id(),
                        attempt = attempt,
                        status = %response.status,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying transaction"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::warn!(%log_id, attempts = policy.max_attempts, "Max attempts exceeded");
        Err(match last_failure {
            Some(Failure::Status(status)) => ExecuteError::MaxAttemptsExceeded {
                attempts: policy.max_attempts,
                last_status: Some(status),
                last_error: None,
            },
            Some(Failure::Transport(err)) => ExecuteError::MaxAttemptsExceeded {
                attempts: policy.max_attempts,
                last_status: None,
                last_error: Some(err.to_string()),
            },
            None => ExecuteError::MaxAttemptsExceeded {
                attempts: policy.max_attempts,
                last_status: None,
                last_error: None,
            },
        })
    }

    /// Give an expired envelope a fresh transaction id and re-sign it with
    /// the operator. Only ids generated by `freeze_with` are replaced, and
    /// only when the operator is the sole signer.
    fn regenerate_expired(&self, envelope: &mut TransactionEnvelope, log_id: Uuid) -> ExecuteResult<bool> {
        let Some(operator) = &self.operator else {
            return Ok(false);
        };
        if !envelope.can_regenerate_transaction_id() {
            return Ok(false);
        }
        let operator_key = operator.key.public_key();
        if envelope.signatures().keys().any(|key| *key != operator_key) {
            return Ok(false);
        }

        let transaction_id = envelope.regenerate_transaction_id()?;
        envelope.sign(&operator.key)?;
        tracing::info!(%log_id, transaction_id = %transaction_id, "Transaction expired, regenerated id");
        Ok(true)
    }

    /// Advance the envelope's cursor to the next healthy node. When every
    /// node is backing off, the first one visited is used anyway.
    fn select_node(&self, node_ids: &NodeList<AccountId>) -> ExecuteResult<(usize, Arc<Node>)> {
        let mut fallback: Option<(usize, Arc<Node>)> = None;

        for _ in 0..node_ids.len() {
            let index = node_ids.advance();
            let account_id = node_ids
                .get(index)
                .ok_or(TransactionError::NoNodesConfigured)?;
            let node = self
                .network
                .node(account_id)
                .ok_or(ExecuteError::UnknownNode(*account_id))?;

            if node.is_healthy() {
                return Ok((index, node));
            }

            tracing::debug!(
                node = %account_id,
                remaining_ms = node.remaining_backoff().as_millis() as u64,
                "Skipping node in backoff"
            );
            if fallback.is_none() {
                fallback = Some((index, node));
            }
        }

        fallback.ok_or_else(|| TransactionError::NoNodesConfigured.into())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("nodes", &self.network.len())
            .field("operator", &self.operator_account_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::NodeConfig;
    use crate::execution::transport::TransportResponse;
    use crate::transaction::body::OperationBody;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed list of answers, then repeats the last one.
    struct Scripted {
        answers: Vec<std::result::Result<Status, TransportError>>,
        calls: Mutex<Vec<AccountId>>,
    }

    impl Scripted {
        fn new(answers: Vec<std::result::Result<Status, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                answers,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<AccountId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(
            &self,
            node: &Node,
            _request: Vec<u8>,
        ) -> std::result::Result<TransportResponse, TransportError> {
            let mut calls = self.calls.lock().unwrap();
            let answer = self
                .answers
                .get(calls.len())
                .or(self.answers.last())
                .cloned()
                .unwrap_or(Ok(Status::Ok));
            calls.push(node.account_id());
            answer.map(|status| TransportResponse::new(status, vec![]))
        }
    }

    fn config(nodes: u64) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.network.nodes = (0..nodes)
            .map(|i| NodeConfig {
                account_id: format!("0.0.{}", i + 3),
                address: format!("127.0.0.1:{}", 50211 + i),
            })
            .collect();
        config.retries.max_attempts = 4;
        config.retries.min_backoff_ms = 1;
        config.retries.max_backoff_ms = 4;
        config
    }

    fn frozen(client: &Client) -> TransactionEnvelope {
        let mut envelope = TransactionEnvelope::new(OperationBody::new("noop", vec![]));
        envelope
            .set_transaction_id(crate::transaction::id::TransactionId::generate(AccountId::from(2)))
            .unwrap();
        envelope.freeze(&client.network().node_account_ids()).unwrap();
        envelope
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_prefers_overrides() {
        let client = Client::new(config(1), Scripted::new(vec![])).unwrap();
        let overrides = RetryOverrides {
            max_attempts: Some(2),
            min_backoff: Some(Duration::from_millis(10)),
            max_backoff: None,
        };
        let policy = client.retry_policy(&overrides);
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.min_backoff, Duration::from_millis(10));
        assert_eq!(policy.max_backoff, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_rotates_nodes() {
        let transport = Scripted::new(vec![Ok(Status::Busy), Ok(Status::Busy), Ok(Status::Ok)]);
        let client = Client::new(config(3), transport.clone()).unwrap();
        let mut envelope = frozen(&client);

        let response = client.execute(&mut envelope).await.unwrap();
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_ne!(calls[0], calls[1]);
        assert_ne!(calls[1], calls[2]);
        assert_eq!(response.node_id, calls[2]);
        assert_eq!(response.transaction_hash.len(), 48);
        assert!(envelope.is_executed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_node_is_skipped() {
        let transport = Scripted::new(vec![Ok(Status::Ok)]);
        let client = Client::new(config(2), transport.clone()).unwrap();
        client.network().node(&AccountId::from(3)).unwrap().mark_failure();

        let mut envelope = TransactionEnvelope::new(OperationBody::new("noop", vec![]));
        envelope
            .set_transaction_id(crate::transaction::id::TransactionId::generate(AccountId::from(2)))
            .unwrap();
        envelope.freeze(&[AccountId::from(3), AccountId::from(4)]).unwrap();

        client.execute(&mut envelope).await.unwrap();
        assert_eq!(transport.calls(), vec![AccountId::from(4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_cancels_without_retry() {
        #[derive(Default)]
        struct Hangs {
            calls: std::sync::atomic::AtomicU32,
        }

        #[async_trait]
        impl Transport for Hangs {
            async fn send(
                &self,
                _node: &Node,
                _request: Vec<u8>,
            ) -> std::result::Result<TransportResponse, TransportError> {
                self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                std::future::pending().await
            }
        }

        let mut config = config(3);
        config.retries.max_attempts = 5;
        let hangs = Arc::new(Hangs::default());
        let client = Client::new(config, hangs.clone()).unwrap();
        let mut envelope = frozen(&client);

        let err = client.execute(&mut envelope).await.unwrap_err();
        assert!(matches!(err, ExecuteError::Cancelled));
        assert_eq!(hangs.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(!envelope.is_executed());
    }
}
