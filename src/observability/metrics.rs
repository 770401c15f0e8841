//! Metrics collection.
//!
//! # Metrics
//! - `ledger_client_attempts_total` (counter): attempts by node and outcome
//! - `ledger_client_retries_total` (counter): attempts that led to a retry
//! - `ledger_client_node_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; installing an exporter is left
//!   to the application

use crate::transaction::id::AccountId;

/// Outcome label values for `ledger_client_attempts_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable,
    Fatal,
    TransportError,
    Timeout,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Retryable => "retryable",
            AttemptOutcome::Fatal => "fatal",
            AttemptOutcome::TransportError => "transport_error",
            AttemptOutcome::Timeout => "timeout",
        }
    }
}

pub fn record_attempt(node: &AccountId, outcome: AttemptOutcome) {
    ::metrics::counter!(
        "ledger_client_attempts_total",
        "node" => node.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_retry() {
    ::metrics::counter!("ledger_client_retries_total").increment(1);
}

pub fn record_node_health(node: &AccountId, healthy: bool) {
    ::metrics::gauge!("ledger_client_node_health", "node" => node.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
