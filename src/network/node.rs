//! A single consensus node and its passive health.
//!
//! # Responsibilities
//! - Identify the node (account id, address)
//! - Track consecutive transport failures and successes
//! - Hold the node out of rotation for a doubling backoff after failures
//!
//! # Design Decisions
//! - All state is atomic; nodes are shared between concurrent executions
//! - A node whose backoff has elapsed is eligible again even while still
//!   marked unhealthy; its next outcome decides the state

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::schema::HealthConfig;
use crate::observability::metrics;
use crate::resilience::backoff::next_node_backoff;
use crate::transaction::id::AccountId;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A consensus node.
#[derive(Debug)]
pub struct Node {
    account_id: AccountId,
    address: String,
    health: HealthConfig,

    /// Current health state (0=Unknown, 1=Healthy, 2=Unhealthy).
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
    /// Current readmission backoff in milliseconds; 0 when not backed off.
    backoff_ms: AtomicU64,
    /// Milliseconds after `created` before the node is eligible again.
    readmit_after_ms: AtomicU64,
    created: Instant,
}

impl Node {
    pub fn new(account_id: AccountId, address: impl Into<String>, health: HealthConfig) -> Self {
        Self {
            account_id,
            address: address.into(),
            health,
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
            backoff_ms: AtomicU64::new(0),
            readmit_after_ms: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Current readmission backoff.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms.load(Ordering::Relaxed))
    }

    fn elapsed_ms(&self) -> u64 {
        self.created.elapsed().as_millis() as u64
    }

    /// Eligible for selection: not unhealthy, or its backoff has elapsed.
    pub fn is_healthy(&self) -> bool {
        if !self.health.enabled {
            return true;
        }
        self.state() != HealthState::Unhealthy
            || self.elapsed_ms() >= self.readmit_after_ms.load(Ordering::Relaxed)
    }

    /// Time left before the node is eligible again.
    pub fn remaining_backoff(&self) -> Duration {
        let readmit = self.readmit_after_ms.load(Ordering::Relaxed);
        Duration::from_millis(readmit.saturating_sub(self.elapsed_ms()))
    }

    /// Report a response from this node (any status).
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.backoff_ms.store(0, Ordering::Relaxed);
        self.readmit_after_ms.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Healthy {
            return;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= self.health.healthy_threshold as usize {
            let previous = self.state.swap(HealthState::Healthy as u8, Ordering::Relaxed);
            if previous == HealthState::Unhealthy as u8 {
                tracing::info!(node = %self.account_id, "Node recovered");
            }
            metrics::record_node_health(&self.account_id, true);
        }
    }

    /// Report a transport-level failure and push readmission out.
    pub fn mark_failure(&self) {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        let backoff = next_node_backoff(
            self.backoff(),
            self.health.min_node_backoff(),
            self.health.max_node_backoff(),
        );
        self.backoff_ms.store(backoff.as_millis() as u64, Ordering::Relaxed);
        self.readmit_after_ms
            .store(self.elapsed_ms() + backoff.as_millis() as u64, Ordering::Relaxed);

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.health.unhealthy_threshold as usize {
            let previous = self.state.swap(HealthState::Unhealthy as u8, Ordering::Relaxed);
            if previous != HealthState::Unhealthy as u8 {
                tracing::warn!(
                    node = %self.account_id,
                    address = %self.address,
                    failures = failures,
                    backoff_ms = backoff.as_millis() as u64,
                    "Node marked unhealthy"
                );
                metrics::record_node_health(&self.account_id, false);
            }
        }
    }
}
