//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a ledger client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Consensus nodes and their health tracking.
    pub network: NetworkConfig,

    /// Retry policy for execution.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Defaults applied to new transactions.
    pub transactions: TransactionDefaults,

    /// Optional operator (default payer and signer).
    pub operator: Option<OperatorConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node set configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NetworkConfig {
    /// Consensus nodes.
    pub nodes: Vec<NodeConfig>,

    /// Passive health tracking.
    pub health: HealthConfig,
}

/// A consensus node.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Node account id (e.g., "0.0.3").
    pub account_id: String,

    /// Node address (e.g., "35.237.200.180:50211").
    pub address: String,
}

/// Passive node health configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConfig {
    /// Skip nodes that are backing off.
    pub enabled: bool,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,

    /// Initial readmission backoff after a failure, in milliseconds.
    pub min_node_backoff_ms: u64,

    /// Readmission backoff cap, in milliseconds.
    pub max_node_backoff_ms: u64,
}

impl HealthConfig {
    pub fn min_node_backoff(&self) -> Duration {
        Duration::from_millis(self.min_node_backoff_ms)
    }

    pub fn max_node_backoff(&self) -> Duration {
        Duration::from_millis(self.max_node_backoff_ms)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unhealthy_threshold: 1,
            healthy_threshold: 1,
            min_node_backoff_ms: 8_000,
            max_node_backoff_ms: 3_600_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per execution, including the first.
    pub max_attempts: u32,

    /// Base backoff in milliseconds.
    pub min_backoff_ms: u64,

    /// Maximum backoff in milliseconds.
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_backoff_ms: 250,
            max_backoff_ms: 8_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall deadline for one execution, across all attempts, in seconds.
    pub request_secs: u64,

    /// Deadline for a single attempt in seconds.
    pub attempt_secs: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn attempt(&self) -> Duration {
        Duration::from_secs(self.attempt_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            attempt_secs: 10,
        }
    }
}

/// Defaults for new transactions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransactionDefaults {
    /// Maximum fee the payer is willing to pay, in tinybar.
    pub default_max_fee_tinybar: u64,

    /// Validity window from the valid-start time, in seconds.
    pub valid_duration_secs: u64,

    /// Upper bound on node bodies per transaction (None = every node).
    pub max_nodes_per_transaction: Option<usize>,
}

impl Default for TransactionDefaults {
    fn default() -> Self {
        Self {
            default_max_fee_tinybar: 200_000_000,
            valid_duration_secs: 120,
            max_nodes_per_transaction: None,
        }
    }
}

/// Operator account and key.
#[derive(Clone, Deserialize, Serialize)]
pub struct OperatorConfig {
    /// Payer account id (e.g., "0.0.1001").
    pub account_id: String,

    /// Hex-encoded DER private key.
    pub private_key_der_hex: String,
}

impl std::fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("account_id", &self.account_id)
            .field("private_key_der_hex", &"<redacted>")
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
