//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that node and operator account ids parse and nodes are unique
//! - Validate value ranges (attempts > 0, backoff bounds ordered, timeouts > 0)
//! - Check that the operator key decodes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::crypto::PrivateKey;
use crate::transaction::id::AccountId;

/// Longest validity window the network accepts.
pub const MAX_VALID_DURATION_SECS: u64 = 180;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One semantic problem in a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // 1. Nodes
    let mut seen = HashSet::new();
    for (i, node) in config.network.nodes.iter().enumerate() {
        match node.account_id.parse::<AccountId>() {
            Ok(id) if !seen.insert(id) => errors.push(ValidationError::new(
                format!("network.nodes[{}].account_id", i),
                format!("duplicate node {}", id),
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(
                format!("network.nodes[{}].account_id", i),
                e.to_string(),
            )),
        }
        if node.address.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("network.nodes[{}].address", i),
                "must not be empty",
            ));
        }
    }

    // 2. Health
    let health = &config.network.health;
    if health.unhealthy_threshold == 0 || health.healthy_threshold == 0 {
        errors.push(ValidationError::new("network.health", "thresholds must be at least 1"));
    }
    if health.min_node_backoff_ms > health.max_node_backoff_ms {
        errors.push(ValidationError::new(
            "network.health.min_node_backoff_ms",
            "must not exceed max_node_backoff_ms",
        ));
    }

    // 3. Retries
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.min_backoff_ms > config.retries.max_backoff_ms {
        errors.push(ValidationError::new(
            "retries.min_backoff_ms",
            "must not exceed max_backoff_ms",
        ));
    }

    // 4. Timeouts
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.attempt_secs == 0 {
        errors.push(ValidationError::new("timeouts.attempt_secs", "must be greater than 0"));
    }

    // 5. Transactions
    let duration = config.transactions.valid_duration_secs;
    if duration == 0 || duration > MAX_VALID_DURATION_SECS {
        errors.push(ValidationError::new(
            "transactions.valid_duration_secs",
            format!("must be between 1 and {}", MAX_VALID_DURATION_SECS),
        ));
    }
    if config.transactions.max_nodes_per_transaction == Some(0) {
        errors.push(ValidationError::new(
            "transactions.max_nodes_per_transaction",
            "must be at least 1",
        ));
    }

    // 6. Operator
    if let Some(operator) = &config.operator {
        if let Err(e) = operator.account_id.parse::<AccountId>() {
            errors.push(ValidationError::new("operator.account_id", e.to_string()));
        }
        if let Err(e) = PrivateKey::from_str_der(&operator.private_key_der_hex) {
            errors.push(ValidationError::new("operator.private_key_der_hex", e.to_string()));
        }
    }

    // 7. Observability
    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
