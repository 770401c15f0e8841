//! Network subsystem.
//!
//! # Data Flow
//! ```text
//! ClientConfig.network
//!     → Network::from_config (parse account ids, build nodes)
//!     → ArcSwap<Vec<Arc<Node>>> (replaceable without blocking executions)
//!
//! Freezing a transaction:
//!     → node_account_ids_for_execute (healthy nodes first, shuffled)
//!     → NodeList<AccountId> locked inside the envelope
//!
//! Executing:
//!     → envelope's NodeList::advance (round robin)
//!     → Node::is_healthy (skip nodes in backoff)
//!     → Node::mark_success / mark_failure (passive health)
//! ```
//!
//! # Design Decisions
//! - Node health is passive only; there is no background prober
//! - Replacing the node set keeps the health of nodes that survive it

pub mod node;
pub mod node_list;

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::schema::{HealthConfig, NetworkConfig, NodeConfig};
use crate::transaction::id::{AccountId, ParseIdError};

pub use node::{HealthState, Node};
pub use node_list::{NodeList, NodeListError};

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    InvalidAccountId(#[from] ParseIdError),

    #[error("node {0} is listed more than once")]
    DuplicateNode(AccountId),
}

/// The set of nodes a client may submit to.
#[derive(Debug)]
pub struct Network {
    nodes: ArcSwap<Vec<Arc<Node>>>,
    health: HealthConfig,
}

impl Network {
    pub fn new(health: HealthConfig) -> Self {
        Self {
            nodes: ArcSwap::from_pointee(Vec::new()),
            health,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self, NetworkError> {
        let network = Self::new(config.health.clone());
        network.set_nodes(&config.nodes)?;
        Ok(network)
    }

    /// Replace the node set. Nodes whose account id is kept retain their state.
    pub fn set_nodes(&self, nodes: &[NodeConfig]) -> Result<(), NetworkError> {
        let current = self.nodes.load_full();
        let mut seen = HashSet::new();
        let mut next = Vec::with_capacity(nodes.len());

        for entry in nodes {
            let account_id: AccountId = entry.account_id.parse()?;
            if !seen.insert(account_id) {
                return Err(NetworkError::DuplicateNode(account_id));
            }

            let existing = current
                .iter()
                .find(|n| n.account_id() == account_id && n.address() == entry.address);
            next.push(match existing {
                Some(node) => node.clone(),
                None => Arc::new(Node::new(account_id, entry.address.clone(), self.health.clone())),
            });
        }

        tracing::info!(nodes = next.len(), "Network node set updated");
        self.nodes.store(Arc::new(next));
        Ok(())
    }

    pub fn nodes(&self) -> Arc<Vec<Arc<Node>>> {
        self.nodes.load_full()
    }

    pub fn node(&self, account_id: &AccountId) -> Option<Arc<Node>> {
        self.nodes
            .load()
            .iter()
            .find(|n| n.account_id() == *account_id)
            .cloned()
    }

    pub fn node_account_ids(&self) -> Vec<AccountId> {
        self.nodes.load().iter().map(|n| n.account_id()).collect()
    }

    /// Node ids to freeze a transaction against: healthy nodes in random
    /// order, followed by nodes in backoff, truncated to `max`.
    pub fn node_account_ids_for_execute(&self, max: Option<usize>) -> Vec<AccountId> {
        let nodes = self.nodes.load();
        let (mut healthy, mut backed_off): (Vec<&Arc<Node>>, Vec<&Arc<Node>>) =
            nodes.iter().partition(|n| n.is_healthy());
        fastrand::shuffle(&mut healthy);
        backed_off.sort_by_key(|n| n.remaining_backoff());

        let limit = max.unwrap_or(usize::MAX);
        healthy
            .into_iter()
            .chain(backed_off)
            .take(limit)
            .map(|n| n.account_id())
            .collect()
    }

    pub fn health_config(&self) -> &HealthConfig {
        &self.health
    }

    pub fn len(&self) -> usize {
        self.nodes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.load().is_empty()
    }
}
