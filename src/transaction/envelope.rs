//! Transaction envelope and its freeze state machine.
//!
//! # Responsibilities
//! - Hold one operation and, once frozen, one signed body per target node
//! - Reject field changes after freezing
//! - Serialize the frozen envelope and reconstruct it from bytes
//!
//! # Design Decisions
//! - `Building` owns the editable fields; `Frozen` owns the encoded bodies.
//!   Freezing is the only transition between them
//! - Body bytes are encoded exactly once, at freeze time; signatures always
//!   cover those stored bytes
//! - The frozen node list is locked; execution only advances its cursor
//!
//! # Data Flow
//! ```text
//! TransactionEnvelope::new(operation)
//!     → set_* (Building only)
//!     → freeze(node ids) / freeze_with(client)
//!     → sign / add_signature (signatures.rs)
//!     → Client::execute (execution)
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use sha2::{Digest, Sha384};
use thiserror::Error;

use crate::config::schema::TransactionDefaults;
use crate::crypto::{KeyError, PublicKey};
use crate::execution::Client;
use crate::network::{NodeList, NodeListError};
use crate::transaction::body::{
    BodyCodecError, OperationBody, SignedTransaction, TransactionBody, TransactionList,
};
use crate::transaction::id::{AccountId, TransactionId};
use crate::transaction::signatures::attached_signatures;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction must be frozen first")]
    NotFrozen,

    #[error("transaction is frozen and can no longer be modified")]
    AlreadyFrozen,

    #[error("no nodes configured for this transaction")]
    NoNodesConfigured,

    #[error("transaction id is not set and no operator is configured")]
    MissingTransactionId,

    #[error("min backoff {min:?} must not exceed max backoff {max:?}")]
    InvalidBackoff { min: Duration, max: Duration },

    #[error("transaction id was set explicitly and cannot be regenerated")]
    TransactionIdNotGenerated,

    #[error("max attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("malformed transaction bytes: {0}")]
    MalformedBytes(String),

    #[error(transparent)]
    Codec(#[from] BodyCodecError),

    #[error(transparent)]
    NodeList(#[from] NodeListError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Result type for envelope operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Editable fields before freezing.
#[derive(Debug, Clone)]
pub struct TransactionFields {
    pub transaction_id: Option<TransactionId>,
    pub node_account_ids: Vec<AccountId>,
    pub max_transaction_fee: Option<u64>,
    pub valid_duration: Option<Duration>,
    pub memo: String,
    pub operation: OperationBody,
}

/// Encoded per-node bodies after freezing.
#[derive(Debug, Clone)]
pub struct FrozenBodies {
    pub(super) transaction_id: TransactionId,
    pub(super) node_ids: NodeList<AccountId>,
    /// Aligned with `node_ids`.
    pub(super) signed: Vec<SignedTransaction>,
    pub(super) transaction_fee: u64,
    pub(super) valid_duration_secs: u64,
    pub(super) memo: String,
    pub(super) operation: OperationBody,
    /// Set when `freeze_with` generated the id from the operator.
    pub(super) id_generated: bool,
}

impl FrozenBodies {
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn node_ids(&self) -> &NodeList<AccountId> {
        &self.node_ids
    }

    pub fn signed_transactions(&self) -> &[SignedTransaction] {
        &self.signed
    }
}

#[derive(Debug, Clone)]
pub enum EnvelopeState {
    Building(TransactionFields),
    Frozen(FrozenBodies),
}

impl EnvelopeState {
    pub(super) fn frozen(&self) -> TransactionResult<&FrozenBodies> {
        match self {
            EnvelopeState::Frozen(frozen) => Ok(frozen),
            EnvelopeState::Building(_) => Err(TransactionError::NotFrozen),
        }
    }

    pub(super) fn frozen_mut(&mut self) -> TransactionResult<&mut FrozenBodies> {
        match self {
            EnvelopeState::Frozen(frozen) => Ok(frozen),
            EnvelopeState::Building(_) => Err(TransactionError::NotFrozen),
        }
    }

    fn building_mut(&mut self) -> TransactionResult<&mut TransactionFields> {
        match self {
            EnvelopeState::Building(fields) => Ok(fields),
            EnvelopeState::Frozen(_) => Err(TransactionError::AlreadyFrozen),
        }
    }
}

/// Per-transaction overrides of the client's retry policy.
#[derive(Debug, Clone, Default)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub min_backoff: Option<Duration>,
    pub max_backoff: Option<Duration>,
}

/// One logical transaction addressed to several nodes.
#[derive(Debug, Clone)]
pub struct TransactionEnvelope {
    pub(super) state: EnvelopeState,
    /// Signatures recorded per signer, in the order they were added.
    pub(super) signatures: BTreeMap<PublicKey, Vec<Vec<u8>>>,
    retry: RetryOverrides,
    executed: bool,
}

impl TransactionEnvelope {
    pub fn new(operation: OperationBody) -> Self {
        Self {
            state: EnvelopeState::Building(TransactionFields {
                transaction_id: None,
                node_account_ids: Vec::new(),
                max_transaction_fee: None,
                valid_duration: None,
                memo: String::new(),
                operation,
            }),
            signatures: BTreeMap::new(),
            retry: RetryOverrides::default(),
            executed: false,
        }
    }

    pub fn state(&self) -> &EnvelopeState {
        &self.state
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, EnvelopeState::Frozen(_))
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }

    // --- Setters (Building only) ---

    pub fn set_transaction_id(&mut self, id: TransactionId) -> TransactionResult<&mut Self> {
        self.state.building_mut()?.transaction_id = Some(id);
        Ok(self)
    }

    pub fn set_node_account_ids(&mut self, ids: Vec<AccountId>) -> TransactionResult<&mut Self> {
        self.state.building_mut()?.node_account_ids = ids;
        Ok(self)
    }

    pub fn set_max_transaction_fee(&mut self, tinybar: u64) -> TransactionResult<&mut Self> {
        self.state.building_mut()?.max_transaction_fee = Some(tinybar);
        Ok(self)
    }

    pub fn set_valid_duration(&mut self, duration: Duration) -> TransactionResult<&mut Self> {
        self.state.building_mut()?.valid_duration = Some(duration);
        Ok(self)
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) -> TransactionResult<&mut Self> {
        self.state.building_mut()?.memo = memo.into();
        Ok(self)
    }

    pub fn set_max_attempts(&mut self, attempts: u32) -> TransactionResult<&mut Self> {
        self.state.building_mut()?;
        if attempts == 0 {
            return Err(TransactionError::InvalidMaxAttempts);
        }
        self.retry.max_attempts = Some(attempts);
        Ok(self)
    }

    pub fn set_min_backoff(&mut self, min: Duration) -> TransactionResult<&mut Self> {
        self.state.building_mut()?;
        if let Some(max) = self.retry.max_backoff {
            if min > max {
                return Err(TransactionError::InvalidBackoff { min, max });
            }
        }
        self.retry.min_backoff = Some(min);
        Ok(self)
    }

    pub fn set_max_backoff(&mut self, max: Duration) -> TransactionResult<&mut Self> {
        self.state.building_mut()?;
        if let Some(min) = self.retry.min_backoff {
            if min > max {
                return Err(TransactionError::InvalidBackoff { min, max });
            }
        }
        self.retry.max_backoff = Some(max);
        Ok(self)
    }

    // --- Accessors ---

    pub fn transaction_id(&self) -> Option<TransactionId> {
        match &self.state {
            EnvelopeState::Building(fields) => fields.transaction_id,
            EnvelopeState::Frozen(frozen) => Some(frozen.transaction_id),
        }
    }

    pub fn node_account_ids(&self) -> Vec<AccountId> {
        match &self.state {
            EnvelopeState::Building(fields) => fields.node_account_ids.clone(),
            EnvelopeState::Frozen(frozen) => frozen.node_ids.as_slice().to_vec(),
        }
    }

    pub fn memo(&self) -> &str {
        match &self.state {
            EnvelopeState::Building(fields) => &fields.memo,
            EnvelopeState::Frozen(frozen) => &frozen.memo,
        }
    }

    pub fn operation(&self) -> &OperationBody {
        match &self.state {
            EnvelopeState::Building(fields) => &fields.operation,
            EnvelopeState::Frozen(frozen) => &frozen.operation,
        }
    }

    /// Fee limit; `None` while building and unset.
    pub fn max_transaction_fee(&self) -> Option<u64> {
        match &self.state {
            EnvelopeState::Building(fields) => fields.max_transaction_fee,
            EnvelopeState::Frozen(frozen) => Some(frozen.transaction_fee),
        }
    }

    pub fn valid_duration(&self) -> Option<Duration> {
        match &self.state {
            EnvelopeState::Building(fields) => fields.valid_duration,
            EnvelopeState::Frozen(frozen) => Some(Duration::from_secs(frozen.valid_duration_secs)),
        }
    }

    pub fn retry_overrides(&self) -> &RetryOverrides {
        &self.retry
    }

    pub fn frozen(&self) -> TransactionResult<&FrozenBodies> {
        self.state.frozen()
    }

    // --- Freezing ---

    /// Snapshot the body once per node.
    ///
    /// An empty `node_ids` falls back to ids set with `set_node_account_ids`.
    pub fn freeze(&mut self, node_ids: &[AccountId]) -> TransactionResult<&mut Self> {
        self.freeze_with_defaults(node_ids, &TransactionDefaults::default(), false)
    }

    /// Freeze using the client's operator as payer and its network as the
    /// node set when none were chosen.
    pub fn freeze_with(&mut self, client: &Client) -> TransactionResult<&mut Self> {
        let fields = self.state.building_mut()?;
        let id_generated = fields.transaction_id.is_none();
        if id_generated {
            let payer = client
                .operator_account_id()
                .ok_or(TransactionError::MissingTransactionId)?;
            fields.transaction_id = Some(TransactionId::generate(payer));
        }

        let defaults = &client.config().transactions;
        let node_ids = if fields.node_account_ids.is_empty() {
            client
                .network()
                .node_account_ids_for_execute(defaults.max_nodes_per_transaction)
        } else {
            Vec::new()
        };
        self.freeze_with_defaults(&node_ids, defaults, id_generated)
    }

    fn freeze_with_defaults(
        &mut self,
        node_ids: &[AccountId],
        defaults: &TransactionDefaults,
        id_generated: bool,
    ) -> TransactionResult<&mut Self> {
        let fields = self.state.building_mut()?;

        let requested = if node_ids.is_empty() {
            fields.node_account_ids.as_slice()
        } else {
            node_ids
        };
        let mut nodes: Vec<AccountId> = Vec::with_capacity(requested.len());
        for id in requested {
            if !nodes.contains(id) {
                nodes.push(*id);
            }
        }
        if nodes.is_empty() {
            return Err(TransactionError::NoNodesConfigured);
        }

        let transaction_id = fields
            .transaction_id
            .ok_or(TransactionError::MissingTransactionId)?;
        let transaction_fee = fields
            .max_transaction_fee
            .unwrap_or(defaults.default_max_fee_tinybar);
        let valid_duration_secs = fields
            .valid_duration
            .map(|d| d.as_secs())
            .unwrap_or(defaults.valid_duration_secs);

        let signed = encode_bodies(
            &nodes,
            transaction_id,
            transaction_fee,
            valid_duration_secs,
            &fields.memo,
            &fields.operation,
        )?;

        let mut node_list = NodeList::from_items(nodes);
        node_list.set_locked();

        tracing::debug!(
            transaction_id = %transaction_id,
            nodes = node_list.len(),
            "Transaction frozen"
        );

        self.state = EnvelopeState::Frozen(FrozenBodies {
            transaction_id,
            node_ids: node_list,
            signed,
            transaction_fee,
            valid_duration_secs,
            memo: fields.memo.clone(),
            operation: fields.operation.clone(),
            id_generated,
        });
        Ok(self)
    }

    /// Whether the transaction id was generated at freeze time and may be
    /// replaced when the network reports it expired.
    pub fn can_regenerate_transaction_id(&self) -> bool {
        matches!(&self.state, EnvelopeState::Frozen(frozen) if frozen.id_generated)
    }

    /// Replace a generated transaction id with a fresh one for the same payer
    /// and re-encode every body. All signatures are dropped, since they no
    /// longer cover the bodies.
    pub fn regenerate_transaction_id(&mut self) -> TransactionResult<TransactionId> {
        let frozen = self.state.frozen_mut()?;
        if !frozen.id_generated {
            return Err(TransactionError::TransactionIdNotGenerated);
        }

        let transaction_id = TransactionId::generate(frozen.transaction_id.account_id);
        frozen.signed = encode_bodies(
            frozen.node_ids.as_slice(),
            transaction_id,
            frozen.transaction_fee,
            frozen.valid_duration_secs,
            &frozen.memo,
            &frozen.operation,
        )?;

        tracing::debug!(
            previous = %frozen.transaction_id,
            transaction_id = %transaction_id,
            "Transaction id regenerated"
        );
        frozen.transaction_id = transaction_id;
        self.signatures.clear();
        Ok(transaction_id)
    }

    // --- Serialization ---

    /// Encode every signed body. Repeated calls return identical bytes.
    pub fn to_bytes(&self) -> TransactionResult<Vec<u8>> {
        let frozen = self.state.frozen()?;
        let list = TransactionList {
            transactions: frozen.signed.clone(),
        };
        bincode::serialize(&list).map_err(|e| TransactionError::Codec(e.into()))
    }

    /// Rebuild a frozen envelope, including its signature map.
    pub fn from_bytes(bytes: &[u8]) -> TransactionResult<Self> {
        let list: TransactionList = bincode::deserialize(bytes)
            .map_err(|e| TransactionError::MalformedBytes(e.to_string()))?;
        let first = list
            .transactions
            .first()
            .ok_or_else(|| TransactionError::MalformedBytes("no transactions".to_string()))?;
        let template = TransactionBody::from_bytes(&first.body_bytes)?;

        let mut node_ids = Vec::with_capacity(list.transactions.len());
        let mut signatures: BTreeMap<PublicKey, Vec<Vec<u8>>> = BTreeMap::new();

        for signed in &list.transactions {
            let body = TransactionBody::from_bytes(&signed.body_bytes)?;
            if body.transaction_id != template.transaction_id {
                return Err(TransactionError::MalformedBytes(format!(
                    "mismatched transaction ids {} and {}",
                    template.transaction_id, body.transaction_id
                )));
            }
            node_ids.push(body.node_account_id);

            for pair in &signed.sig_map.sig_pair {
                let public_key = pair.public_key().ok_or_else(|| {
                    TransactionError::MalformedBytes("invalid signer public key".to_string())
                })?;
                signatures.entry(public_key).or_default();
            }
        }
        for (public_key, recorded) in signatures.iter_mut() {
            *recorded = attached_signatures(&list.transactions, public_key);
        }

        let mut node_list = NodeList::from_items(node_ids);
        node_list.set_locked();

        Ok(Self {
            state: EnvelopeState::Frozen(FrozenBodies {
                transaction_id: template.transaction_id,
                node_ids: node_list,
                signed: list.transactions,
                transaction_fee: template.transaction_fee,
                valid_duration_secs: template.valid_duration_secs,
                memo: template.memo,
                operation: template.operation,
                id_generated: false,
            }),
            signatures,
            retry: RetryOverrides::default(),
            executed: false,
        })
    }

    /// Encoded signed body for the node at `index` in the frozen node list.
    pub fn signed_bytes_for(&self, index: usize) -> TransactionResult<Vec<u8>> {
        let frozen = self.state.frozen()?;
        let signed = frozen
            .signed
            .get(index)
            .ok_or(NodeListError::OutOfBounds {
                index,
                len: frozen.signed.len(),
            })?;
        Ok(signed.to_bytes()?)
    }

    /// SHA-384 of the signed body sent to the node at `index`.
    pub fn transaction_hash_for(&self, index: usize) -> TransactionResult<Vec<u8>> {
        Ok(Sha384::digest(self.signed_bytes_for(index)?).to_vec())
    }

    /// SHA-384 of the first node's signed body.
    pub fn transaction_hash(&self) -> TransactionResult<Vec<u8>> {
        self.transaction_hash_for(0)
    }
}

/// One encoded, unsigned body per node.
fn encode_bodies(
    nodes: &[AccountId],
    transaction_id: TransactionId,
    transaction_fee: u64,
    valid_duration_secs: u64,
    memo: &str,
    operation: &OperationBody,
) -> TransactionResult<Vec<SignedTransaction>> {
    nodes
        .iter()
        .map(|node| {
            let body = TransactionBody {
                transaction_id,
                node_account_id: *node,
                transaction_fee,
                valid_duration_secs,
                memo: memo.to_string(),
                operation: operation.clone(),
            };
            Ok(SignedTransaction {
                body_bytes: body.to_bytes()?,
                sig_map: Default::default(),
            })
        })
        .collect()
}
