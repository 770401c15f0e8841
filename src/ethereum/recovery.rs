//! Signer recovery for decoded Ethereum transactions.

use alloy::primitives::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::crypto::keys::evm_address;
use crate::crypto::PublicKey;
use crate::ethereum::transaction::EthRawTransaction;
use crate::ethereum::types::{EthError, EthResult};

/// The account that signed a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthSender {
    /// Compressed secp256k1 public key.
    pub public_key: PublicKey,
    pub address: Address,
}

impl EthRawTransaction {
    /// Recover the signer from the signature and the signing hash.
    pub fn recover_sender(&self) -> EthResult<EthSender> {
        let key = recover_verifying_key(
            self.signing_hash().as_slice(),
            self.recovery_id(),
            self.r(),
            self.s(),
        )?;

        let sender = EthSender {
            public_key: PublicKey::from_verifying_key(&key),
            address: evm_address(&key),
        };
        tracing::debug!(address = %sender.address, tx_type = ?self.tx_type(), "Recovered transaction signer");
        Ok(sender)
    }

    pub fn sender_public_key(&self) -> EthResult<PublicKey> {
        Ok(self.recover_sender()?.public_key)
    }

    pub fn sender_address(&self) -> EthResult<Address> {
        Ok(self.recover_sender()?.address)
    }
}

fn recover_verifying_key(prehash: &[u8], recovery_id: u8, r: &[u8], s: &[u8]) -> EthResult<VerifyingKey> {
    if r.len() > 32 || s.len() > 32 {
        return Err(EthError::RecoveryFailed("signature scalar longer than 32 bytes".to_string()));
    }

    // r and s arrive with leading zeros stripped
    let mut compact = [0u8; 64];
    compact[32 - r.len()..32].copy_from_slice(r);
    compact[64 - s.len()..].copy_from_slice(s);

    let signature =
        Signature::from_slice(&compact).map_err(|e| EthError::RecoveryFailed(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(recovery_id)
        .ok_or_else(|| EthError::RecoveryFailed(format!("invalid recovery id {}", recovery_id)))?;

    VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id)
        .map_err(|e| EthError::RecoveryFailed(e.to_string()))
}
