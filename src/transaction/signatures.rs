//! Signature collection across an envelope's per-node bodies.
//!
//! Signatures are recorded per signer and applied per body. A signature
//! added from outside is placed in every body it verifies against; one that
//! verifies against none is placed in every body.
//!
//! A signer's recorded list always mirrors the bodies: signatures in body
//! order, without repeats. Rebuilding an envelope from bytes yields the same
//! map.

use std::collections::BTreeMap;

use crate::crypto::{PrivateKey, PublicKey};
use crate::transaction::body::{SignaturePair, SignedTransaction};
use crate::transaction::envelope::{TransactionEnvelope, TransactionError, TransactionResult};

impl TransactionEnvelope {
    /// Sign every body with `key`. Signing twice with one key is a no-op.
    pub fn sign(&mut self, key: &PrivateKey) -> TransactionResult<&mut Self> {
        let public_key = key.public_key();
        self.sign_with(public_key, |body| key.sign(body))
    }

    /// Sign every body with an external signer.
    pub fn sign_with<F, E>(&mut self, public_key: PublicKey, signer: F) -> TransactionResult<&mut Self>
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, E>,
        E: Into<TransactionError>,
    {
        let frozen = self.state.frozen_mut()?;
        if self.signatures.contains_key(&public_key) {
            return Ok(self);
        }

        let signatures = frozen
            .signed
            .iter()
            .map(|signed| signer(&signed.body_bytes).map_err(Into::into))
            .collect::<TransactionResult<Vec<_>>>()?;
        for (signed, signature) in frozen.signed.iter_mut().zip(signatures) {
            signed
                .sig_map
                .sig_pair
                .push(SignaturePair::new(&public_key, signature));
        }

        tracing::debug!(signer = %public_key, bodies = frozen.signed.len(), "Transaction signed");
        let recorded = attached_signatures(&frozen.signed, &public_key);
        self.signatures.insert(public_key, recorded);
        Ok(self)
    }

    /// Record `signature` under `public_key` and attach it to the bodies it
    /// is valid for.
    pub fn add_signature(&mut self, public_key: PublicKey, signature: Vec<u8>) -> TransactionResult<&mut Self> {
        let frozen = self.state.frozen_mut()?;

        let valid_for: Vec<bool> = frozen
            .signed
            .iter()
            .map(|signed| public_key.verify(&signed.body_bytes, &signature))
            .collect();
        let any_valid = valid_for.iter().any(|v| *v);

        for (signed, valid) in frozen.signed.iter_mut().zip(valid_for) {
            if any_valid && !valid {
                continue;
            }
            let pairs = &mut signed.sig_map.sig_pair;
            let duplicate = pairs
                .iter()
                .any(|p| p.is_from(&public_key) && p.signature.bytes() == signature.as_slice());
            if !duplicate {
                pairs.push(SignaturePair::new(&public_key, signature.clone()));
            }
        }

        let recorded = attached_signatures(&frozen.signed, &public_key);
        self.signatures.insert(public_key, recorded);
        Ok(self)
    }

    /// Add several signatures from one signer, typically one per body.
    pub fn add_signatures(
        &mut self,
        public_key: PublicKey,
        signatures: Vec<Vec<u8>>,
    ) -> TransactionResult<&mut Self> {
        for signature in signatures {
            self.add_signature(public_key.clone(), signature)?;
        }
        Ok(self)
    }

    /// Remove a signer everywhere; returns what was recorded for it.
    pub fn remove_signature(&mut self, public_key: &PublicKey) -> TransactionResult<Option<Vec<Vec<u8>>>> {
        let frozen = self.state.frozen_mut()?;
        for signed in &mut frozen.signed {
            signed.sig_map.sig_pair.retain(|p| !p.is_from(public_key));
        }
        Ok(self.signatures.remove(public_key))
    }

    /// Remove every signature; returns the removed map.
    pub fn remove_all_signatures(&mut self) -> TransactionResult<BTreeMap<PublicKey, Vec<Vec<u8>>>> {
        let frozen = self.state.frozen_mut()?;
        for signed in &mut frozen.signed {
            signed.sig_map.sig_pair.clear();
        }
        Ok(std::mem::take(&mut self.signatures))
    }

    pub fn signatures(&self) -> &BTreeMap<PublicKey, Vec<Vec<u8>>> {
        &self.signatures
    }

    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        self.signatures.contains_key(public_key)
    }

    /// Every attached signature verifies against the body it is attached to.
    pub fn verify_signatures(&self) -> TransactionResult<bool> {
        let frozen = self.state.frozen()?;
        Ok(frozen.signed.iter().all(|signed| {
            signed.sig_map.sig_pair.iter().all(|pair| {
                pair.public_key()
                    .is_some_and(|key| key.verify(&signed.body_bytes, pair.signature.bytes()))
            })
        }))
    }
}

/// Signatures attached for `public_key`, in body order without repeats.
pub(super) fn attached_signatures(signed: &[SignedTransaction], public_key: &PublicKey) -> Vec<Vec<u8>> {
    let mut out: Vec<Vec<u8>> = Vec::new();
    let pairs = signed
        .iter()
        .flat_map(|s| s.sig_map.sig_pair.iter())
        .filter(|pair| pair.is_from(public_key));
    for pair in pairs {
        let bytes = pair.signature.bytes();
        if !out.iter().any(|s| s == bytes) {
            out.push(bytes.to_vec());
        }
    }
    out
}
