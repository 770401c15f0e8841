//! Multi-party signing workflows over serialized envelopes.

use ledger_client::transaction::{OperationBody, TransactionError};
use ledger_client::{AccountId, Mnemonic, PrivateKey, TransactionEnvelope};

mod common;

use common::frozen_envelope;

fn nodes() -> Vec<AccountId> {
    vec![AccountId::from(3), AccountId::from(4), AccountId::from(5)]
}

#[test]
fn test_offline_cosigner_round_trip() {
    let payer = Mnemonic::generate().to_private_key("").unwrap();
    let cosigner = PrivateKey::generate_ecdsa();

    // Payer freezes, signs and hands the bytes over
    let mut envelope = frozen_envelope(&nodes());
    envelope.sign(&payer).unwrap();
    let handed_over = envelope.to_bytes().unwrap();

    // Cosigner signs each body offline and sends signatures back
    let received = TransactionEnvelope::from_bytes(&handed_over).unwrap();
    let signatures: Vec<Vec<u8>> = received
        .frozen()
        .unwrap()
        .signed_transactions()
        .iter()
        .map(|signed| cosigner.sign(&signed.body_bytes).unwrap())
        .collect();

    envelope
        .add_signatures(cosigner.public_key(), signatures.clone())
        .unwrap();
    assert!(envelope.verify_signatures().unwrap());

    let restored = TransactionEnvelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.signatures(), envelope.signatures());
    assert_eq!(restored.signatures()[&cosigner.public_key()], signatures);
    assert!(restored.is_signed_by(&payer.public_key()));
    assert_eq!(restored.to_bytes().unwrap(), envelope.to_bytes().unwrap());
}

#[test]
fn test_each_body_carries_every_signer() {
    let keys = [PrivateKey::generate_ed25519(), PrivateKey::generate_ecdsa()];
    let mut envelope = frozen_envelope(&nodes());
    for key in &keys {
        envelope.sign(key).unwrap();
    }

    for signed in envelope.frozen().unwrap().signed_transactions() {
        assert_eq!(signed.sig_map.sig_pair.len(), 2);
        for key in &keys {
            let pair = signed
                .sig_map
                .sig_pair
                .iter()
                .find(|p| p.is_from(&key.public_key()))
                .unwrap();
            assert!(key.public_key().verify(&signed.body_bytes, pair.signature.bytes()));
        }
    }
}

#[test]
fn test_sign_with_external_signer() {
    let key = PrivateKey::generate_ed25519();
    let mut envelope = frozen_envelope(&nodes());

    envelope
        .sign_with(key.public_key(), |body| key.sign(body))
        .unwrap();
    assert_eq!(envelope.signatures()[&key.public_key()].len(), 3);
    assert!(envelope.verify_signatures().unwrap());

    // A failing signer leaves the envelope untouched
    let other = PrivateKey::generate_ed25519();
    let before = envelope.to_bytes().unwrap();
    let result = envelope.sign_with(other.public_key(), |_| {
        Err::<Vec<u8>, _>(TransactionError::MalformedBytes("signer offline".into()))
    });
    assert!(result.is_err());
    assert!(!envelope.is_signed_by(&other.public_key()));
    assert_eq!(envelope.to_bytes().unwrap(), before);
}

#[test]
fn test_remove_signer_restores_bytes() {
    let payer = PrivateKey::generate_ed25519();
    let extra = PrivateKey::generate_ecdsa();
    let mut envelope = frozen_envelope(&nodes());
    envelope.sign(&payer).unwrap();
    let payer_only = envelope.to_bytes().unwrap();

    envelope.sign(&extra).unwrap();
    assert_ne!(envelope.to_bytes().unwrap(), payer_only);

    let removed = envelope.remove_signature(&extra.public_key()).unwrap().unwrap();
    assert_eq!(removed.len(), 3);
    assert_eq!(envelope.to_bytes().unwrap(), payer_only);
}

#[test]
fn test_frozen_envelope_rejects_edits() {
    let mut envelope = frozen_envelope(&nodes());
    assert!(matches!(
        envelope.set_memo("late"),
        Err(TransactionError::AlreadyFrozen)
    ));
    assert!(matches!(
        envelope.freeze(&nodes()),
        Err(TransactionError::AlreadyFrozen)
    ));

    let mut unfrozen = TransactionEnvelope::new(OperationBody::new("noop", vec![]));
    assert!(matches!(
        unfrozen.sign(&PrivateKey::generate_ed25519()),
        Err(TransactionError::NotFrozen)
    ));
}
