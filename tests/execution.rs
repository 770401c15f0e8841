//! Execution engine tests against programmable transports.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use ledger_client::config::schema::OperatorConfig;
use ledger_client::execution::{Cancellation, ExecuteError};
use ledger_client::transaction::TransactionError;
use ledger_client::{
    AccountId, Client, PrivateKey, Status, TransactionEnvelope, TransportError, TransportResponse,
};

mod common;

use common::{frozen_envelope, test_config, ProgrammableTransport};

fn ids(client: &Client) -> Vec<AccountId> {
    client.network().node_account_ids()
}

#[tokio::test(start_paused = true)]
async fn test_always_retryable_stops_at_max_attempts() {
    let transport = ProgrammableTransport::fixed(Status::Busy);
    let client = Client::new(test_config(3), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let err = client.execute(&mut envelope).await.unwrap_err();
    match err {
        ExecuteError::MaxAttemptsExceeded {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 5);
            assert_eq!(last_status, Some(Status::Busy));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.call_count(), 5);
    assert!(!envelope.is_executed());
}

#[tokio::test(start_paused = true)]
async fn test_retries_sleep_exponential_backoff() {
    let transport = ProgrammableTransport::fixed(Status::Busy);
    let mut config = test_config(2);
    config.retries.max_attempts = 4;
    config.retries.min_backoff_ms = 10;
    config.retries.max_backoff_ms = 1_000;
    let client = Client::new(config, transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let started = Instant::now();
    assert!(client.execute(&mut envelope).await.is_err());
    let elapsed = started.elapsed();

    // 20 + 40 + 80 ms between four attempts, none after the last
    assert!(elapsed >= Duration::from_millis(140), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(150), "elapsed {elapsed:?}");
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped_at_max() {
    let transport = ProgrammableTransport::fixed(Status::Busy);
    let mut config = test_config(2);
    config.retries.max_attempts = 4;
    config.retries.min_backoff_ms = 10;
    config.retries.max_backoff_ms = 30;
    let client = Client::new(config, transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let started = Instant::now();
    assert!(client.execute(&mut envelope).await.is_err());
    let elapsed = started.elapsed();

    // 20 + 30 + 30 ms
    assert!(elapsed >= Duration::from_millis(80), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(90), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_fatal_status_makes_one_attempt() {
    let transport = ProgrammableTransport::fixed(Status::InvalidSignature);
    let client = Client::new(test_config(3), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let err = client.execute(&mut envelope).await.unwrap_err();
    assert!(matches!(
        err,
        ExecuteError::Status {
            status: Status::InvalidSignature,
            ..
        }
    ));
    assert_eq!(err.status(), Some(Status::InvalidSignature));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_success_after_retries_rotates_nodes() {
    let transport = ProgrammableTransport::scripted(vec![
        Status::Busy,
        Status::PlatformNotActive,
        Status::Success,
    ]);
    let client = Client::new(test_config(3), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let response = client.execute(&mut envelope).await.unwrap();
    let nodes = transport.nodes();
    assert_eq!(nodes.len(), 3);
    assert_ne!(nodes[0], nodes[1]);
    assert_ne!(nodes[1], nodes[2]);
    assert_eq!(response.node_id, nodes[2]);
    assert_eq!(response.status, Status::Success);
    assert_eq!(response.payload, 2u32.to_be_bytes().to_vec());
    assert_eq!(response.transaction_id, envelope.transaction_id().unwrap());
    assert!(envelope.is_executed());
}

#[tokio::test(start_paused = true)]
async fn test_response_hash_matches_submitted_body() {
    let transport = ProgrammableTransport::fixed(Status::Ok);
    let client = Client::new(test_config(2), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let response = client.execute(&mut envelope).await.unwrap();
    let index = envelope
        .node_account_ids()
        .iter()
        .position(|id| *id == response.node_id)
        .unwrap();
    assert_eq!(response.transaction_hash, envelope.transaction_hash_for(index).unwrap());
    assert_eq!(transport.requests()[0], envelope.signed_bytes_for(index).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_per_transaction_max_attempts() {
    let transport = ProgrammableTransport::fixed(Status::Busy);
    let client = Client::new(test_config(2), transport.clone()).unwrap();

    let mut envelope = TransactionEnvelope::new(ledger_client::transaction::OperationBody::new("noop", vec![]));
    envelope
        .set_transaction_id(ledger_client::TransactionId::generate(AccountId::from(1001)))
        .unwrap()
        .set_max_attempts(2)
        .unwrap();
    envelope.freeze(&ids(&client)).unwrap();

    assert!(client.execute(&mut envelope).await.is_err());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unfrozen_envelope_is_rejected() {
    let transport = ProgrammableTransport::fixed(Status::Ok);
    let client = Client::new(test_config(1), transport.clone()).unwrap();
    let mut envelope = TransactionEnvelope::new(ledger_client::transaction::OperationBody::new("noop", vec![]));

    let err = client.execute(&mut envelope).await.unwrap_err();
    assert!(matches!(err, ExecuteError::Transaction(TransactionError::NotFrozen)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_backs_off_node() {
    let transport = ProgrammableTransport::new(|call, _| async move {
        if call == 0 {
            Err(TransportError::Unavailable("connection refused".into()))
        } else {
            Ok(TransportResponse::new(Status::Ok, Vec::new()))
        }
    });
    let client = Client::new(test_config(2), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let response = client.execute(&mut envelope).await.unwrap();
    let nodes = transport.nodes();
    assert_eq!(nodes.len(), 2);
    assert_eq!(response.node_id, nodes[1]);

    let failed = client.network().node(&nodes[0]).unwrap();
    assert!(!failed.is_healthy());
    assert!(failed.remaining_backoff() > Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_transport_error_stops() {
    let transport = ProgrammableTransport::new(|_, _| async move {
        Err::<TransportResponse, _>(TransportError::Other("malformed request".into()))
    });
    let client = Client::new(test_config(3), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let err = client.execute(&mut envelope).await.unwrap_err();
    assert!(matches!(err, ExecuteError::Transport(TransportError::Other(_))));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_caller_cancellation() {
    let transport = ProgrammableTransport::new(|_, _| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(TransportResponse::new(Status::Ok, Vec::new()))
    });
    let client = Client::new(test_config(2), transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let cancellation = Cancellation::new();
    let signal = cancellation.subscribe();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancellation.cancel();
    });

    let err = client.execute_with_cancel(&mut envelope, signal).await.unwrap_err();
    assert!(matches!(err, ExecuteError::Cancelled));
    assert_eq!(transport.call_count(), 1);
    assert!(!envelope.is_executed());
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_cancels() {
    let transport = ProgrammableTransport::new(|_, _| async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        Ok(TransportResponse::new(Status::Busy, Vec::new()))
    });
    let mut config = test_config(2);
    config.timeouts.request_secs = 1;
    config.retries.max_attempts = 10;
    let client = Client::new(config, transport.clone()).unwrap();
    let mut envelope = frozen_envelope(&ids(&client));

    let err = client.execute(&mut envelope).await.unwrap_err();
    assert!(matches!(err, ExecuteError::Cancelled));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_operator_signs_and_pays() {
    let operator_key = PrivateKey::generate_ed25519();
    let mut config = test_config(3);
    config.operator = Some(OperatorConfig {
        account_id: "0.0.1001".into(),
        private_key_der_hex: hex::encode(operator_key.to_bytes_der()),
    });
    config.transactions.max_nodes_per_transaction = Some(2);

    let transport = ProgrammableTransport::fixed(Status::Ok);
    let client = Client::new(config, transport.clone()).unwrap();
    assert_eq!(client.operator_account_id(), Some(AccountId::from(1001)));

    let mut envelope = TransactionEnvelope::new(ledger_client::transaction::OperationBody::new("noop", vec![9]));
    envelope.freeze_with(&client).unwrap();
    assert_eq!(envelope.transaction_id().unwrap().account_id, AccountId::from(1001));
    assert_eq!(envelope.node_account_ids().len(), 2);
    assert!(!envelope.is_signed());

    client.execute(&mut envelope).await.unwrap();
    assert!(envelope.is_signed_by(&operator_key.public_key()));
    assert!(envelope.verify_signatures().unwrap());
}

fn operator_client(transport: Arc<ProgrammableTransport>) -> (Client, PrivateKey) {
    let operator_key = PrivateKey::generate_ed25519();
    let mut client = Client::new(test_config(3), transport).unwrap();
    client.set_operator(AccountId::from(1001), operator_key.clone());
    (client, operator_key)
}

#[tokio::test(start_paused = true)]
async fn test_expired_generated_id_is_regenerated() {
    let transport = ProgrammableTransport::scripted(vec![Status::TransactionExpired, Status::Ok]);
    let (client, operator_key) = operator_client(transport.clone());

    let mut envelope = TransactionEnvelope::new(ledger_client::transaction::OperationBody::new("noop", vec![1]));
    envelope.freeze_with(&client).unwrap();
    let original = envelope.transaction_id().unwrap();

    let response = client.execute(&mut envelope).await.unwrap();
    assert_eq!(transport.call_count(), 2);
    assert_ne!(response.transaction_id, original);
    assert_eq!(response.transaction_id.account_id, original.account_id);
    assert_eq!(envelope.transaction_id(), Some(response.transaction_id));
    assert!(envelope.is_signed_by(&operator_key.public_key()));
    assert!(envelope.verify_signatures().unwrap());

    // the retry carried a body with the new id
    let requests = transport.requests();
    assert_ne!(requests[0], requests[1]);
}

#[tokio::test(start_paused = true)]
async fn test_expired_explicit_id_is_fatal() {
    let transport = ProgrammableTransport::fixed(Status::TransactionExpired);
    let (client, _) = operator_client(transport.clone());
    let mut envelope = frozen_envelope(&ids(&client));

    let err = client.execute(&mut envelope).await.unwrap_err();
    assert!(matches!(
        err,
        ExecuteError::Status {
            status: Status::TransactionExpired,
            ..
        }
    ));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_with_foreign_signer_is_fatal() {
    let transport = ProgrammableTransport::fixed(Status::TransactionExpired);
    let (client, _) = operator_client(transport.clone());

    let mut envelope = TransactionEnvelope::new(ledger_client::transaction::OperationBody::new("noop", vec![1]));
    envelope.freeze_with(&client).unwrap();
    envelope.sign(&PrivateKey::generate_ecdsa()).unwrap();

    assert!(client.execute(&mut envelope).await.is_err());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_freeze_with_requires_payer() {
    let client = Client::new(test_config(1), ProgrammableTransport::fixed(Status::Ok)).unwrap();
    let mut envelope = TransactionEnvelope::new(ledger_client::transaction::OperationBody::new("noop", vec![]));
    assert!(matches!(
        envelope.freeze_with(&client),
        Err(TransactionError::MissingTransactionId)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_executions_share_rotation() {
    let transport = ProgrammableTransport::fixed(Status::Ok);
    let client = Arc::new(Client::new(test_config(3), transport.clone()).unwrap());
    let envelope = frozen_envelope(&ids(&client));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let client = client.clone();
        let mut envelope = envelope.clone();
        handles.push(tokio::spawn(async move { client.execute(&mut envelope).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(transport.call_count(), 6);
}
