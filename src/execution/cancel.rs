//! Caller-side cancellation of in-flight executions.

use tokio::sync::broadcast;

/// Cancels every execution subscribed to it.
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: broadcast::Sender<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Signal to hand to `Client::execute_with_cancel`.
    pub fn subscribe(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(());
    }

    /// Executions still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a [`Cancellation`].
#[derive(Debug)]
pub struct CancelSignal {
    rx: Option<broadcast::Receiver<()>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Resolves once cancelled. A dropped `Cancellation` counts as cancelled.
    pub async fn cancelled(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.recv().await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_subscriber() {
        let cancellation = Cancellation::new();
        let mut signal = cancellation.subscribe();
        assert_eq!(cancellation.receiver_count(), 1);

        cancellation.cancel();
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut signal = CancelSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(fired.is_err());
    }
}
