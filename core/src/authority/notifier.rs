use super::SignalAuthority;
use crate::control::cycle::CycleEvent;
use crate::prelude::{Credential, Junction};
use crate::telemetry::{ControlMetrics, CycleLog};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Notification {
    pub event: CycleEvent,
    pub credential: Option<Credential>,
}

/// Per-session delivery queue. Transitions are enqueued without waiting, sent in
/// order, and failures are logged without retry.
pub struct Notifier {
    queue: mpsc::UnboundedSender<Notification>,
    worker: JoinHandle<()>,
}

impl Notifier {
    pub fn spawn(
        junction: Junction,
        authority: Arc<dyn SignalAuthority>,
        metrics: Arc<ControlMetrics>,
    ) -> Self {
        let (queue, mut pending) = mpsc::unbounded_channel::<Notification>();
        let worker = tokio::spawn(async move {
            let log = CycleLog::new(junction.id.clone());
            while let Some(notification) = pending.recv().await {
                let direction = notification.event.direction();
                let result = authority
                    .notify(&junction, direction, notification.credential.as_ref())
                    .await;
                metrics.record_notification(result.is_ok());
                if let Err(err) = result {
                    log.notify_failed(direction, &err);
                }
            }
        });
        Self { queue, worker }
    }

    pub fn enqueue(&self, notification: Notification) {
        // The worker only stops after `close`, so a send error cannot occur earlier.
        let _ = self.queue.send(notification);
    }

    /// Delivers what is already queued, then stops the worker.
    pub async fn close(self) {
        drop(self.queue);
        let _ = self.worker.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Direction;
    use crate::testing::{within, RecordingAuthority};

    #[tokio::test]
    async fn delivers_in_order_and_survives_failures() {
        let (authority, mut sent) = RecordingAuthority::new();
        let metrics = Arc::new(ControlMetrics::new());
        let notifier = Notifier::spawn(
            Junction::new("Junction 01", "01_"),
            authority.clone(),
            metrics.clone(),
        );

        authority.set_failing(true);
        notifier.enqueue(Notification {
            event: CycleEvent::AutomaticAdvance(Direction::East),
            credential: None,
        });
        notifier.enqueue(Notification {
            event: CycleEvent::ManualOverride(Direction::West),
            credential: Some(Credential::bearer("tok")),
        });
        notifier.close().await;

        let first = within(sent.recv()).await.unwrap();
        let second = within(sent.recv()).await.unwrap();
        assert_eq!(first.direction, Direction::East);
        assert_eq!(second.direction, Direction::West);
        assert_eq!(second.credential.as_deref(), Some("tok"));
        assert_eq!(metrics.snapshot().notifications_failed, 2);
    }
}
