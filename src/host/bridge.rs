// HostBridge - Connects host notifications to the scheduler and orchestrator
//
// The host (page glue, a test harness, the binary) pushes events into a
// bounded channel. A single tokio task owns the ChangeScheduler, sleeps until
// its pending deadline, and spawns orchestrator passes when it fires. Passes
// run on their own tasks so a suspend signal is still handled while a pass
// waits on menu polling.

use crate::models::ChangeBatch;
use crate::services::orchestrator::{ControlMessage, ControlResponse, Orchestrator};
use crate::services::scheduler::{ChangeScheduler, SchedulerConfig, Trigger};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Channel capacity; events beyond this are dropped with a warning.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Everything the host can tell the filter.
#[derive(Debug)]
pub enum HostEvent {
    /// Nodes were added to or removed from the document.
    Mutations(ChangeBatch),
    /// The consuming context became visible (`true`) or hidden (`false`).
    Visibility(bool),
    /// A control request; the response goes back on the oneshot.
    Message(ControlMessage, oneshot::Sender<ControlResponse>),
}

/// Owns the event loop task.
///
/// # Example
/// ```ignore
/// let orchestrator = Arc::new(Orchestrator::new(collaborators, store));
/// orchestrator.initialize().await;
///
/// let bridge = HostBridge::spawn(orchestrator, SchedulerConfig::default());
/// let handle = bridge.handle();
///
/// // From the host's mutation callback
/// handle.notify_mutations(ChangeBatch::added(nodes));
///
/// // From the host's visibility callback
/// handle.set_visibility(false);
/// ```
pub struct HostBridge {
    handle: HostBridgeHandle,
    task: JoinHandle<()>,
}

impl HostBridge {
    /// Start the event loop and run one initial pass.
    pub fn spawn(orchestrator: Arc<Orchestrator>, config: SchedulerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(run_event_loop(
            orchestrator,
            ChangeScheduler::new(config),
            event_rx,
        ));

        Self {
            handle: HostBridgeHandle { event_tx },
            task,
        }
    }

    /// Cloneable sender for host callbacks.
    pub fn handle(&self) -> HostBridgeHandle {
        self.handle.clone()
    }

    /// Stop accepting events and wait for the loop to drain.
    ///
    /// Other outstanding [`HostBridgeHandle`]s keep the loop alive until
    /// they are dropped too.
    pub async fn shutdown(self) {
        drop(self.handle);
        if let Err(e) = self.task.await {
            tracing::warn!("Host event loop ended abnormally: {}", e);
        }
    }
}

/// Lightweight handle that can be cloned into host callbacks.
#[derive(Clone, Debug)]
pub struct HostBridgeHandle {
    event_tx: mpsc::Sender<HostEvent>,
}

impl HostBridgeHandle {
    fn send(&self, event: HostEvent) -> bool {
        match self.event_tx.try_send(event) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Host event channel full - dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Failed to send host event - event loop has stopped");
                false
            }
        }
    }

    /// Report a batch of structural changes. Returns false if it was dropped.
    pub fn notify_mutations(&self, batch: ChangeBatch) -> bool {
        self.send(HostEvent::Mutations(batch))
    }

    pub fn set_visibility(&self, visible: bool) -> bool {
        self.send(HostEvent::Visibility(visible))
    }

    /// Send a control message and wait for its response.
    ///
    /// Returns `None` if the event loop is gone.
    pub async fn request(&self, message: ControlMessage) -> Option<ControlResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.event_tx
            .send(HostEvent::Message(message, reply_tx))
            .await
            .ok()?;
        reply_rx.await.ok()
    }
}

fn fire(orchestrator: &Arc<Orchestrator>, trigger: Trigger) {
    tracing::debug!("Scheduler fired: {:?}", trigger);
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        orchestrator.run_pass().await;
    });
}

async fn run_event_loop(
    orchestrator: Arc<Orchestrator>,
    mut scheduler: ChangeScheduler,
    mut event_rx: mpsc::Receiver<HostEvent>,
) {
    tracing::debug!("Host event loop started");

    if !orchestrator.is_active() {
        let _ = scheduler.set_active(false);
    } else {
        fire(&orchestrator, Trigger::Resumed);
    }

    loop {
        let deadline = scheduler.deadline();

        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    HostEvent::Mutations(batch) => {
                        let extractor = Arc::clone(orchestrator.extractor());
                        let trigger = scheduler.on_batch(&batch, Instant::now(), |node| {
                            extractor.contains_item(node)
                        });
                        if let Some(trigger) = trigger {
                            fire(&orchestrator, trigger);
                        }
                    }
                    HostEvent::Visibility(visible) => {
                        orchestrator.set_active(visible);
                        if let Some(trigger) = scheduler.set_active(visible) {
                            fire(&orchestrator, trigger);
                        }
                    }
                    HostEvent::Message(message, reply_tx) => {
                        let orchestrator = Arc::clone(&orchestrator);
                        tokio::spawn(async move {
                            let response = orchestrator.handle_message(message).await;
                            // Caller may have stopped waiting
                            let _ = reply_tx.send(response);
                        });
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(trigger) = scheduler.on_deadline(Instant::now()) {
                    fire(&orchestrator, trigger);
                }
            }
        }
    }

    tracing::debug!("Host event loop terminated");
}
