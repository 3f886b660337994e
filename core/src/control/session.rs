use super::cycle::{CycleEvent, CycleState, SignalCycle};
use super::ticker::Ticker;
use crate::allocation::{GreenAllocation, GreenTimeAllocator};
use crate::authority::{CredentialVerifier, Notification, Notifier, SignalAuthority};
use crate::feed_interface::DemandSnapshot;
use crate::feeds::{ApplyOutcome, FeedLayout, FeedSource, LiveMetricsAggregator, TaggedUpdate};
use crate::prelude::{ControlError, ControlResult, Credential, Direction, Junction};
use crate::telemetry::{ControlMetrics, CycleLog};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 16;

/// Collaborators shared by every session a controller starts.
#[derive(Clone)]
pub struct SessionDeps {
    pub feeds: Arc<dyn FeedSource>,
    pub layout: FeedLayout,
    pub authority: Arc<dyn SignalAuthority>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub allocator: GreenTimeAllocator,
    pub metrics: Arc<ControlMetrics>,
    pub tick_period: Duration,
}

/// Consistent read-only picture of one session, replaced wholesale on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub junction: Junction,
    pub demand: DemandSnapshot,
    pub allocation: GreenAllocation,
    pub cycle: CycleState,
    pub remote_signal: Option<Direction>,
    pub running: bool,
}

enum SessionCommand {
    Override {
        direction: Direction,
        credential: Credential,
        reply: oneshot::Sender<CycleState>,
    },
    Sync(oneshot::Sender<SessionView>),
}

/// Monitoring of one junction: the control loop, its feed channels and its
/// notification queue. Dropping the handle ends the session in the background;
/// `shutdown` ends it and waits.
pub struct MonitoringSession {
    junction: Junction,
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    verifier: Arc<dyn CredentialVerifier>,
    metrics: Arc<ControlMetrics>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MonitoringSession {
    pub fn start(junction: Junction, deps: SessionDeps, ticker: Ticker) -> Self {
        let cycle = SignalCycle::new(
            deps.allocator
                .allocate(&DemandSnapshot::empty(junction.id.clone())),
        );
        let initial = SessionView {
            junction: junction.clone(),
            demand: DemandSnapshot::empty(junction.id.clone()),
            allocation: *cycle.allocation(),
            cycle: cycle.state(),
            remote_signal: None,
            running: true,
        };
        let (view_tx, view) = watch::channel(initial);
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (stop, stop_rx) = oneshot::channel();

        let control = ControlLoop {
            junction: junction.clone(),
            cycle,
            allocator: deps.allocator,
            aggregator: LiveMetricsAggregator::new(
                deps.feeds.clone(),
                deps.layout,
                deps.metrics.clone(),
            ),
            notifier: Notifier::spawn(
                junction.clone(),
                deps.authority.clone(),
                deps.metrics.clone(),
            ),
            metrics: deps.metrics.clone(),
            log: CycleLog::new(junction.id.clone()),
            view: view_tx,
            commands: command_rx,
            stop: stop_rx,
            ticker,
        };
        let task = tokio::spawn(control.run());

        Self {
            junction,
            commands,
            view,
            verifier: deps.verifier,
            metrics: deps.metrics,
            stop: Some(stop),
            task: Some(task),
        }
    }

    pub fn junction(&self) -> &Junction {
        &self.junction
    }

    /// Latest published view; never blocks on the control loop.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Round-trips through the control loop, so every tick queued before this call
    /// has been applied in the returned view.
    pub async fn sync(&self) -> ControlResult<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Sync(reply))
            .await
            .map_err(|_| ControlError::SessionClosed)?;
        rx.await.map_err(|_| ControlError::SessionClosed)
    }

    /// Makes `direction` active now. Requires a credential the verifier accepts.
    pub async fn override_signal(
        &self,
        direction: Direction,
        credential: Option<&Credential>,
    ) -> ControlResult<CycleState> {
        let credential = match credential {
            Some(credential) if self.verifier.verify(credential) => credential.clone(),
            _ => {
                self.metrics.record_rejected_override();
                return Err(ControlError::Unauthorized(
                    "missing or invalid credential".into(),
                ));
            }
        };

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Override {
                direction,
                credential,
                reply,
            })
            .await
            .map_err(|_| ControlError::SessionClosed)?;
        rx.await.map_err(|_| ControlError::SessionClosed)
    }

    /// Stops the tick source, closes every feed channel and drains pending
    /// notifications before returning.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

struct ControlLoop {
    junction: Junction,
    cycle: SignalCycle,
    allocator: GreenTimeAllocator,
    aggregator: LiveMetricsAggregator,
    notifier: Notifier,
    metrics: Arc<ControlMetrics>,
    log: CycleLog,
    view: watch::Sender<SessionView>,
    commands: mpsc::Receiver<SessionCommand>,
    stop: oneshot::Receiver<()>,
    ticker: Ticker,
}

impl ControlLoop {
    async fn run(mut self) {
        let mut updates = self.aggregator.subscribe(&self.junction).await;

        loop {
            tokio::select! {
                biased;
                _ = &mut self.stop => break,
                _ = self.ticker.tick() => self.on_tick(),
                Some(update) = updates.recv() => self.on_update(update),
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
        }

        self.aggregator.unsubscribe().await;
        drop(updates);
        self.view.send_modify(|view| view.running = false);
        self.notifier.close().await;
    }

    fn on_tick(&mut self) {
        self.metrics.record_tick();
        if self.cycle.is_idle() {
            self.log.started(&self.cycle.state());
        }
        if let Some(event) = self.cycle.tick() {
            self.metrics.record_advance();
            self.dispatch(event, None);
        }
        self.publish();
    }

    fn on_update(&mut self, update: TaggedUpdate) {
        match self.aggregator.apply(update) {
            ApplyOutcome::DemandChanged => {
                if let Some(demand) = self.aggregator.demand() {
                    self.cycle.set_allocation(self.allocator.allocate(demand));
                }
                self.publish();
            }
            ApplyOutcome::SignalMirrored => self.publish(),
            ApplyOutcome::DemandUnchanged | ApplyOutcome::Stale => {}
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Override {
                direction,
                credential,
                reply,
            } => {
                self.metrics.record_override();
                let event = self.cycle.override_to(direction);
                self.dispatch(event, Some(credential));
                self.publish();
                let _ = reply.send(self.cycle.state());
            }
            SessionCommand::Sync(reply) => {
                let _ = reply.send(self.view.borrow().clone());
            }
        }
    }

    /// Called after the cycle state has changed.
    fn dispatch(&self, event: CycleEvent, credential: Option<Credential>) {
        self.log.transition(&event, &self.cycle.state());
        self.notifier.enqueue(Notification { event, credential });
    }

    fn publish(&self) {
        let demand = self
            .aggregator
            .demand()
            .cloned()
            .unwrap_or_else(|| DemandSnapshot::empty(self.junction.id.clone()));
        self.view.send_replace(SessionView {
            junction: self.junction.clone(),
            demand,
            allocation: *self.cycle.allocation(),
            cycle: self.cycle.state(),
            remote_signal: self.aggregator.remote_signal(),
            running: true,
        });
    }
}
