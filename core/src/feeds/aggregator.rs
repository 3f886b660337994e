use super::{feed_requests, FeedKind, FeedLayout, FeedRequest, FeedSource};
use crate::feed_interface::{DemandSnapshot, DemandUpdate, SignalStatus};
use crate::prelude::{ControlResult, Direction, Junction, JunctionId};
use crate::telemetry::{ControlMetrics, CycleLog};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const UPDATE_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    Demand(DemandUpdate),
    Signal(SignalStatus),
}

/// Decoded frame labelled with the junction whose channel produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedUpdate {
    pub junction: JunctionId,
    pub update: FeedUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    DemandChanged,
    DemandUnchanged,
    SignalMirrored,
    /// Frame belongs to a junction that is no longer monitored.
    Stale,
}

/// Keeps the latest demand per direction for the monitored junction.
///
/// Channels are never retried here: a dropped channel stays closed until the next
/// `subscribe`.
pub struct LiveMetricsAggregator {
    source: Arc<dyn FeedSource>,
    layout: FeedLayout,
    metrics: Arc<ControlMetrics>,
    channels: JoinSet<()>,
    demand: Option<DemandSnapshot>,
    remote_signal: Option<Direction>,
}

impl LiveMetricsAggregator {
    pub fn new(source: Arc<dyn FeedSource>, layout: FeedLayout, metrics: Arc<ControlMetrics>) -> Self {
        Self {
            source,
            layout,
            metrics,
            channels: JoinSet::new(),
            demand: None,
            remote_signal: None,
        }
    }

    /// Closes every channel of the previous junction, then opens the new ones.
    pub async fn subscribe(&mut self, junction: &Junction) -> mpsc::Receiver<TaggedUpdate> {
        self.unsubscribe().await;
        self.demand = Some(DemandSnapshot::empty(junction.id.clone()));

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        for request in feed_requests(junction, self.layout) {
            self.channels.spawn(pump(
                self.source.clone(),
                request,
                tx.clone(),
                self.metrics.clone(),
            ));
        }
        rx
    }

    /// Aborts all open channels and waits until they are gone.
    pub async fn unsubscribe(&mut self) {
        self.channels.shutdown().await;
        self.demand = None;
        self.remote_signal = None;
    }

    pub fn demand(&self) -> Option<&DemandSnapshot> {
        self.demand.as_ref()
    }

    pub fn remote_signal(&self) -> Option<Direction> {
        self.remote_signal
    }

    pub fn apply(&mut self, tagged: TaggedUpdate) -> ApplyOutcome {
        let demand = match self.demand.as_mut() {
            Some(demand) if demand.junction == tagged.junction => demand,
            current => {
                if let Some(current) = current {
                    CycleLog::new(current.junction.clone()).stale_frame(&tagged.junction);
                }
                self.metrics.record_stale_frame();
                return ApplyOutcome::Stale;
            }
        };

        match tagged.update {
            FeedUpdate::Demand(update) => {
                self.metrics.record_frame_applied();
                if demand.apply(&update) {
                    ApplyOutcome::DemandChanged
                } else {
                    ApplyOutcome::DemandUnchanged
                }
            }
            FeedUpdate::Signal(status) => {
                self.metrics.record_frame_applied();
                self.remote_signal = Some(status.active);
                ApplyOutcome::SignalMirrored
            }
        }
    }
}

fn decode(request: &FeedRequest, payload: &str) -> ControlResult<FeedUpdate> {
    match request.kind {
        FeedKind::Demand(direction) => {
            DemandUpdate::parse(payload, Some(direction)).map(FeedUpdate::Demand)
        }
        FeedKind::SignalStatus => SignalStatus::parse(payload).map(FeedUpdate::Signal),
    }
}

/// Reads one channel until it ends, fails, or the receiving side goes away.
async fn pump(
    source: Arc<dyn FeedSource>,
    request: FeedRequest,
    updates: mpsc::Sender<TaggedUpdate>,
    metrics: Arc<ControlMetrics>,
) {
    let log = CycleLog::new(request.junction.id.clone());
    let channel = request.channel_name();

    let mut frames = match source.open(&request).await {
        Ok(frames) => frames,
        Err(err) => {
            metrics.record_channel_closed();
            log.channel_closed(&channel, Some(&err));
            return;
        }
    };

    while let Some(frame) = frames.next().await {
        let payload = match frame {
            Ok(payload) => payload,
            Err(err) => {
                metrics.record_channel_closed();
                log.channel_closed(&channel, Some(&err));
                return;
            }
        };

        match decode(&request, &payload) {
            Ok(update) => {
                let tagged = TaggedUpdate {
                    junction: request.junction.id.clone(),
                    update,
                };
                if updates.send(tagged).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                metrics.record_frame_dropped();
                log.frame_dropped(&channel, &err);
            }
        }
    }

    metrics.record_channel_closed();
    log.channel_closed(&channel, None);
}
