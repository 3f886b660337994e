use super::template::{combined_frame, direction_frame, signal_frame};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use signalcore::feeds::{FeedKind, FeedLayout, FeedRequest, FeedSource, FrameStream};
use signalcore::{ControlResult, Direction};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Configuration for generating synthetic demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub rounds: u32,
    pub ticks_per_round: u32,
    /// Mean vehicle count per direction, in cyclic order.
    pub base_demand: [u32; 4],
    pub jitter: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            rounds: 12,
            ticks_per_round: 15,
            base_demand: [24, 8, 16, 4],
            jitter: 6,
        }
    }
}

struct OpenChannel {
    kind: FeedKind,
    junction: String,
    frames: mpsc::UnboundedSender<ControlResult<String>>,
}

/// Feed source whose frames are produced on demand from a seeded generator.
pub struct SyntheticFeeds {
    config: GeneratorConfig,
    layout: FeedLayout,
    rng: Mutex<StdRng>,
    channels: Mutex<Vec<OpenChannel>>,
}

impl SyntheticFeeds {
    pub fn new(config: GeneratorConfig, layout: FeedLayout) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            layout,
            rng: Mutex::new(rng),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Channels whose reader is still attached.
    pub fn open_channels(&self) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(|p| p.into_inner());
        channels.retain(|channel| !channel.frames.is_closed());
        channels.len()
    }

    pub fn next_counts(&self) -> [u32; 4] {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        let jitter = self.config.jitter;
        self.config.base_demand.map(|base| {
            let offset = rng.gen_range(0..=jitter * 2);
            (base + offset).saturating_sub(jitter)
        })
    }

    /// Sends `counts` on every open demand channel; returns the frames delivered.
    pub fn emit_demand(&self, counts: [u32; 4]) -> usize {
        self.emit(|channel| match (channel.kind, self.layout) {
            (FeedKind::Demand(_), FeedLayout::Combined) => {
                Some(combined_frame(&channel.junction, counts))
            }
            (FeedKind::Demand(direction), FeedLayout::PerDirection) => {
                Some(direction_frame(direction, counts[direction.index()]))
            }
            (FeedKind::SignalStatus, _) => None,
        })
    }

    /// Reports `direction` on the status channels of `junction` only.
    pub fn emit_signal(&self, junction: &str, direction: Direction) -> usize {
        self.emit(|channel| match channel.kind {
            FeedKind::SignalStatus if channel.junction == junction => {
                Some(signal_frame(direction))
            }
            FeedKind::SignalStatus | FeedKind::Demand(_) => None,
        })
    }

    fn emit(&self, frame_for: impl Fn(&OpenChannel) -> Option<String>) -> usize {
        let channels = self.channels.lock().unwrap_or_else(|p| p.into_inner());
        let mut delivered = 0;
        for channel in channels.iter() {
            if let Some(frame) = frame_for(channel) {
                if channel.frames.send(Ok(frame)).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

#[async_trait]
impl FeedSource for SyntheticFeeds {
    async fn open(&self, request: &FeedRequest) -> ControlResult<FrameStream> {
        let (frames, rx) = mpsc::unbounded_channel();
        self.channels
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(OpenChannel {
                kind: request.kind,
                junction: request.junction.feed_key().to_string(),
                frames,
            });
        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });
        Ok(stream.boxed())
    }
}
