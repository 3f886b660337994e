//! Live push channels feeding demand counts and the remote signal mirror.

pub mod aggregator;
pub mod http;

pub use aggregator::{ApplyOutcome, FeedUpdate, LiveMetricsAggregator, TaggedUpdate};
pub use http::{FeedEndpoints, HttpFeedSource};

use crate::prelude::{ControlResult, Direction, Junction};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// How demand channels are laid out for one junction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedLayout {
    /// One stream per direction.
    #[default]
    PerDirection,
    /// A single stream whose frames carry `all_directions`.
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Demand(Direction),
    SignalStatus,
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub junction: Junction,
    pub kind: FeedKind,
}

impl FeedRequest {
    pub fn channel_name(&self) -> String {
        match self.kind {
            FeedKind::Demand(direction) => format!("demand/{}", direction),
            FeedKind::SignalStatus => "signal-status".to_string(),
        }
    }
}

/// Raw event payloads of one open channel. An `Err` item ends the channel.
pub type FrameStream = BoxStream<'static, ControlResult<String>>;

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn open(&self, request: &FeedRequest) -> ControlResult<FrameStream>;
}

/// Channels needed to monitor `junction` under `layout`.
pub fn feed_requests(junction: &Junction, layout: FeedLayout) -> Vec<FeedRequest> {
    let demand: Vec<Direction> = match layout {
        FeedLayout::PerDirection => Direction::ALL.to_vec(),
        FeedLayout::Combined => vec![Direction::North],
    };
    demand
        .into_iter()
        .map(FeedKind::Demand)
        .chain(std::iter::once(FeedKind::SignalStatus))
        .map(|kind| FeedRequest {
            junction: junction.clone(),
            kind,
        })
        .collect()
}
