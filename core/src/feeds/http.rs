use super::{FeedKind, FeedRequest, FeedSource, FrameStream};
use crate::feed_interface::SseDecoder;
use crate::prelude::{ControlError, ControlResult};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// URL templates for the push endpoints. `{junction}` and `{direction}` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEndpoints {
    pub demand_url: String,
    pub signal_status_url: String,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            demand_url: "http://localhost:8002/drone/junction_vehicle_count/{direction}?junction={junction}"
                .to_string(),
            signal_status_url: "http://localhost:8000/junction_signal_status?junction={junction}"
                .to_string(),
        }
    }
}

impl FeedEndpoints {
    pub fn url_for(&self, request: &FeedRequest) -> String {
        match request.kind {
            FeedKind::Demand(direction) => self
                .demand_url
                .replace("{junction}", request.junction.feed_key())
                .replace("{direction}", direction.as_str()),
            FeedKind::SignalStatus => self
                .signal_status_url
                .replace("{junction}", request.junction.authority_key()),
        }
    }
}

/// Opens Server-Sent-Events streams over HTTP.
pub struct HttpFeedSource {
    client: Client,
    endpoints: FeedEndpoints,
}

impl HttpFeedSource {
    /// Only connection setup is bounded; an open stream may stay idle indefinitely.
    pub fn new(endpoints: FeedEndpoints, connect_timeout: Duration) -> ControlResult<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client, endpoints })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn open(&self, request: &FeedRequest) -> ControlResult<FrameStream> {
        let url = self.endpoints.url_for(request);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ControlError::Transport(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let mut decoder = SseDecoder::new();
        let frames = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.feed(&bytes),
                Err(err) => vec![Err(ControlError::from(err))],
            })
            .flat_map(stream::iter);
        Ok(frames.boxed())
    }
}
