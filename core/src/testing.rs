//! In-process fakes for the feed and authority seams.

use crate::authority::SignalAuthority;
use crate::feeds::{FeedKind, FeedRequest, FeedSource, FrameStream};
use crate::prelude::{ControlError, ControlResult, Credential, Direction, Junction, JunctionId};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

type ChannelKey = (String, FeedKind);

/// Feed source whose channels are driven by the test.
#[derive(Default)]
pub struct ScriptedFeeds {
    senders: Mutex<HashMap<ChannelKey, mpsc::UnboundedSender<ControlResult<String>>>>,
    open: Arc<Mutex<HashMap<String, usize>>>,
}

struct OpenGuard {
    junction: String,
    open: Arc<Mutex<HashMap<String, usize>>>,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        if let Ok(mut open) = self.open.lock() {
            if let Some(count) = open.get_mut(&self.junction) {
                *count = count.saturating_sub(1);
            }
        }
    }
}

impl ScriptedFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    fn send(&self, junction: &str, kind: FeedKind, item: ControlResult<String>) -> bool {
        self.senders
            .lock()
            .unwrap()
            .get(&(junction.to_string(), kind))
            .map(|tx| tx.send(item).is_ok())
            .unwrap_or(false)
    }

    /// Delivers a frame; `false` when that channel is not open.
    pub fn push(&self, junction: &str, kind: FeedKind, frame: &str) -> bool {
        self.send(junction, kind, Ok(frame.to_string()))
    }

    pub fn fail(&self, junction: &str, kind: FeedKind, reason: &str) -> bool {
        self.send(junction, kind, Err(ControlError::Transport(reason.to_string())))
    }

    pub fn open_for(&self, junction: &str) -> usize {
        self.open.lock().unwrap().get(junction).copied().unwrap_or(0)
    }

    pub fn open_total(&self) -> usize {
        self.open.lock().unwrap().values().sum()
    }

    pub async fn wait_open(&self, expected: usize) {
        eventually(|| self.open_total() == expected).await;
    }
}

#[async_trait]
impl FeedSource for ScriptedFeeds {
    async fn open(&self, request: &FeedRequest) -> ControlResult<FrameStream> {
        let junction = request.junction.id.as_str().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap()
            .insert((junction.clone(), request.kind), tx);
        *self.open.lock().unwrap().entry(junction.clone()).or_insert(0) += 1;

        let guard = OpenGuard {
            junction,
            open: self.open.clone(),
        };
        let frames = stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|item| (item, (rx, guard)))
        });
        Ok(frames.boxed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub junction: JunctionId,
    pub direction: Direction,
    pub credential: Option<String>,
}

/// Authority that records every attempt and can be switched to failing.
pub struct RecordingAuthority {
    sent: mpsc::UnboundedSender<SentNotification>,
    failing: AtomicBool,
}

impl RecordingAuthority {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SentNotification>) {
        let (sent, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent,
                failing: AtomicBool::new(false),
            }),
            rx,
        )
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalAuthority for RecordingAuthority {
    async fn notify(
        &self,
        junction: &Junction,
        direction: Direction,
        credential: Option<&Credential>,
    ) -> ControlResult<()> {
        let _ = self.sent.send(SentNotification {
            junction: junction.id.clone(),
            direction,
            credential: credential.map(|c| c.token().to_string()),
        });
        if self.failing.load(Ordering::SeqCst) {
            Err(ControlError::Transport("authority unreachable".into()))
        } else {
            Ok(())
        }
    }
}

/// Polls `condition` until it holds, failing the test after one second.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), future)
        .await
        .expect("timed out")
}
