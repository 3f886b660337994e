use serde::Serialize;
use std::sync::Mutex;

/// Counters shared by every session of one controller.
pub struct ControlMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub advances: u64,
    pub overrides: u64,
    pub overrides_rejected: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub frames_applied: u64,
    pub frames_dropped: u64,
    pub frames_stale: u64,
    pub channels_closed: u64,
}

impl ControlMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn bump(&self, field: impl FnOnce(&mut MetricsSnapshot) -> &mut u64) {
        if let Ok(mut metrics) = self.inner.lock() {
            *field(&mut *metrics) += 1;
        }
    }

    pub fn record_tick(&self) {
        self.bump(|m| &mut m.ticks);
    }

    pub fn record_advance(&self) {
        self.bump(|m| &mut m.advances);
    }

    pub fn record_override(&self) {
        self.bump(|m| &mut m.overrides);
    }

    pub fn record_rejected_override(&self) {
        self.bump(|m| &mut m.overrides_rejected);
    }

    pub fn record_notification(&self, delivered: bool) {
        if delivered {
            self.bump(|m| &mut m.notifications_sent);
        } else {
            self.bump(|m| &mut m.notifications_failed);
        }
    }

    pub fn record_frame_applied(&self) {
        self.bump(|m| &mut m.frames_applied);
    }

    pub fn record_frame_dropped(&self) {
        self.bump(|m| &mut m.frames_dropped);
    }

    pub fn record_stale_frame(&self) {
        self.bump(|m| &mut m.frames_stale);
    }

    pub fn record_channel_closed(&self) {
        self.bump(|m| &mut m.channels_closed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for ControlMetrics {
    fn default() -> Self {
        Self::new()
    }
}
