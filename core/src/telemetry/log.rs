use crate::control::cycle::{CycleEvent, CycleState};
use crate::prelude::{ControlError, Direction, JunctionId};
use log::{debug, info, warn};

/// Uniform log lines for one junction's control loop.
pub struct CycleLog {
    junction: JunctionId,
}

impl CycleLog {
    pub fn new(junction: JunctionId) -> Self {
        Self { junction }
    }

    pub fn started(&self, state: &CycleState) {
        info!(
            "[{}] cycle started on {} ({}s)",
            self.junction, state.active, state.remaining
        );
    }

    pub fn transition(&self, event: &CycleEvent, state: &CycleState) {
        match event {
            CycleEvent::AutomaticAdvance(_) => info!(
                "[{}] advance -> {} ({}s)",
                self.junction, state.active, state.remaining
            ),
            CycleEvent::ManualOverride(_) => info!(
                "[{}] override -> {} ({}s)",
                self.junction, state.active, state.remaining
            ),
        }
    }

    pub fn notify_failed(&self, direction: Direction, err: &ControlError) {
        warn!(
            "[{}] signal authority not updated for {}: {}",
            self.junction, direction, err
        );
    }

    pub fn frame_dropped(&self, channel: &str, err: &ControlError) {
        debug!("[{}] dropped {} frame: {}", self.junction, channel, err);
    }

    pub fn stale_frame(&self, origin: &JunctionId) {
        debug!(
            "[{}] discarded frame from superseded junction {}",
            self.junction, origin
        );
    }

    pub fn channel_closed(&self, channel: &str, reason: Option<&ControlError>) {
        match reason {
            Some(err) => warn!("[{}] {} channel closed: {}", self.junction, channel, err),
            None => info!("[{}] {} channel ended", self.junction, channel),
        }
    }
}
