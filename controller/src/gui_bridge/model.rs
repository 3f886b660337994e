use serde::Serialize;
use signalcore::control::SessionView;
use signalcore::telemetry::MetricsSnapshot;
use signalcore::{Direction, Junction};
use std::collections::BTreeMap;

/// Dashboard payload served to operator clients.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DashboardModel {
    pub junction: Option<Junction>,
    pub active: Option<Direction>,
    pub remaining: Option<u32>,
    pub green: BTreeMap<Direction, u32>,
    /// Sum of the four greens; can exceed the effective budget once floors apply.
    pub total_green: u64,
    /// `None` until the feed has reported that direction.
    pub vehicles: BTreeMap<Direction, Option<u32>>,
    pub remote_signal: Option<Direction>,
    pub running: bool,
    pub metrics: MetricsSnapshot,
}

impl DashboardModel {
    pub fn from_view(view: Option<&SessionView>, metrics: MetricsSnapshot) -> Self {
        let Some(view) = view else {
            return Self {
                metrics,
                ..Default::default()
            };
        };
        Self {
            junction: Some(view.junction.clone()),
            active: Some(view.cycle.active),
            remaining: Some(view.cycle.remaining),
            green: Direction::ALL
                .iter()
                .map(|&d| (d, view.allocation.for_direction(d)))
                .collect(),
            vehicles: Direction::ALL
                .iter()
                .map(|&d| (d, view.demand.observed(d)))
                .collect(),
            total_green: view.allocation.total(),
            remote_signal: view.remote_signal,
            running: view.running,
            metrics,
        }
    }
}
