pub mod log;
pub mod metrics;

pub use self::log::CycleLog;
pub use metrics::{ControlMetrics, MetricsSnapshot};
