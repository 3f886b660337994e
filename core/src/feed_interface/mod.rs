pub mod demand;
pub mod signal;
pub mod sse;

pub use demand::{DemandSnapshot, DemandUpdate};
pub use signal::SignalStatus;
pub use sse::SseDecoder;
