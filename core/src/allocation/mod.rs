pub mod green_time;

pub use green_time::{AllocatorConfig, GreenAllocation, GreenTimeAllocator};
