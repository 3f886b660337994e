use crate::feed_interface::DemandSnapshot;
use crate::prelude::{ControlError, ControlResult, Direction};
use serde::{Deserialize, Serialize};

/// Seconds of green assigned to each direction for its next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreenAllocation {
    seconds: [u32; 4],
}

impl GreenAllocation {
    pub fn from_seconds(seconds: [u32; 4]) -> Self {
        Self { seconds }
    }

    pub fn uniform(seconds: u32) -> Self {
        Self {
            seconds: [seconds; 4],
        }
    }

    pub fn for_direction(&self, direction: Direction) -> u32 {
        self.seconds[direction.index()]
    }

    /// Sum of all four greens. Not normalised to the cycle length.
    pub fn total(&self) -> u64 {
        self.seconds.iter().copied().map(u64::from).sum()
    }

    pub fn as_array(&self) -> [u32; 4] {
        self.seconds
    }
}

/// Parameters of the demand-proportional split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Lost time per cycle, seconds.
    pub lost_time: u32,
    pub min_green: u32,
    /// Green per direction when no demand is known.
    pub idle_green: u32,
    pub min_cycle: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            lost_time: 16,
            min_green: 10,
            idle_green: 30,
            min_cycle: 60,
        }
    }
}

/// Simplified Webster-style allocator: cycle length grows with total demand and the
/// effective green is split in proportion to each direction's share.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GreenTimeAllocator {
    config: AllocatorConfig,
}

impl AllocatorConfig {
    /// Every allocation must be a positive number of seconds and the cycle must leave
    /// room for green after the lost time.
    pub fn validate(&self) -> ControlResult<()> {
        if self.min_green == 0 {
            return Err(ControlError::Parse("min_green must be positive".into()));
        }
        if self.idle_green == 0 {
            return Err(ControlError::Parse("idle_green must be positive".into()));
        }
        if self.lost_time >= self.min_cycle {
            return Err(ControlError::Parse(format!(
                "lost_time ({}) must be shorter than min_cycle ({})",
                self.lost_time, self.min_cycle
            )));
        }
        Ok(())
    }
}

impl GreenTimeAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// `max(min_cycle, 1.5 * lost_time + 5 + 2 * total)`
    pub fn cycle_length(&self, total: u64) -> f64 {
        let lost = f64::from(self.config.lost_time);
        (1.5 * lost + 5.0 + 2.0 * total as f64).max(f64::from(self.config.min_cycle))
    }

    /// Pure and total. Rounds half away from zero, then floors each direction at
    /// `min_green`; the result may therefore exceed the effective green budget.
    /// A single green saturates at `u32::MAX` seconds.
    pub fn allocate(&self, demand: &DemandSnapshot) -> GreenAllocation {
        let total = demand.total();
        if total == 0 {
            return GreenAllocation::uniform(self.config.idle_green);
        }

        let budget = (self.cycle_length(total) - f64::from(self.config.lost_time)).max(0.0);
        let seconds = Direction::ALL.map(|direction| {
            let share = f64::from(demand.demand(direction)) / total as f64;
            let green = (share * budget).round().min(f64::from(u32::MAX)) as u32;
            green.max(self.config.min_green)
        });
        GreenAllocation::from_seconds(seconds)
    }
}
