use crate::allocation::GreenAllocation;
use crate::prelude::Direction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    pub active: Direction,
    pub remaining: u32,
}

/// Transition that must be reported to the signal authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", content = "direction", rename_all = "snake_case")]
pub enum CycleEvent {
    AutomaticAdvance(Direction),
    ManualOverride(Direction),
}

impl CycleEvent {
    pub fn direction(&self) -> Direction {
        match self {
            CycleEvent::AutomaticAdvance(direction) | CycleEvent::ManualOverride(direction) => {
                *direction
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No step taken yet; the countdown tracks the latest allocation.
    Idle,
    Running(CycleState),
}

/// Four-state right-of-way cycle driven by logical ticks.
#[derive(Debug, Clone)]
pub struct SignalCycle {
    phase: Phase,
    allocation: GreenAllocation,
}

impl SignalCycle {
    pub fn new(allocation: GreenAllocation) -> Self {
        Self {
            phase: Phase::Idle,
            allocation,
        }
    }

    pub fn state(&self) -> CycleState {
        match self.phase {
            Phase::Idle => {
                let active = Direction::ALL[0];
                CycleState {
                    active,
                    remaining: self.allocation.for_direction(active),
                }
            }
            Phase::Running(state) => state,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn allocation(&self) -> &GreenAllocation {
        &self.allocation
    }

    /// Replaces the allocation read by future transitions. A running countdown keeps
    /// its remaining seconds.
    pub fn set_allocation(&mut self, allocation: GreenAllocation) {
        self.allocation = allocation;
    }

    /// One logical second. Counts down while time remains, otherwise expires into
    /// the cyclic successor with that direction's current allocation.
    pub fn tick(&mut self) -> Option<CycleEvent> {
        let mut state = self.state();
        let event = if state.remaining > 0 {
            state.remaining -= 1;
            None
        } else {
            let next = state.active.successor();
            state = CycleState {
                active: next,
                remaining: self.allocation.for_direction(next),
            };
            Some(CycleEvent::AutomaticAdvance(next))
        };
        self.phase = Phase::Running(state);
        event
    }

    /// Makes `direction` active immediately, discarding the unused countdown.
    pub fn override_to(&mut self, direction: Direction) -> CycleEvent {
        self.phase = Phase::Running(CycleState {
            active: direction,
            remaining: self.allocation.for_direction(direction),
        });
        CycleEvent::ManualOverride(direction)
    }
}
