use crate::prelude::{ControlError, ControlResult, Direction, JunctionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest known vehicle count per direction for one junction.
///
/// Directions that have never been reported stay `None` and count as zero demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandSnapshot {
    pub junction: JunctionId,
    counts: [Option<u32>; 4],
}

impl DemandSnapshot {
    pub fn empty(junction: JunctionId) -> Self {
        Self {
            junction,
            counts: [None; 4],
        }
    }

    pub fn with_counts(junction: JunctionId, counts: [u32; 4]) -> Self {
        Self {
            junction,
            counts: counts.map(Some),
        }
    }

    /// Demand used by allocation; unreported directions are zero.
    pub fn demand(&self, direction: Direction) -> u32 {
        self.counts[direction.index()].unwrap_or(0)
    }

    /// Count as reported by the feed, if any frame has mentioned this direction.
    pub fn observed(&self, direction: Direction) -> Option<u32> {
        self.counts[direction.index()]
    }

    pub fn total(&self) -> u64 {
        Direction::ALL
            .iter()
            .map(|&direction| u64::from(self.demand(direction)))
            .sum()
    }

    /// Applies an update; returns `true` when the stored counts changed.
    pub fn apply(&mut self, update: &DemandUpdate) -> bool {
        let before = self.counts;
        match update {
            DemandUpdate::Single {
                direction,
                vehicles,
            } => {
                self.counts[direction.index()] = Some(*vehicles);
            }
            DemandUpdate::Full(counts) => {
                self.counts = *counts;
            }
        }
        before != self.counts
    }
}

/// One decoded demand frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemandUpdate {
    Single { direction: Direction, vehicles: u32 },
    /// Complete replacement of the junction's snapshot.
    Full([Option<u32>; 4]),
}

#[derive(Deserialize)]
struct RawDemandFrame {
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    vehicles: Option<u32>,
    #[serde(default)]
    all_directions: Option<HashMap<String, u32>>,
}

impl DemandUpdate {
    /// Decodes a JSON demand frame.
    ///
    /// `channel_direction` is the direction the stream was opened for, used when the
    /// frame only carries `vehicles`. A present `all_directions` map always wins.
    pub fn parse(payload: &str, channel_direction: Option<Direction>) -> ControlResult<Self> {
        let raw: RawDemandFrame = serde_json::from_str(payload)?;

        if let Some(all) = raw.all_directions {
            let mut counts = [None; 4];
            for (key, vehicles) in all {
                let direction: Direction = key.parse()?;
                counts[direction.index()] = Some(vehicles);
            }
            return Ok(DemandUpdate::Full(counts));
        }

        let vehicles = raw
            .vehicles
            .ok_or_else(|| ControlError::Parse("frame carries no vehicle count".into()))?;
        let direction = match raw.direction {
            Some(name) => name.parse()?,
            None => channel_direction
                .ok_or_else(|| ControlError::Parse("frame carries no direction".into()))?,
        };
        Ok(DemandUpdate::Single {
            direction,
            vehicles,
        })
    }
}
