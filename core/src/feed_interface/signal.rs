use crate::prelude::{ControlError, ControlResult, Direction};
use serde::Deserialize;

/// Remote view of which direction holds right-of-way. Read-only mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalStatus {
    pub active: Direction,
}

#[derive(Deserialize)]
struct RawSignalFrame {
    #[serde(default)]
    active_signal: Option<String>,
    #[serde(default)]
    active_direction: Option<String>,
}

impl SignalStatus {
    /// Accepts `active_signal` (signal service) or `active_direction` (feed service).
    pub fn parse(payload: &str) -> ControlResult<Self> {
        let raw: RawSignalFrame = serde_json::from_str(payload)?;
        let name = raw
            .active_signal
            .or(raw.active_direction)
            .ok_or_else(|| ControlError::Parse("frame carries no active signal".into()))?;
        Ok(Self {
            active: name.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_keys() {
        assert_eq!(
            SignalStatus::parse(r#"{"active_signal":"south"}"#)
                .unwrap()
                .active,
            Direction::South
        );
        assert_eq!(
            SignalStatus::parse(r#"{"junction":"01_","active_direction":"west","timestamp":1}"#)
                .unwrap()
                .active,
            Direction::West
        );
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        assert!(matches!(
            SignalStatus::parse("{}"),
            Err(ControlError::Parse(_))
        ));
    }
}
