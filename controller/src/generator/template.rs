use serde_json::json;
use signalcore::Direction;

/// Per-direction frame as emitted by a single-approach counter.
pub fn direction_frame(direction: Direction, vehicles: u32) -> String {
    json!({ "direction": direction, "vehicles": vehicles }).to_string()
}

/// Combined frame carrying every approach, in the detection server's shape.
pub fn combined_frame(junction: &str, counts: [u32; 4]) -> String {
    let all: serde_json::Map<String, serde_json::Value> = Direction::ALL
        .iter()
        .map(|direction| (direction.as_str().to_string(), json!(counts[direction.index()])))
        .collect();
    json!({
        "junction": junction,
        "direction": Direction::North,
        "vehicles": counts[Direction::North.index()],
        "total_detections": counts.iter().sum::<u32>(),
        "all_directions": all,
    })
    .to_string()
}

pub fn signal_frame(direction: Direction) -> String {
    json!({ "active_signal": direction }).to_string()
}
