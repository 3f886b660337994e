use crate::prelude::{ControlError, ControlResult};

/// Largest unterminated event the decoder will hold.
pub const MAX_EVENT_BYTES: usize = 64 * 1024;

/// Incremental Server-Sent-Events decoder.
///
/// Bytes arrive in arbitrary chunks; complete events are returned as their joined
/// `data:` payloads. Comment lines and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    pending: Vec<u8>,
    /// Offset up to which `buffer` holds no event terminator.
    scanned: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events completed by `chunk`. An event growing past
    /// `MAX_EVENT_BYTES` yields a trailing `Parse` error and resets the decoder.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ControlResult<String>> {
        self.pending.extend_from_slice(chunk);
        // Keep an incomplete UTF-8 tail for the next chunk.
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            _ => self.pending.len(),
        };
        let text = String::from_utf8_lossy(&self.pending[..valid_up_to]).replace('\r', "");
        self.pending.drain(..valid_up_to);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(found) = self.buffer[self.scanned..].find("\n\n") {
            let end = self.scanned + found;
            let block: String = self.buffer.drain(..end + 2).collect();
            self.scanned = 0;
            if let Some(data) = Self::event_data(&block) {
                events.push(Ok(data));
            }
        }
        // a trailing newline may pair with the next chunk
        self.scanned = self.buffer.len()
            - self.buffer.chars().next_back().map_or(0, char::len_utf8);

        if self.buffer.len() + self.pending.len() > MAX_EVENT_BYTES {
            self.buffer.clear();
            self.pending.clear();
            self.scanned = 0;
            events.push(Err(ControlError::Parse(format!(
                "event exceeds {} bytes without a terminator",
                MAX_EVENT_BYTES
            ))));
        }
        events
    }

    fn event_data(block: &str) -> Option<String> {
        let lines: Vec<&str> = block
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.strip_prefix(' ').unwrap_or(data))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
