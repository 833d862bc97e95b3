//! Line-oriented streaming wire protocol
//!
//! Completion responses stream as newline-delimited records classified by
//! a two-character prefix:
//!
//! - `f:` frame metadata, no content
//! - `0:` content delta, quoted with `\n` and `\"` escapes
//! - `e:` / `d:` end of stream (identical meaning)
//!
//! Unknown prefixes are forward-compatible no-ops. This is an external
//! wire contract; the decoder treats it as a stable format.

#[cfg(test)]
mod proptests;

/// One decoded protocol record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRecord {
    /// Frame metadata, carried for completeness, no content
    Frame,
    /// Incremental content to append to the assistant turn
    Delta(String),
    /// End of stream; consumers stop even if more bytes remain
    Done,
}

/// Stateful decoder reassembling records from arbitrary byte chunks.
///
/// Bytes are buffered until a newline completes a record, so a record
/// boundary or a multi-byte UTF-8 sequence split across chunk boundaries
/// never corrupts decoding.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of the response body, returning every record
    /// completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(record) = parse_line(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Flush the final record once the body ends without a trailing
    /// newline.
    pub fn finish(&mut self) -> Option<StreamRecord> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        parse_line(&line)
    }
}

fn parse_line(line: &str) -> Option<StreamRecord> {
    if line.is_empty() {
        return None;
    }
    if let Some(payload) = line.strip_prefix("0:") {
        return Some(StreamRecord::Delta(unescape_delta(strip_quotes(payload))));
    }
    if line.starts_with("f:") {
        return Some(StreamRecord::Frame);
    }
    if line.starts_with("e:") || line.starts_with("d:") {
        return Some(StreamRecord::Done);
    }
    // Forward-compatible: unrecognized prefixes are ignored.
    None
}

/// Strip a single leading and trailing quote, when present.
fn strip_quotes(payload: &str) -> &str {
    let payload = payload.strip_prefix('"').unwrap_or(payload);
    payload.strip_suffix('"').unwrap_or(payload)
}

/// Unescape the two sequences the wire format uses, in the order the
/// service applies them.
fn unescape_delta(payload: &str) -> String {
    payload.replace("\\n", "\n").replace("\\\"", "\"")
}
