//! Record framing for newline-delimited streamed responses.
//!
//! The wire convention is a reduced SSE subset: records are separated by
//! newlines, each record may carry a literal `"data: "` prefix, blank
//! records are noise, and the literal `[DONE]` marks the end of the logical
//! stream. Nothing else from SSE (event names, ids, retry directives)
//! exists in this convention.
//!
//! ```text
//! data: {"delta": "hel"}
//! data: {"delta": "lo"}
//! data: [DONE]
//! ```

/// End-of-logical-stream marker. Suppressed from delivery; the transport
/// stream itself may keep going.
pub const SENTINEL: &str = "[DONE]";

/// Optional per-record framing prefix.
pub const FRAME_PREFIX: &str = "data: ";

/// Strip the optional `"data: "` prefix from a raw line, then trim
/// surrounding whitespace.
///
/// Lines without the prefix are records too, not noise: the prefix is a
/// convention some servers apply and some do not.
///
/// # Example
/// ```
/// use dripline::frame::strip_frame;
///
/// assert_eq!(strip_frame("data: hello"), "hello");
/// assert_eq!(strip_frame("plain text"), "plain text");
/// assert_eq!(strip_frame("data:   spaces  "), "spaces");
/// assert_eq!(strip_frame("  "), "");
/// ```
pub fn strip_frame(line: &str) -> &str {
    line.strip_prefix(FRAME_PREFIX).unwrap_or(line).trim()
}

/// Check whether a stripped record is the end-of-stream sentinel.
///
/// # Example
/// ```
/// use dripline::frame::is_sentinel;
///
/// assert!(is_sentinel("[DONE]"));
/// assert!(!is_sentinel(""));
/// assert!(!is_sentinel("{\"data\": \"value\"}"));
/// ```
pub fn is_sentinel(data: &str) -> bool {
    data == SENTINEL
}

/// Stateful newline splitter owning the carry-over buffer.
///
/// Decoded text goes in via [`push`](RecordAssembler::push); completed
/// records come out of [`next_record`](RecordAssembler::next_record), each
/// stripped, trimmed, filtered, and terminated with exactly one `\n`. Text
/// after the last newline stays buffered — it may be an incomplete line —
/// until more text arrives or [`finish`](RecordAssembler::finish) flushes
/// it at end-of-stream.
///
/// The assembler is the unit that guarantees the delivery invariants:
/// records come out in the order their terminating newlines appeared, no
/// record is emitted twice, and blank or sentinel records never come out
/// at all.
#[derive(Debug, Default)]
pub struct RecordAssembler {
    carry: String,
}

impl RecordAssembler {
    /// Create an assembler with an empty carry-over buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text to the carry-over buffer.
    pub fn push(&mut self, text: &str) {
        self.carry.push_str(text);
    }

    /// Extract the next deliverable record, if a complete one is buffered.
    ///
    /// Consumes buffered lines up to and including their newline;
    /// suppressed lines (blank or sentinel) are skipped in place. Returns
    /// `None` once no complete line remains.
    pub fn next_record(&mut self) -> Option<String> {
        while let Some(pos) = self.carry.find('\n') {
            let line: String = self.carry.drain(..=pos).collect();
            let data = strip_frame(&line);
            if data.is_empty() || is_sentinel(data) {
                continue;
            }
            let mut record = String::with_capacity(data.len() + 1);
            record.push_str(data);
            record.push('\n');
            return Some(record);
        }
        None
    }

    /// Flush the carry-over buffer at end-of-stream.
    ///
    /// A non-empty remainder without a terminating newline is still a
    /// record; the same filtering applies.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.carry);
        let data = strip_frame(&line);
        if data.is_empty() || is_sentinel(data) {
            return None;
        }
        let mut record = String::with_capacity(data.len() + 1);
        record.push_str(data);
        record.push('\n');
        Some(record)
    }
}
