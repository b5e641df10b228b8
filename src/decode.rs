//! Incremental UTF-8 decoding across chunk boundaries.
//!
//! Transport chunks split wherever the network felt like it, including in
//! the middle of a multi-byte character. [`Utf8Decoder`] carries the
//! incomplete trailing sequence from one chunk into the next so no
//! character is ever truncated at a boundary. Invalid sequences decode to
//! U+FFFD instead of failing the stream.

const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder for a chunked byte stream.
///
/// Feed each chunk through [`decode`](Utf8Decoder::decode) in arrival
/// order, then call [`finish`](Utf8Decoder::finish) once the stream ends to
/// flush any dangling partial sequence.
///
/// # Example
/// ```
/// use dripline::decode::Utf8Decoder;
///
/// // "é" (0xC3 0xA9) split across two chunks
/// let mut decoder = Utf8Decoder::new();
/// let mut text = decoder.decode(&[b'h', 0xC3]);
/// text.push_str(&decoder.decode(&[0xA9, b'!']));
/// text.push_str(&decoder.finish());
/// assert_eq!(text, "hé!");
/// ```
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Incomplete trailing sequence from the previous chunk, at most 3 bytes
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with no carried-over bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning the text it completes.
    ///
    /// Bytes held over from the previous chunk are prepended before
    /// decoding. A trailing sequence that could still be completed by the
    /// next chunk is retained, not emitted. Invalid sequences become
    /// U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if self.pending.is_empty() {
            if let Ok(s) = std::str::from_utf8(chunk) {
                return s.to_string();
            }
        }

        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&input[..valid]) {
                        out.push_str(s);
                    }
                    match e.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            input = &input[valid + bad..];
                        }
                        None => {
                            // Sequence may complete with the next chunk
                            self.pending = input[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush the decoder at end-of-stream.
    ///
    /// A sequence still incomplete when the transport ends can never
    /// complete; it decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }
}
