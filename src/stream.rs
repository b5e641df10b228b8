//! Record streaming over an HTTP response body.
//!
//! Adapts a chunked byte stream into a stream of completed records:
//! bytes are decoded incrementally (decoder state survives chunk
//! boundaries), decoded text is split at newlines (the trailing partial
//! line survives too), and each surviving line is stripped, trimmed, and
//! filtered before it is yielded with its contractual trailing newline.

use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::consumer::ConsumerError;
use crate::decode::Utf8Decoder;
use crate::frame::RecordAssembler;

/// Extension trait for `reqwest::Response` to enable record streaming.
///
/// # Example
/// ```ignore
/// use dripline::stream::RecordStreamExt;
/// use futures::StreamExt;
///
/// let response = client.post("https://api.example.com/chat").send().await?;
///
/// let mut records = std::pin::pin!(response.records());
/// while let Some(result) = records.next().await {
///     print!("{}", result?);
/// }
/// ```
pub trait RecordStreamExt {
    /// Convert the response body into a stream of completed records.
    ///
    /// Records arrive in the order their terminating newlines appear in
    /// the body, each ending in exactly one `\n`. Blank records and the
    /// `[DONE]` sentinel are suppressed; the sentinel does not end the
    /// stream — consumption continues until the transport signals
    /// end-of-input, at which point a non-empty remainder is flushed as a
    /// final record. A transport read error is yielded as `Err` and ends
    /// consumption. Dropping the stream abandons the transfer.
    fn records(self) -> impl Stream<Item = Result<String, ConsumerError>> + Send;
}

impl RecordStreamExt for reqwest::Response {
    fn records(self) -> impl Stream<Item = Result<String, ConsumerError>> + Send {
        let byte_stream = self.bytes_stream();

        stream::unfold(
            (
                Box::pin(byte_stream),
                Utf8Decoder::new(),
                RecordAssembler::new(),
                false,
            ),
            |(mut bytes, mut decoder, mut assembler, mut ended)| async move {
                loop {
                    // Deliver buffered records before touching the transport
                    if let Some(record) = assembler.next_record() {
                        return Some((Ok(record), (bytes, decoder, assembler, ended)));
                    }

                    if ended {
                        return assembler
                            .finish()
                            .map(|record| (Ok(record), (bytes, decoder, assembler, ended)));
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            let text = decoder.decode(&chunk);
                            assembler.push(&text);
                        }
                        Some(Err(e)) => {
                            // Read failure ends consumption
                            ended = true;
                            return Some((
                                Err(ConsumerError::from(e)),
                                (bytes, decoder, assembler, ended),
                            ));
                        }
                        None => {
                            debug!("byte stream ended, flushing remainder");
                            ended = true;
                            let tail = decoder.finish();
                            assembler.push(&tail);
                        }
                    }
                }
            },
        )
    }
}
