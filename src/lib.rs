//! # dripline - Incremental Streamed-Response Consumer
//!
//! A small, pragmatic Rust library for consuming streamed, newline-delimited
//! API responses: it opens a long-lived HTTP POST, reads the chunked byte
//! stream as it arrives, reassembles it into discrete records despite
//! arbitrary chunk boundaries, and hands each completed record to a caller
//! callback in arrival order.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Decoder and line-splitter state survive chunk boundaries: no byte of
//!   text is dropped or duplicated, even when a chunk ends mid-character
//! - Reduced SSE framing: optional `"data: "` prefix, `[DONE]` sentinel,
//!   blank-line suppression — nothing more
//! - Callback surface ([`StreamConsumer`]) and stream surface
//!   ([`RecordStreamExt`]) over the same pipeline
//! - Optional cancellation via `tokio_util::sync::CancellationToken`
//!
//! ## Architecture
//!
//! Each call owns its own pipeline; nothing is shared across calls:
//!
//! 1. **`decode`** — incremental UTF-8 decoding (invalid bytes become
//!    U+FFFD, an incomplete trailing sequence waits for the next chunk)
//! 2. **`frame`** — newline splitting with a carry-over buffer, prefix
//!    stripping, sentinel and blank suppression
//! 3. **`stream`** / **`consumer`** — the transport driver and the two
//!    public surfaces
//!
//! ## Example
//! ```no_run
//! use dripline::{StreamConsumer, TransportOptions};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = TransportOptions::default()
//!         .with_timeout(Duration::from_secs(60))
//!         .with_bearer_token("sk-...");
//!
//!     let consumer = StreamConsumer::new(options);
//!     consumer
//!         .run(
//!             "https://api.example.com/v1/chat",
//!             &json!({"input": "Write a haiku about rivers."}),
//!             |record| print!("{record}"),
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod consumer;
pub mod decode;
pub mod frame;
pub mod http;
pub mod options;
pub mod stream;

// Re-exports for convenience
pub use consumer::{ConsumerError, StreamConsumer};
pub use decode::Utf8Decoder;
pub use frame::RecordAssembler;
pub use options::{SecretString, TransportOptions};
pub use stream::RecordStreamExt;
