//! Stream records with a deadline: cancel consumption after five seconds.
//!
//! Run with:
//! ```bash
//! export DRIPLINE_ENDPOINT="http://localhost:8080/v1/chat"
//! cargo run --example stream_cancel
//! ```

use dripline::{ConsumerError, StreamConsumer, TransportOptions};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::var("DRIPLINE_ENDPOINT")
        .expect("DRIPLINE_ENDPOINT environment variable must be set");

    let consumer = StreamConsumer::new(TransportOptions::default());
    let cancel = CancellationToken::new();

    let deadline = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        deadline.cancel();
    });

    let payload = json!({
        "input": "Tell me a very long story.",
        "stream": true,
    });

    let result = consumer
        .run_until_cancelled(&endpoint, &payload, |record| print!("{record}"), &cancel)
        .await;

    match result {
        Ok(()) => println!("\nstream finished before the deadline"),
        Err(ConsumerError::Cancelled) => println!("\ncancelled at the deadline"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
