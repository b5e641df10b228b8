//! Stream records from an endpoint and print them as they arrive.
//!
//! Run with:
//! ```bash
//! export DRIPLINE_ENDPOINT="http://localhost:8080/v1/chat"
//! cargo run --example stream_records
//! ```

use dripline::{StreamConsumer, TransportOptions};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::var("DRIPLINE_ENDPOINT")
        .expect("DRIPLINE_ENDPOINT environment variable must be set");

    let options = TransportOptions::default().with_timeout(Duration::from_secs(60));
    let consumer = StreamConsumer::new(options);

    let payload = json!({
        "input": "Write a haiku about rivers.",
        "stream": true,
    });

    println!("Streaming from {endpoint}...\n");

    let mut count = 0usize;
    consumer
        .run(&endpoint, &payload, |record| {
            count += 1;
            print!("{record}");
        })
        .await?;

    println!("\n{count} records received");
    Ok(())
}
