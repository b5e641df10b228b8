//! The stream consumer: fixed-protocol POST plus incremental record delivery.

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::http::{add_extra_headers, build_http_client};
use crate::options::TransportOptions;
use crate::stream::RecordStreamExt;

/// Errors that can occur while consuming a stream.
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no response body")]
    MissingBody,

    #[error("stream cancelled")]
    Cancelled,
}

/// Incremental consumer for streamed, newline-delimited responses.
///
/// Opens a POST request with a JSON body against an endpoint, reads the
/// response body as it arrives, and invokes a handler once per completed
/// record, in arrival order. Each record reaches the handler stripped of
/// its optional `"data: "` prefix, trimmed, and terminated with exactly
/// one `\n`; blank records and the `[DONE]` sentinel never reach it.
///
/// The request method and `Content-Type: application/json` header are
/// fixed; [`TransportOptions`] carries the flexible extras (timeout,
/// credential, proxy, additional headers). HTTP status is not inspected:
/// an error response's body streams through the same pipeline, and what to
/// make of the status is the caller's concern.
///
/// Two tiers, same contract: static [`request`](StreamConsumer::request) /
/// [`request_with_cancel`](StreamConsumer::request_with_cancel) take
/// explicit options; instance [`run`](StreamConsumer::run) /
/// [`run_until_cancelled`](StreamConsumer::run_until_cancelled) use the
/// options stored at construction.
///
/// # Example
/// ```no_run
/// use dripline::consumer::StreamConsumer;
/// use dripline::options::TransportOptions;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let consumer = StreamConsumer::new(TransportOptions::default());
///     consumer
///         .run("http://localhost:8080/v1/chat", &json!({"input": "hi"}), |record| {
///             print!("{record}");
///         })
///         .await?;
///     Ok(())
/// }
/// ```
pub struct StreamConsumer {
    transport_options: TransportOptions,
}

impl StreamConsumer {
    /// Create a consumer with default transport options for its calls.
    pub fn new(transport_options: TransportOptions) -> Self {
        Self { transport_options }
    }

    /// Consume a streamed response with explicit transport options.
    ///
    /// Resolves once the transport signals end-of-input and the final
    /// flush has run. The handler is invoked synchronously between chunk
    /// reads; work it spawns is not awaited.
    pub async fn request<T, F>(
        endpoint: &str,
        payload: &T,
        on_record: F,
        transport_options: &TransportOptions,
    ) -> Result<(), ConsumerError>
    where
        T: Serialize + ?Sized,
        F: FnMut(&str),
    {
        let response = open_stream(endpoint, payload, transport_options).await?;
        deliver(response, on_record, None).await
    }

    /// Like [`request`](StreamConsumer::request), but checks a
    /// cancellation token before each chunk read.
    ///
    /// Returns [`ConsumerError::Cancelled`] if the token fires before the
    /// stream finishes. Records delivered before that point stay
    /// delivered.
    pub async fn request_with_cancel<T, F>(
        endpoint: &str,
        payload: &T,
        on_record: F,
        transport_options: &TransportOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ConsumerError>
    where
        T: Serialize + ?Sized,
        F: FnMut(&str),
    {
        let response = open_stream(endpoint, payload, transport_options).await?;
        deliver(response, on_record, Some(cancel)).await
    }

    /// Instance method using the stored transport options.
    pub async fn run<T, F>(
        &self,
        endpoint: &str,
        payload: &T,
        on_record: F,
    ) -> Result<(), ConsumerError>
    where
        T: Serialize + ?Sized,
        F: FnMut(&str),
    {
        Self::request(endpoint, payload, on_record, &self.transport_options).await
    }

    /// Instance method using the stored transport options, with a
    /// cancellation token.
    pub async fn run_until_cancelled<T, F>(
        &self,
        endpoint: &str,
        payload: &T,
        on_record: F,
        cancel: &CancellationToken,
    ) -> Result<(), ConsumerError>
    where
        T: Serialize + ?Sized,
        F: FnMut(&str),
    {
        Self::request_with_cancel(endpoint, payload, on_record, &self.transport_options, cancel)
            .await
    }
}

/// Issue the POST and hand back the open response.
async fn open_stream<T>(
    endpoint: &str,
    payload: &T,
    transport_options: &TransportOptions,
) -> Result<reqwest::Response, ConsumerError>
where
    T: Serialize + ?Sized,
{
    let client = build_http_client(transport_options)?;

    let mut req = client.post(endpoint);
    req = add_extra_headers(req, &transport_options.extra_headers);
    if let Some(token) = &transport_options.bearer_token {
        req = req.bearer_auth(token.expose_secret());
    }

    // Fixed protocol fields; caller extras cannot override these
    let response = req
        .header(CONTENT_TYPE, "application/json")
        .json(payload)
        .send()
        .await?;

    debug!("stream opened: {} {}", response.status(), endpoint);

    // These statuses carry no body; fail before any read attempt
    match response.status() {
        StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => Err(ConsumerError::MissingBody),
        _ => Ok(response),
    }
}

/// Drive the record stream, dispatching each record to the handler.
async fn deliver<F>(
    response: reqwest::Response,
    mut on_record: F,
    cancel: Option<&CancellationToken>,
) -> Result<(), ConsumerError>
where
    F: FnMut(&str),
{
    let records = response.records();
    futures::pin_mut!(records);

    loop {
        let next = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ConsumerError::Cancelled),
                item = records.next() => item,
            },
            None => records.next().await,
        };

        match next {
            Some(Ok(record)) => {
                trace!("record delivered: {} bytes", record.len());
                on_record(&record);
            }
            Some(Err(e)) => return Err(e),
            None => {
                debug!("stream complete");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_stream(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
            )
            .mount(&server)
            .await;
        server
    }

    async fn consume(server: &MockServer, options: &TransportOptions) -> Vec<String> {
        let mut records = Vec::new();
        StreamConsumer::request(
            &format!("{}/stream", server.uri()),
            &json!({"input": "hi"}),
            |record| records.push(record.to_string()),
            options,
        )
        .await
        .unwrap();
        records
    }

    #[tokio::test]
    async fn test_records_delivered_in_order() {
        let server = mock_stream("data: hello\ndata: world\n").await;
        let records = consume(&server, &TransportOptions::default()).await;
        assert_eq!(records, vec!["hello\n", "world\n"]);
    }

    #[tokio::test]
    async fn test_sentinel_and_blanks_suppressed_end_to_end() {
        let server = mock_stream("data: a\n\ndata: [DONE]\ndata: b\ntail").await;
        let records = consume(&server, &TransportOptions::default()).await;
        assert_eq!(records, vec!["a\n", "b\n", "tail\n"]);
    }

    #[tokio::test]
    async fn test_method_and_content_type_are_forced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"input": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"data: ok\n".to_vec(), "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        // The caller tries to override the content type; the consumer wins
        let options = TransportOptions::new()
            .with_header("Content-Type".to_string(), "text/plain".to_string());
        let records = consume(&server, &options).await;
        assert_eq!(records, vec!["ok\n"]);
    }

    #[tokio::test]
    async fn test_extra_headers_and_bearer_token_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .and(header("x-request-id", "abc123"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"data: ok\n".to_vec(), "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let options = TransportOptions::new()
            .with_bearer_token("sk-test")
            .with_header("x-request-id".to_string(), "abc123".to_string());
        let records = consume(&server, &options).await;
        assert_eq!(records, vec!["ok\n"]);
    }

    #[tokio::test]
    async fn test_missing_body_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = StreamConsumer::request(
            &format!("{}/stream", server.uri()),
            &json!({}),
            |_| panic!("no record expected"),
            &TransportOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(ConsumerError::MissingBody)));
    }

    #[tokio::test]
    async fn test_error_status_body_streams_through() {
        // HTTP outcome handling belongs to the caller; a 500's body is
        // parsed like any other
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_raw(b"data: backend exploded\n".to_vec(), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let records = consume(&server, &TransportOptions::default()).await;
        assert_eq!(records, vec!["backend exploded\n"]);
    }

    #[tokio::test]
    async fn test_connection_failure_propagates() {
        // Nothing listens on port 1
        let result = StreamConsumer::request(
            "http://127.0.0.1:1/stream",
            &json!({}),
            |_| {},
            &TransportOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(ConsumerError::Http(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_consumption() {
        let server = mock_stream("data: never\n").await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut records = Vec::new();
        let result = StreamConsumer::request_with_cancel(
            &format!("{}/stream", server.uri()),
            &json!({}),
            |record| records.push(record.to_string()),
            &TransportOptions::default(),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(ConsumerError::Cancelled)));
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_instance_run_uses_stored_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .and(header("x-tenant", "t1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"data: ok\n".to_vec(), "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let consumer = StreamConsumer::new(
            TransportOptions::new().with_header("x-tenant".to_string(), "t1".to_string()),
        );
        let mut records = Vec::new();
        consumer
            .run(
                &format!("{}/stream", server.uri()),
                &json!({"input": "hi"}),
                |record| records.push(record.to_string()),
            )
            .await
            .unwrap();
        assert_eq!(records, vec!["ok\n"]);
    }

    #[tokio::test]
    async fn test_run_until_cancelled_completes_when_not_cancelled() {
        let server = mock_stream("data: a\ndata: b\n").await;
        let consumer = StreamConsumer::new(TransportOptions::default());
        let cancel = CancellationToken::new();

        let mut records = Vec::new();
        consumer
            .run_until_cancelled(
                &format!("{}/stream", server.uri()),
                &json!({}),
                |record| records.push(record.to_string()),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(records, vec!["a\n", "b\n"]);
    }
}
