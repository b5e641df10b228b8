//! HTTP client construction for the stream consumer.
//!
//! This module builds the configured `reqwest` client and applies the
//! caller-supplied header extras to a request.

use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&transport_options)?;
/// ```
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in transport options.
///
/// A `content-type` entry is skipped: the consumer owns that header and
/// always sends `application/json`.
///
/// # Example
/// ```ignore
/// let mut req = client.post(url);
/// req = add_extra_headers(req, &transport_options.extra_headers);
/// ```
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            if key.eq_ignore_ascii_case("content-type") {
                continue;
            }
            request = request.header(key, value);
        }
    }
    request
}
