//! HTTP execution seam.
//!
//! `FieldbookClient` never performs I/O itself; it hands each `HttpRequest`
//! to a `Transport`. The default implementation is a blocking `ureq` agent,
//! tests substitute a recording mock.

use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round trip.
///
/// Any status code is a successful execution; `Err` is reserved for failures
/// that produced no response (DNS, connect, TLS, I/O).
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use super::Transport;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Largest response body read before the round trip counts as failed.
    const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

    /// Blocking transport backed by a `ureq` agent.
    ///
    /// Status codes are returned as data, so 4xx/5xx responses reach the
    /// client with their bodies intact. A body that is not UTF-8 is handed
    /// on as empty, which the client decodes to `Null`.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
            let url = request.url.as_str();
            let result = match (request.method, request.body.as_deref()) {
                (HttpMethod::Get, _) => {
                    let mut builder = self.agent.get(url);
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    builder.call()
                }
                (HttpMethod::Delete, _) => {
                    let mut builder = self.agent.delete(url);
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    builder.call()
                }
                (HttpMethod::Post, body) => {
                    let mut builder = self.agent.post(url);
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    match body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
                (HttpMethod::Patch, body) => {
                    let mut builder = self.agent.patch(url);
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    match body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
            };

            let mut response = result.map_err(|e| e.to_string())?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
                })
                .collect();
            let bytes = response
                .body_mut()
                .with_config()
                .limit(MAX_BODY_BYTES)
                .read_to_vec()
                .map_err(|e| e.to_string())?;
            let body = String::from_utf8(bytes).unwrap_or_else(|e| {
                tracing::warn!(
                    url = %request.url,
                    status,
                    error = %e,
                    "Response body is not UTF-8; dropping it"
                );
                String::new()
            });

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}
