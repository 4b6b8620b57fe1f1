//! Fieldbook request builder, response parser and operation surface.
//!
//! # Design
//! `FieldbookClient` holds a validated `ClientConfig` and a `Transport`; it
//! keeps no state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a parse step that turns the
//! `HttpResponse` into a `Response`. The public operations (`get`, `create`,
//! ...) compose the two through the transport. Callers that execute requests
//! themselves can use `build_*` with [`parse_response`] directly.

use std::fmt;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::endpoint::{self, RecordTarget};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{BookMeta, FieldMeta, Record, Records, Response, ResponseInfo, SheetMeta};

const JSON: &str = "application/json";

/// Blocking, stateless client for one book/sheet target.
#[derive(Clone)]
pub struct FieldbookClient<T> {
    config: ClientConfig,
    transport: T,
}

impl<T> fmt::Debug for FieldbookClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldbookClient").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(feature = "ureq")]
impl FieldbookClient<crate::transport::UreqTransport> {
    /// Client over a fresh blocking `ureq` agent.
    pub fn with_default_transport(config: ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, crate::transport::UreqTransport::new())
    }
}

impl<T> FieldbookClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sibling client targeting one record of the same sheet.
    pub fn for_record(&self, record_id: impl Into<String>) -> Self
    where
        T: Clone,
    {
        let mut config = self.config.clone();
        config.record_id = Some(record_id.into());
        Self {
            config,
            transport: self.transport.clone(),
        }
    }

    /// GET the configured record, or the sheet's records when no record id
    /// is set.
    pub fn build_get(&self) -> Result<HttpRequest, ApiError> {
        let url = endpoint::record_url(&self.config, RecordTarget::Configured)?;
        Ok(self.request(HttpMethod::Get, url.into(), None))
    }

    /// GET the record-level URL with `params` appended as equality filters.
    pub fn build_search<I, K, V>(&self, params: I) -> Result<HttpRequest, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = endpoint::record_url(&self.config, RecordTarget::Configured)?;
        endpoint::append_query(&mut url, params);
        Ok(self.request(HttpMethod::Get, url.into(), None))
    }

    /// POST a new record to the sheet. A configured record id is ignored.
    pub fn build_create<P>(&self, params: &P) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let url = endpoint::record_url(&self.config, RecordTarget::Collection)?;
        let body = serde_json::to_string(params)?;
        Ok(self.request(HttpMethod::Post, url.into(), Some(body)))
    }

    /// PATCH the configured record with the given fields only.
    pub fn build_update<P>(&self, params: &P) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let url = endpoint::record_url(&self.config, RecordTarget::RequiredRecord)?;
        let body = serde_json::to_string(params)?;
        Ok(self.request(HttpMethod::Patch, url.into(), Some(body)))
    }

    pub fn build_delete(&self) -> Result<HttpRequest, ApiError> {
        let url = endpoint::record_url(&self.config, RecordTarget::RequiredRecord)?;
        Ok(self.request(HttpMethod::Delete, url.into(), None))
    }

    pub fn build_book_meta(&self) -> Result<HttpRequest, ApiError> {
        let url = endpoint::book_url(&self.config)?;
        Ok(self.request(HttpMethod::Get, url.into(), None))
    }

    pub fn build_sheet_meta(&self) -> Result<HttpRequest, ApiError> {
        let url = endpoint::sheets_url(&self.config)?;
        Ok(self.request(HttpMethod::Get, url.into(), None))
    }

    pub fn build_field_meta(&self) -> Result<HttpRequest, ApiError> {
        let url = endpoint::fields_url(&self.config)?;
        Ok(self.request(HttpMethod::Get, url.into(), None))
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        let credentials =
            STANDARD.encode(format!("{}:{}", self.config.api_key, self.config.api_secret));
        let mut headers = vec![
            ("authorization".to_string(), format!("Basic {credentials}")),
            ("accept".to_string(), JSON.to_string()),
        ];
        if body.is_some() {
            headers.push(("content-type".to_string(), JSON.to_string()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

impl<T: Transport> FieldbookClient<T> {
    /// Single record when a record id is configured, list otherwise.
    pub fn get(&self) -> Result<Response<Records>, ApiError> {
        self.send(self.build_get()?)
    }

    pub fn search<I, K, V>(&self, params: I) -> Result<Response<Vec<Record>>, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.send(self.build_search(params)?)
    }

    pub fn create<P>(&self, params: &P) -> Result<Response<Record>, ApiError>
    where
        P: Serialize + ?Sized,
    {
        self.send(self.build_create(params)?)
    }

    pub fn update<P>(&self, params: &P) -> Result<Response<Record>, ApiError>
    where
        P: Serialize + ?Sized,
    {
        self.send(self.build_update(params)?)
    }

    /// Delete the configured record and return the HTTP status (204 on
    /// success). Fieldbook does not report records that never existed.
    pub fn delete(&self) -> Result<u16, ApiError> {
        let response: Response<serde_json::Value> = self.send(self.build_delete()?)?;
        Ok(response.status())
    }

    pub fn book_meta(&self) -> Result<Response<BookMeta>, ApiError> {
        self.send(self.build_book_meta()?)
    }

    pub fn sheet_meta(&self) -> Result<Response<Vec<SheetMeta>>, ApiError> {
        self.send(self.build_sheet_meta()?)
    }

    pub fn field_meta(&self) -> Result<Response<Vec<FieldMeta>>, ApiError> {
        self.send(self.build_field_meta()?)
    }

    fn send<U: DeserializeOwned>(&self, request: HttpRequest) -> Result<Response<U>, ApiError> {
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");
        let start = Instant::now();
        let response = self.transport.execute(&request).map_err(|message| {
            tracing::warn!(
                method = %request.method,
                url = %request.url,
                error = %message,
                "Transport failed"
            );
            ApiError::Transport(message)
        })?;
        Ok(parse_response(&request, response, start.elapsed()))
    }
}

/// Turn a raw response into a `Response`.
///
/// Never fails: an empty or non-JSON body yields `raw == Null`, and `data` is
/// only populated for 2xx bodies that decode as `U`.
pub fn parse_response<U: DeserializeOwned>(
    request: &HttpRequest,
    response: HttpResponse,
    elapsed: Duration,
) -> Response<U> {
    let info = ResponseInfo {
        status: response.status,
        method: request.method,
        url: request.url.clone(),
        content_type: response.header("content-type").map(str::to_string),
        elapsed,
    };

    tracing::debug!(
        method = %info.method,
        url = %info.url,
        status = info.status,
        duration_ms = %elapsed.as_millis(),
        "Received response"
    );

    let raw = decode_body(&response.body, &info);
    if !info.is_success() {
        tracing::warn!(
            method = %info.method,
            url = %info.url,
            status = info.status,
            "Fieldbook returned a non-success status"
        );
        return Response {
            info,
            raw,
            data: None,
        };
    }

    let data = match serde_json::from_value(raw.clone()) {
        Ok(data) => Some(data),
        Err(e) => {
            if !raw.is_null() {
                tracing::warn!(url = %info.url, error = %e, "Response body has an unexpected shape");
            }
            None
        }
    };
    Response { info, raw, data }
}

fn decode_body(body: &str, info: &ResponseInfo) -> serde_json::Value {
    if body.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|e| {
        tracing::warn!(url = %info.url, status = info.status, error = %e, "Response body is not JSON");
        serde_json::Value::Null
    })
}
