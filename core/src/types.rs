//! Domain DTOs for the Fieldbook API.
//!
//! # Design
//! Records have no fixed schema because sheets are user-defined, so a record
//! is a JSON object map. Metadata descriptors are typed but tolerate extra
//! fields the API may add.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::HttpMethod;

/// One row of a sheet: field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Result of a record-level GET: a single record when a record id is
/// configured, the whole (possibly filtered) list otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Records {
    One(Record),
    Many(Vec<Record>),
}

impl Records {
    /// Flatten into a list; a single record becomes a one-element list.
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Records::One(record) => vec![record],
            Records::Many(records) => records,
        }
    }
}

/// Book descriptor returned by `GET /books/{book_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMeta {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Sheet descriptor returned by `GET /books/{book_id}/sheets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetMeta {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
}

/// Field descriptor returned by `GET /sheets/{sheet_id}/fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub key: String,
    pub name: String,
    pub slug: String,
    pub field_type: String,
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Allowed values, present for picklist fields.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

/// Status and transport metadata of one completed round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub status: u16,
    pub method: HttpMethod,
    pub url: String,
    pub content_type: Option<String>,
    pub elapsed: Duration,
}

impl ResponseInfo {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of an operation that completed a round trip.
///
/// `raw` is the best-effort decoded body (`Null` when the body is empty or
/// not JSON). `data` is the typed payload and is only set for 2xx responses
/// whose body matches `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub info: ResponseInfo,
    pub raw: serde_json::Value,
    pub data: Option<T>,
}

impl<T> Response<T> {
    pub fn status(&self) -> u16 {
        self.info.status
    }

    pub fn is_success(&self) -> bool {
        self.info.is_success()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
