//! Blocking client core for the Fieldbook REST API.
//!
//! # Overview
//! Translates CRUD and metadata operations on Fieldbook books, sheets and
//! records into HTTP requests against `https://api.fieldbook.com/v1` and
//! decodes the JSON that comes back.
//!
//! # Design
//! - `ClientConfig` is an explicit, validated description of one target
//!   (book, sheet, optional record) plus credentials and read modifiers.
//! - `FieldbookClient` is stateless: `build_*` produces an `HttpRequest`,
//!   a `Transport` executes it, and `parse_response` turns the result into a
//!   `Response` carrying status metadata, the raw JSON and a typed payload.
//! - Non-2xx statuses and undecodable bodies are data for the caller to
//!   inspect; only configuration, encoding and transport failures are errors.
//!
//! ```no_run
//! use fieldbook_core::{ClientConfig, FieldbookClient};
//!
//! let config = ClientConfig::builder("key-1", "secret")
//!     .book_id("56c4b1d5a2a0d50300f4d2b1")
//!     .sheet_title("tasks")
//!     .limit(10)
//!     .build()?;
//! let client = FieldbookClient::with_default_transport(config)?;
//! let open = client.search([("status", "open")])?;
//! println!("{} -> {:?}", open.status(), open.data);
//! # Ok::<(), fieldbook_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{parse_response, FieldbookClient};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use transport::Transport;
pub use types::{BookMeta, FieldMeta, Record, Records, Response, ResponseInfo, SheetMeta};
