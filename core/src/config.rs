//! Client configuration and builder.
//!
//! A `ClientConfig` names one request target (a book and sheet, optionally a
//! record) together with credentials and read modifiers. Validation is
//! structural: each operation checks the identifiers it needs when its
//! request is built.

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::ApiError;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.fieldbook.com/v1";

/// Configuration for a `FieldbookClient`.
///
/// The `Debug` implementation masks `api_secret`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub book_id: String,
    /// Sheet title or slug used in record URLs.
    #[serde(alias = "table")]
    pub sheet_title: String,
    /// Only needed for field metadata.
    pub sheet_id: Option<String>,
    /// Optional for reads, required for update and delete.
    pub record_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            book_id: String::new(),
            sheet_title: String::new(),
            sheet_id: None,
            record_id: None,
            limit: None,
            offset: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***REDACTED***")
            .field("book_id", &self.book_id)
            .field("sheet_title", &self.sheet_title)
            .field("sheet_id", &self.sheet_id)
            .field("record_id", &self.record_id)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .finish()
    }
}

impl ClientConfig {
    pub fn builder(api_key: impl Into<String>, api_secret: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(api_key, api_secret)
    }

    /// Parse a JSON configuration map. Unknown keys are rejected.
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base_url {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "base_url must be http or https, got {:?}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "base_url {:?} cannot carry path segments",
                self.base_url
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ApiError::Config(
                "base_url must not carry a query or fragment".to_string(),
            ));
        }
        Ok(())
    }

    /// Record id, treating an empty string as unset.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn sheet_id(&self) -> Option<&str> {
        self.sheet_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                api_key: api_key.into(),
                api_secret: api_secret.into(),
                ..ClientConfig::default()
            },
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn book_id(mut self, book_id: impl Into<String>) -> Self {
        self.config.book_id = book_id.into();
        self
    }

    pub fn sheet_title(mut self, sheet_title: impl Into<String>) -> Self {
        self.config.sheet_title = sheet_title.into();
        self
    }

    pub fn sheet_id(mut self, sheet_id: impl Into<String>) -> Self {
        self.config.sheet_id = Some(sheet_id.into());
        self
    }

    pub fn record_id(mut self, record_id: impl Into<String>) -> Self {
        self.config.record_id = Some(record_id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.config.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.config.offset = Some(offset);
        self
    }

    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.include = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<ClientConfig, ApiError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
