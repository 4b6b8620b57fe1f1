//! URL construction for every Fieldbook endpoint.
//!
//! Pure functions of a `ClientConfig`. Path segments are percent-encoded by
//! `url`; query values use form encoding, so `a,b` becomes `a%2Cb`.

use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Whether a record-level URL ends at the sheet or at the configured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTarget {
    /// `{base}/{book_id}/{sheet_title}`
    Collection,
    /// `{base}/{book_id}/{sheet_title}/{record_id}` when a record id is set,
    /// the collection otherwise.
    Configured,
    /// Like `Configured` but the record id is mandatory.
    RequiredRecord,
}

/// Record-level URL with the configured read modifiers in its query string.
pub fn record_url(config: &ClientConfig, target: RecordTarget) -> Result<Url, ApiError> {
    if config.book_id.is_empty() {
        return Err(ApiError::MissingField("book_id"));
    }
    if config.sheet_title.is_empty() {
        return Err(ApiError::MissingField("sheet_title"));
    }
    let record_id = match target {
        RecordTarget::Collection => None,
        RecordTarget::Configured => config.record_id(),
        RecordTarget::RequiredRecord => {
            Some(config.record_id().ok_or(ApiError::MissingField("record_id"))?)
        }
    };

    let mut segments = vec![config.book_id.as_str(), config.sheet_title.as_str()];
    segments.extend(record_id);
    let mut url = with_segments(config, &segments)?;
    append_query(&mut url, read_modifiers(config));
    Ok(url)
}

/// `{base}/books/{book_id}`
pub fn book_url(config: &ClientConfig) -> Result<Url, ApiError> {
    if config.book_id.is_empty() {
        return Err(ApiError::MissingField("book_id"));
    }
    with_segments(config, &["books", config.book_id.as_str()])
}

/// `{base}/books/{book_id}/sheets`
pub fn sheets_url(config: &ClientConfig) -> Result<Url, ApiError> {
    if config.book_id.is_empty() {
        return Err(ApiError::MissingField("book_id"));
    }
    with_segments(config, &["books", config.book_id.as_str(), "sheets"])
}

/// `{base}/sheets/{sheet_id}/fields`
pub fn fields_url(config: &ClientConfig) -> Result<Url, ApiError> {
    let sheet_id = config.sheet_id().ok_or(ApiError::MissingField("sheet_id"))?;
    with_segments(config, &["sheets", sheet_id, "fields"])
}

/// Query pairs derived from `limit`, `offset`, `include` and `exclude`, in
/// that order.
///
/// `include` and `exclude` are mutually exclusive: when both are non-empty
/// neither is sent.
pub fn read_modifiers(config: &ClientConfig) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(limit) = config.limit {
        pairs.push(("limit", limit.to_string()));
    }
    if let Some(offset) = config.offset {
        pairs.push(("offset", offset.to_string()));
    }
    match (config.include.is_empty(), config.exclude.is_empty()) {
        (false, true) => pairs.push(("include", config.include.join(","))),
        (true, false) => pairs.push(("exclude", config.exclude.join(","))),
        (false, false) => {
            tracing::warn!(
                include = ?config.include,
                exclude = ?config.exclude,
                "Both include and exclude are set; sending neither"
            );
        }
        (true, true) => {}
    }
    pairs
}

/// Append pairs to the query string. Leaves the URL untouched when `pairs`
/// is empty so no bare `?` is produced.
pub fn append_query<I, K, V>(url: &mut Url, pairs: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs = pairs.into_iter().peekable();
    if pairs.peek().is_none() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key.as_ref(), value.as_ref());
    }
}

fn with_segments(config: &ClientConfig, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = Url::parse(&config.base_url)
        .map_err(|e| ApiError::Config(format!("invalid base_url {:?}: {e}", config.base_url)))?;
    url.path_segments_mut()
        .map_err(|_| {
            ApiError::Config(format!("base_url {:?} cannot carry path segments", config.base_url))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::builder("key", "secret")
            .book_id("B1")
            .sheet_title("tasks")
            .build()
            .unwrap()
    }

    #[test]
    fn collection_url_has_no_trailing_segment() {
        let url = record_url(&config(), RecordTarget::Configured).unwrap();
        assert_eq!(url.as_str(), "https://api.fieldbook.com/v1/B1/tasks");
    }

    #[test]
    fn empty_record_id_targets_collection() {
        let mut config = config();
        config.record_id = Some(String::new());
        let url = record_url(&config, RecordTarget::Configured).unwrap();
        assert_eq!(url.as_str(), "https://api.fieldbook.com/v1/B1/tasks");
    }

    #[test]
    fn record_url_ends_with_record_id() {
        let mut config = config();
        config.record_id = Some("7".to_string());
        let url = record_url(&config, RecordTarget::Configured).unwrap();
        assert_eq!(url.as_str(), "https://api.fieldbook.com/v1/B1/tasks/7");
    }

    #[test]
    fn collection_target_ignores_record_id() {
        let mut config = config();
        config.record_id = Some("7".to_string());
        let url = record_url(&config, RecordTarget::Collection).unwrap();
        assert_eq!(url.as_str(), "https://api.fieldbook.com/v1/B1/tasks");
    }

    #[test]
    fn required_record_without_id_is_an_error() {
        let err = record_url(&config(), RecordTarget::RequiredRecord).unwrap_err();
        assert!(matches!(err, ApiError::MissingField("record_id")));
    }

    #[test]
    fn missing_book_or_sheet_is_an_error() {
        let mut config = config();
        config.sheet_title.clear();
        assert!(matches!(
            record_url(&config, RecordTarget::Collection),
            Err(ApiError::MissingField("sheet_title"))
        ));
        config.book_id.clear();
        assert!(matches!(book_url(&config), Err(ApiError::MissingField("book_id"))));
        assert!(matches!(sheets_url(&config), Err(ApiError::MissingField("book_id"))));
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let mut config = config();
        config.base_url = "http://localhost:3000/v1/".to_string();
        let url = record_url(&config, RecordTarget::Collection).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/v1/B1/tasks");
    }

    #[test]
    fn sheet_title_with_space_is_encoded() {
        let mut config = config();
        config.sheet_title = "open tasks".to_string();
        let url = record_url(&config, RecordTarget::Collection).unwrap();
        assert_eq!(url.as_str(), "https://api.fieldbook.com/v1/B1/open%20tasks");
    }

    #[test]
    fn limit_offset_then_include_in_order() {
        let mut config = config();
        config.limit = Some(5);
        config.offset = Some(10);
        config.include = vec!["a".to_string(), "b".to_string()];
        let url = record_url(&config, RecordTarget::Collection).unwrap();
        assert_eq!(url.query(), Some("limit=5&offset=10&include=a%2Cb"));
    }

    #[test]
    fn exclude_alone_is_sent() {
        let mut config = config();
        config.exclude = vec!["notes".to_string()];
        let url = record_url(&config, RecordTarget::Collection).unwrap();
        assert_eq!(url.query(), Some("exclude=notes"));
    }

    #[test]
    fn include_and_exclude_together_are_both_dropped() {
        let mut config = config();
        config.limit = Some(1);
        config.include = vec!["a".to_string()];
        config.exclude = vec!["b".to_string()];
        let url = record_url(&config, RecordTarget::Collection).unwrap();
        assert_eq!(url.query(), Some("limit=1"));
    }

    #[test]
    fn metadata_urls() {
        let mut config = config();
        config.sheet_id = Some("S1".to_string());
        assert_eq!(book_url(&config).unwrap().as_str(), "https://api.fieldbook.com/v1/books/B1");
        assert_eq!(
            sheets_url(&config).unwrap().as_str(),
            "https://api.fieldbook.com/v1/books/B1/sheets"
        );
        assert_eq!(
            fields_url(&config).unwrap().as_str(),
            "https://api.fieldbook.com/v1/sheets/S1/fields"
        );
    }

    #[test]
    fn metadata_urls_ignore_read_modifiers() {
        let mut config = config();
        config.limit = Some(3);
        assert_eq!(book_url(&config).unwrap().query(), None);
    }

    #[test]
    fn fields_url_requires_sheet_id() {
        assert!(matches!(fields_url(&config()), Err(ApiError::MissingField("sheet_id"))));
    }

    #[test]
    fn append_query_with_no_pairs_adds_nothing() {
        let mut url = Url::parse("https://api.fieldbook.com/v1/B1/tasks").unwrap();
        append_query(&mut url, Vec::<(&str, &str)>::new());
        assert_eq!(url.as_str(), "https://api.fieldbook.com/v1/B1/tasks");
    }
}
