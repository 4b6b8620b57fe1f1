//! In-memory stand-in for the Fieldbook v1 API.
//!
//! Serves the record, book, sheet and field endpoints the client uses, with
//! HTTP Basic auth, `limit`/`offset`/`include`/`exclude` handling and
//! equality filters on any other query parameter.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_KEY: &str = "key-1";
pub const API_SECRET: &str = "secret";
pub const BOOK_ID: &str = "56c4b1d5";
pub const SHEET_ID: &str = "s1";
pub const SHEET_SLUG: &str = "tasks";

pub type Record = Map<String, Value>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "fieldType")]
    pub field_type: String,
    #[serde(rename = "inputType")]
    pub input_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct Sheet {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub fields: Vec<Field>,
    pub records: Vec<Record>,
}

impl Sheet {
    /// Sheets are addressed by slug or, ignoring case, by title.
    fn matches(&self, name: &str) -> bool {
        self.slug == name || self.title.eq_ignore_ascii_case(name)
    }
}

#[derive(Clone, Debug)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub sheets: Vec<Sheet>,
}

#[derive(Debug)]
pub struct Store {
    pub api_key: String,
    pub api_secret: String,
    pub books: HashMap<String, Book>,
    next_id: u64,
}

impl Store {
    fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            books: HashMap::new(),
            next_id: 1,
        }
    }

    /// One book (`BOOK_ID`) holding an empty `tasks` sheet (id `s1`) with a text
    /// field and a picklist field.
    pub fn seeded() -> Self {
        let mut store = Self::new(API_KEY, API_SECRET);
        let fields = vec![
            Field {
                key: "f0".to_string(),
                name: "Name".to_string(),
                slug: "name".to_string(),
                field_type: "text".to_string(),
                input_type: "text".to_string(),
                required: Some(true),
                choices: None,
            },
            Field {
                key: "f1".to_string(),
                name: "Status".to_string(),
                slug: "status".to_string(),
                field_type: "picklist".to_string(),
                input_type: "picklist".to_string(),
                required: None,
                choices: Some(vec!["open".to_string(), "closed".to_string()]),
            },
        ];
        store.books.insert(
            BOOK_ID.to_string(),
            Book {
                id: BOOK_ID.to_string(),
                title: "Projects".to_string(),
                sheets: vec![Sheet {
                    id: SHEET_ID.to_string(),
                    title: "Tasks".to_string(),
                    slug: SHEET_SLUG.to_string(),
                    fields,
                    records: Vec::new(),
                }],
            },
        );
        store
    }

    fn sheet(&self, book_id: &str, sheet: &str) -> Result<&Sheet, ApiError> {
        self.books
            .get(book_id)
            .ok_or_else(|| ApiError::not_found("book"))?
            .sheets
            .iter()
            .find(|s| s.matches(sheet))
            .ok_or_else(|| ApiError::not_found("sheet"))
    }

    fn sheet_mut(&mut self, book_id: &str, sheet: &str) -> Result<&mut Sheet, ApiError> {
        self.books
            .get_mut(book_id)
            .ok_or_else(|| ApiError::not_found("book"))?
            .sheets
            .iter_mut()
            .find(|s| s.matches(sheet))
            .ok_or_else(|| ApiError::not_found("sheet"))
    }
}

pub type Db = Arc<RwLock<Store>>;

/// JSON error body with a status, shaped like Fieldbook's `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{what} not found"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/v1/books/{book_id}", get(book_meta))
        .route("/v1/books/{book_id}/sheets", get(list_sheets))
        .route("/v1/sheets/{sheet_id}/fields", get(list_fields))
        .route("/v1/{book_id}/{sheet}", get(list_records).post(create_record))
        .route(
            "/v1/{book_id}/{sheet}/{record_id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .layer(middleware::from_fn_with_state(db.clone(), require_basic_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_basic_auth(State(db): State<Db>, req: Request, next: Next) -> Response {
    let expected = {
        let store = db.read().await;
        format!("Basic {}", STANDARD.encode(format!("{}:{}", store.api_key, store.api_secret)))
    };
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        tracing::warn!(uri = %req.uri(), "Rejected request with bad credentials");
        return ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized".to_string(),
        }
        .into_response();
    }
    next.run(req).await
}

async fn book_meta(
    State(db): State<Db>,
    Path(book_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = db.read().await;
    let book = store.books.get(&book_id).ok_or_else(|| ApiError::not_found("book"))?;
    Ok(Json(json!({
        "id": book.id,
        "title": book.title,
        "url": format!("https://fieldbook.com/books/{}", book.id),
    })))
}

async fn list_sheets(
    State(db): State<Db>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let store = db.read().await;
    let book = store.books.get(&book_id).ok_or_else(|| ApiError::not_found("book"))?;
    let sheets = book
        .sheets
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "title": s.title,
                "slug": s.slug,
                "url": format!("https://api.fieldbook.com/v1/{}/{}", book.id, s.slug),
            })
        })
        .collect();
    Ok(Json(sheets))
}

async fn list_fields(
    State(db): State<Db>,
    Path(sheet_id): Path<String>,
) -> Result<Json<Vec<Field>>, ApiError> {
    let store = db.read().await;
    store
        .books
        .values()
        .flat_map(|b| b.sheets.iter())
        .find(|s| s.id == sheet_id)
        .map(|s| Json(s.fields.clone()))
        .ok_or_else(|| ApiError::not_found("sheet"))
}

async fn list_records(
    State(db): State<Db>,
    Path((book_id, sheet)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let store = db.read().await;
    let sheet = store.sheet(&book_id, &sheet)?;
    let query = ListQuery::from_pairs(params);
    let records = sheet
        .records
        .iter()
        .filter(|r| query.matches(r))
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|r| query.project(r))
        .collect();
    Ok(Json(records))
}

async fn get_record(
    State(db): State<Db>,
    Path((book_id, sheet, record_id)): Path<(String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Record>, ApiError> {
    let store = db.read().await;
    let sheet = store.sheet(&book_id, &sheet)?;
    let query = ListQuery::from_pairs(params);
    sheet
        .records
        .iter()
        .find(|r| has_id(r, &record_id))
        .map(|r| Json(query.project(r)))
        .ok_or_else(|| ApiError::not_found("record"))
}

async fn create_record(
    State(db): State<Db>,
    Path((book_id, sheet)): Path<(String, String)>,
    Json(input): Json<Record>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let mut store = db.write().await;
    let id = store.next_id;
    let sheet = store.sheet_mut(&book_id, &sheet)?;
    let mut record = Record::new();
    record.insert("id".to_string(), json!(id));
    record.insert(
        "record_url".to_string(),
        json!(format!("https://fieldbook.com/records/{id}")),
    );
    for (key, value) in input {
        if key != "id" && key != "record_url" {
            record.insert(key, value);
        }
    }
    sheet.records.push(record.clone());
    store.next_id += 1;
    tracing::debug!(book = %book_id, id, "Created record");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    State(db): State<Db>,
    Path((book_id, sheet, record_id)): Path<(String, String, String)>,
    Json(input): Json<Record>,
) -> Result<Json<Record>, ApiError> {
    let mut store = db.write().await;
    let sheet = store.sheet_mut(&book_id, &sheet)?;
    let record = sheet
        .records
        .iter_mut()
        .find(|r| has_id(r, &record_id))
        .ok_or_else(|| ApiError::not_found("record"))?;
    for (key, value) in input {
        if key != "id" && key != "record_url" {
            record.insert(key, value);
        }
    }
    Ok(Json(record.clone()))
}

/// Always 204: Fieldbook does not report deleting a record that is not there.
async fn delete_record(
    State(db): State<Db>,
    Path((book_id, sheet, record_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    let sheet = store.sheet_mut(&book_id, &sheet)?;
    let before = sheet.records.len();
    sheet.records.retain(|r| !has_id(r, &record_id));
    tracing::debug!(
        book = %book_id,
        record = %record_id,
        removed = before - sheet.records.len(),
        "Deleted record"
    );
    Ok(StatusCode::NO_CONTENT)
}

fn has_id(record: &Record, id: &str) -> bool {
    record.get("id").is_some_and(|v| value_matches(v, id))
}

fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

#[derive(Debug, Default)]
struct ListQuery {
    limit: Option<usize>,
    offset: usize,
    include: Vec<String>,
    exclude: Vec<String>,
    filters: Vec<(String, String)>,
}

impl ListQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "limit" => query.limit = value.parse().ok(),
                "offset" => query.offset = value.parse().unwrap_or(0),
                "include" => query.include = split_fields(&value),
                "exclude" => query.exclude = split_fields(&value),
                _ => query.filters.push((key, value)),
            }
        }
        query
    }

    fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(k, v)| record.get(k).is_some_and(|value| value_matches(value, v)))
    }

    /// `id` survives any projection.
    fn project(&self, record: &Record) -> Record {
        record
            .iter()
            .filter(|(k, _)| {
                k.as_str() == "id"
                    || ((self.include.is_empty() || self.include.contains(k))
                        && !self.exclude.contains(k))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn split_fields(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
