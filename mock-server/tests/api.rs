use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use mock_server::{app, API_KEY, API_SECRET, BOOK_ID, SHEET_ID};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn basic_auth() -> String {
    format!("Basic {}", STANDARD.encode(format!("{API_KEY}:{API_SECRET}")))
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, basic_auth())
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, basic_auth())
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn records_uri() -> String {
    format!("/v1/{BOOK_ID}/tasks")
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app()
        .oneshot(Request::builder().uri(records_uri()).body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn wrong_secret_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri(records_uri())
                .header(
                    http::header::AUTHORIZATION,
                    format!("Basic {}", STANDARD.encode(format!("{API_KEY}:nope"))),
                )
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- records ---

#[tokio::test]
async fn list_records_empty() {
    let resp = app().oneshot(request("GET", &records_uri())).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn create_record_returns_201_with_id() {
    let resp = app()
        .oneshot(json_request("POST", &records_uri(), r#"{"name":"Ann"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let record = body_json(resp).await;
    assert_eq!(record["name"], "Ann");
    assert_eq!(record["id"], 1);
}

#[tokio::test]
async fn unknown_sheet_returns_404() {
    let resp = app()
        .oneshot(request("GET", &format!("/v1/{BOOK_ID}/nope")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_missing_record_returns_404() {
    let resp = app()
        .oneshot(request("GET", &format!("{}/99", records_uri())))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["message"], "record not found");
}

#[tokio::test]
async fn update_missing_record_returns_404() {
    let resp = app()
        .oneshot(json_request("PATCH", &format!("{}/99", records_uri()), r#"{"name":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_missing_record_still_returns_204() {
    let resp = app()
        .oneshot(request("DELETE", &format!("{}/99", records_uri())))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

// --- metadata ---

#[tokio::test]
async fn book_meta_describes_book() {
    let resp = app()
        .oneshot(request("GET", &format!("/v1/books/{BOOK_ID}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let book = body_json(resp).await;
    assert_eq!(book["id"], BOOK_ID);
    assert_eq!(book["title"], "Projects");
}

#[tokio::test]
async fn sheet_list_has_seeded_sheet() {
    let resp = app()
        .oneshot(request("GET", &format!("/v1/books/{BOOK_ID}/sheets")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let sheets = body_json(resp).await;
    assert_eq!(sheets[0]["id"], SHEET_ID);
    assert_eq!(sheets[0]["slug"], "tasks");
}

#[tokio::test]
async fn field_list_includes_picklist_enum() {
    let resp = app()
        .oneshot(request("GET", &format!("/v1/sheets/{SHEET_ID}/fields")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let fields = body_json(resp).await;
    assert_eq!(fields[0]["slug"], "name");
    assert_eq!(fields[1]["enum"], json!(["open", "closed"]));
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();
    let uri = records_uri();

    for body in [
        r#"{"name":"Walk dog","status":"open"}"#,
        r#"{"name":"Feed cat","status":"closed"}"#,
        r#"{"name":"Water plants","status":"open"}"#,
    ] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("POST", &uri, body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // filter
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("{uri}?status=open")))
        .await
        .unwrap();
    let open = body_json(resp).await;
    assert_eq!(open.as_array().unwrap().len(), 2);

    // limit, offset and include
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("{uri}?limit=1&offset=1&include=name")))
        .await
        .unwrap();
    let page = body_json(resp).await;
    assert_eq!(page, json!([{"id": 2, "name": "Feed cat"}]));

    // update — partial
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PATCH", &format!("{uri}/1"), r#"{"status":"closed"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["name"], "Walk dog"); // unchanged
    assert_eq!(updated["status"], "closed");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", &format!("{uri}/1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete — 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("{uri}/1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &uri))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);
}
