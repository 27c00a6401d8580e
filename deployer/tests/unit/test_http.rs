//! HTTP adapter tests against a local fake API

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};

use fndeploy::api::{get_function_by_name, FunctionApi};
use fndeploy::app::options::ApiOptions;
use fndeploy::errors::DeployError;
use fndeploy::http::client::AUTH_HEADER;
use fndeploy::http::HttpClient;
use functions_api::models::UpdateFunctionRequest;

const SECRET: &str = "11111111-2222-3333-4444-555555555555";
const PREFIX: &str = "/functions/v1beta1/regions/fr-par";

/// Requests seen by the fake API, as `METHOD path?query`
#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) {
        Some(SECRET) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn function_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "namespace_id": "ns-1",
        "status": "ready",
        "runtime": "python313",
        "handler": "handler.handle",
        "tags": ["created_by=fndeploy"],
        "domain_name": format!("{}.functions.fnc.fr-par.scw.cloud", name),
    })
}

async fn list_functions(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let page = query.get("page").cloned().unwrap_or_default();
    seen.requests.lock().unwrap().push(format!(
        "GET /functions page={} page_size={} name={}",
        page,
        query.get("page_size").cloned().unwrap_or_default(),
        query.get("name").cloned().unwrap_or_default(),
    ));

    let functions = match page.as_str() {
        "1" => vec![function_json("fn-1", "hello"), function_json("fn-2", "hello-world")],
        "2" => vec![function_json("fn-3", "say-hello")],
        _ => vec![],
    };
    Ok(Json(json!({ "functions": functions, "total_count": 3 })))
}

async fn get_namespace(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if authorized(&headers).is_err() {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "message": "permission denied", "type": "denied_authentication" })),
    )
}

async fn update_function(
    State(seen): State<Seen>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    seen.bodies.lock().unwrap().push(body);
    Ok(Json(function_json(&id, "hello")))
}

async fn upload_url(
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let length = query.get("content_length").cloned().unwrap_or_default();
    Ok(Json(json!({
        "url": format!("https://storage.example.com/{}?size={}", id, length),
        "headers": { "content-length": [length] },
    })))
}

async fn deploy_function(
    State(seen): State<Seen>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    seen.bodies.lock().unwrap().push(body);
    let mut function = function_json(&id, "hello");
    function["status"] = json!("pending");
    Ok(Json(function))
}

async fn start_api() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route(&format!("{}/functions", PREFIX), get(list_functions))
        .route(&format!("{}/functions/{{id}}", PREFIX), patch(update_function))
        .route(&format!("{}/functions/{{id}}/upload-url", PREFIX), get(upload_url))
        .route(&format!("{}/functions/{{id}}/deploy", PREFIX), post(deploy_function))
        .route(&format!("{}/namespaces/{{id}}", PREFIX), get(get_namespace))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), seen)
}

fn client(base_url: &str, secret: &str) -> HttpClient {
    let options = ApiOptions {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        ..ApiOptions::new(SecretString::from(secret.to_string()))
    };
    HttpClient::new(options).unwrap()
}

#[tokio::test]
async fn test_listing_follows_pages() {
    let (base_url, seen) = start_api().await;
    let api = client(&base_url, SECRET);

    let functions = api.list_functions(Some("hello")).await.unwrap();

    let ids: Vec<&str> = functions.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["fn-1", "fn-2", "fn-3"]);
    assert_eq!(
        *seen.requests.lock().unwrap(),
        vec![
            "GET /functions page=1 page_size=100 name=hello".to_string(),
            "GET /functions page=2 page_size=100 name=hello".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_lookup_by_name_picks_exact_match() {
    let (base_url, _seen) = start_api().await;
    let api = client(&base_url, SECRET);

    let function = get_function_by_name(&api, "hello-world").await.unwrap();
    assert_eq!(function.id, "fn-2");

    let err = get_function_by_name(&api, "hell").await.unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
}

#[tokio::test]
async fn test_error_body_becomes_remote_error() {
    let (base_url, _seen) = start_api().await;
    let api = client(&base_url, SECRET);

    let err = api.get_namespace("ns-1").await.unwrap_err();

    match err {
        DeployError::RemoteApi { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "permission denied");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let (base_url, _seen) = start_api().await;
    let api = client(&base_url, "not-the-secret");

    let err = api.list_functions(None).await.unwrap_err();
    assert!(matches!(err, DeployError::RemoteApi { status: 401, .. }));
}

#[tokio::test]
async fn test_partial_update_sends_only_set_fields() {
    let (base_url, seen) = start_api().await;
    let api = client(&base_url, SECRET);
    let request = UpdateFunctionRequest {
        tags: Some(vec!["created_by=fndeploy".to_string()]),
        redeploy: Some(false),
        ..Default::default()
    };

    let function = api.update_function("fn-1", &request).await.unwrap();

    assert_eq!(function.id, "fn-1");
    assert_eq!(
        seen.bodies.lock().unwrap()[0],
        json!({ "tags": ["created_by=fndeploy"], "redeploy": false })
    );
}

#[tokio::test]
async fn test_upload_url_carries_content_length() {
    let (base_url, _seen) = start_api().await;
    let api = client(&base_url, SECRET);

    let upload = api.get_upload_url("fn-1", 10_240).await.unwrap();

    assert_eq!(upload.url, "https://storage.example.com/fn-1?size=10240");
    assert_eq!(upload.headers["content-length"], vec!["10240".to_string()]);
}

#[tokio::test]
async fn test_deploy_posts_empty_object() {
    let (base_url, seen) = start_api().await;
    let api = client(&base_url, SECRET);

    let function = api.deploy_function("fn-1").await.unwrap();

    assert_eq!(function.status.as_str(), "pending");
    assert_eq!(seen.bodies.lock().unwrap()[0], json!({}));
}
