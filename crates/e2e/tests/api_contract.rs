//! API checks against an in-process stand-in for the movie API

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use kinocheck_common::HarnessConfig;
use kinocheck_e2e::contract::{run_api_check, ApiCheck};
use kinocheck_e2e::{
    default_suite, ApiContractChecker, ApiSession, CheckSpec, ChromeProvider, FsReportSink,
    TestRunner,
};

const KEY: &str = "test-key";

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>, Option<String>)>>>,
}

impl Recorded {
    fn queries(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(q, ..)| q.clone()).collect()
    }
}

fn record(state: &Recorded, headers: &HeaderMap, uri: &Uri) {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
    state.requests.lock().push((
        uri.query().unwrap_or_default().to_string(),
        header("x-api-key"),
        header("accept"),
    ));
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"statusCode": 401, "message": "В запросе не указан токен!"})),
    )
        .into_response()
}

fn docs(items: Value) -> Response {
    Json(json!({"docs": items, "total": 1, "limit": 5, "page": 1, "pages": 1})).into_response()
}

async fn movies(
    State(state): State<Recorded>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    record(&state, &headers, &uri);
    if headers.get("x-api-key").map_or(true, |v| v != KEY) {
        return unauthorized();
    }

    if params.contains_key("year") {
        return docs(json!([
            {
                "id": 430,
                "name": "Шрэк",
                "year": 2001,
                "ageRating": 6,
                "genres": [{"name": "мультфильм"}],
                "rating": {"kp": 8.1}
            },
            {"id": 689, "name": "Гарри Поттер и философский камень", "year": 2001, "ageRating": 12},
        ]));
    }
    if params.contains_key("ageRating") {
        return docs(json!([
            {"id": 361, "name": "Бойцовский клуб", "year": 1999, "ageRating": 18},
            {"id": 342, "name": "Криминальное чтиво", "year": 1994, "ageRating": "16+"},
            {"id": 1, "name": "Без рейтинга", "ageRating": "unrated"},
        ]));
    }
    if params.contains_key("genres.name") {
        return docs(json!([
            {"id": 430, "name": "Шрэк", "genres": [{"name": "Мультфильм"}, {"name": "комедия"}]},
            {"id": 2, "name": "Тайна Коко", "genres": [{"name": "анимация"}]},
        ]));
    }
    if params.contains_key("type") {
        return docs(json!([
            {"id": 404900, "name": "Во все тяжкие", "year": 2008, "rating": {"kp": 8.9}}
        ]));
    }
    docs(json!([{"id": 430, "name": "Шрэк"}]))
}

async fn search(
    State(state): State<Recorded>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    record(&state, &headers, &uri);
    if headers.get("x-api-key").map_or(true, |v| v != KEY) {
        return unauthorized();
    }
    let query = params.get("query").cloned().unwrap_or_default();
    docs(json!([{"id": 430, "name": query}, {"id": 431, "name": format!("{} 2", query)}]))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn movie_api() -> (String, Recorded) {
    let state = Recorded::default();
    let router = Router::new()
        .route("/v1.4/movie", get(movies))
        .route("/v1.4/movie/search", get(search))
        .with_state(state.clone());
    (spawn(router).await, state)
}

async fn fixed_body(status: StatusCode, body: &'static str) -> String {
    let router = Router::new().route("/v1.4/movie", get(move || async move { (status, body) }));
    spawn(router).await
}

fn session(base_url: &str, key: &str) -> ApiSession {
    ApiSession::new(base_url, key, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn key_valid_sends_fixed_headers() {
    let (base, recorded) = movie_api().await;
    let session = session(&base, KEY);
    let checker = ApiContractChecker::new(&session, 200);
    let dir = tempfile::tempdir().unwrap();
    let sink = FsReportSink::new(dir.path()).unwrap();

    let outcome = run_api_check(&checker, "api_key_valid", &ApiCheck::KeyValid { limit: 1 }, &sink)
        .await
        .unwrap();

    assert_eq!(outcome.notes, vec!["1 records returned"]);
    let requests = recorded.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "limit=1");
    assert_eq!(requests[0].1.as_deref(), Some(KEY));
    assert_eq!(requests[0].2.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn wrong_key_is_a_contract_violation() {
    let (base, _) = movie_api().await;
    let session = session(&base, "wrong");
    let checker = ApiContractChecker::new(&session, 200);
    let dir = tempfile::tempdir().unwrap();
    let sink = FsReportSink::new(dir.path()).unwrap();

    let err = run_api_check(&checker, "api_key_valid", &ApiCheck::KeyValid { limit: 1 }, &sink)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "contract_violation");
    assert!(err.to_string().contains("status 401"));
    let evidence = sink.entries_for("api_key_valid");
    assert_eq!(evidence.len(), 1);
    let preview = std::fs::read_to_string(&evidence[0].path).unwrap();
    assert!(preview.contains("GET /v1.4/movie?limit=1"));
    assert!(preview.contains("status: 401"));
}

#[tokio::test]
async fn filter_flows_pass_on_conforming_data() {
    let (base, recorded) = movie_api().await;
    let session = session(&base, KEY);
    let checker = ApiContractChecker::new(&session, 200);
    let dir = tempfile::tempdir().unwrap();
    let sink = FsReportSink::new(dir.path()).unwrap();

    let year_check = ApiCheck::Year { year: 2001, limit: 5 };
    let year = run_api_check(&checker, "api_year", &year_check, &sink).await;
    assert!(year.is_ok());

    let age_check = ApiCheck::AgeRating { min_age: 16, limit: 5 };
    let age = run_api_check(&checker, "api_age_rating", &age_check, &sink)
        .await
        .unwrap();
    assert!(age.notes.iter().any(|n| n.contains("'Без рейтинга'")));

    let search = run_api_check(
        &checker,
        "api_search",
        &ApiCheck::Search {
            query: "Шрек".into(),
            limit: 3,
        },
        &sink,
    )
    .await;
    assert!(search.is_ok());

    let queries = recorded.queries();
    assert_eq!(queries[0], "year=2001&limit=5");
    assert_eq!(queries[1], "ageRating=16&limit=5&sortField=rating.kp&sortType=-1");
    assert!(queries[2].starts_with("query=%D0%A8"));
}

#[tokio::test]
async fn year_mismatch_is_a_predicate_failure() {
    let base = fixed_body(
        StatusCode::OK,
        r#"{"docs":[{"id":430,"name":"Шрэк","year":2001},{"id":431,"name":"Шрэк 2","year":2004}]}"#,
    )
    .await;
    let session = session(&base, KEY);
    let checker = ApiContractChecker::new(&session, 200);
    let dir = tempfile::tempdir().unwrap();
    let sink = FsReportSink::new(dir.path()).unwrap();

    let err = run_api_check(&checker, "api_year", &ApiCheck::Year { year: 2001, limit: 5 }, &sink)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "business_predicate_failure");
    assert!(err.to_string().contains("'Шрэк 2' (id 431): year 2004 != 2001"));
    let names: Vec<String> = sink.entries_for("api_year").into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["response", "records", "violations"]);
}

#[tokio::test]
async fn docs_not_a_sequence_is_a_contract_violation() {
    let base = fixed_body(StatusCode::OK, r#"{"docs":{"name":"Шрэк"}}"#).await;
    let session = session(&base, KEY);
    let checker = ApiContractChecker::new(&session, 200);

    let verdict = checker
        .check(&ApiCheck::KeyValid { limit: 1 }.query_spec())
        .await
        .unwrap();
    assert_eq!(verdict.status_code, 200);
    assert!(!verdict.schema_valid);
}

#[tokio::test]
async fn closed_port_is_a_network_error_with_evidence() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = session(&format!("http://{}", addr), KEY);
    let checker = ApiContractChecker::new(&session, 200);
    let dir = tempfile::tempdir().unwrap();
    let sink = FsReportSink::new(dir.path()).unwrap();

    let err = run_api_check(&checker, "api_key_valid", &ApiCheck::KeyValid { limit: 1 }, &sink)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "network_error");
    assert!(err.is_fatal());

    let evidence = sink.entries_for("api_key_valid");
    assert_eq!(evidence.len(), 1);
    let text = std::fs::read_to_string(&evidence[0].path).unwrap();
    assert!(text.starts_with("GET /v1.4/movie?limit=1\nnetwork_error: Network error"));
}

#[tokio::test]
async fn runner_executes_api_suite_and_writes_results() {
    let (base, _) = movie_api().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = HarnessConfig::default();
    config.api.base_url = base;
    config.api.key = Some(KEY.to_string());
    config.report.output_dir = dir.path().join("results");

    let provider = ChromeProvider::new(config.browser.clone());
    let sink = FsReportSink::new(config.report.output_dir.join("evidence")).unwrap();
    let runner = TestRunner::new(&config, &provider, &sink);

    let specs = CheckSpec::select(default_suite(), Some("api"), None);
    assert_eq!(specs.len(), 6);

    let result = runner.run_specs(&specs).await.unwrap();
    for check in &result.results {
        assert!(check.success, "{} failed: {:?}", check.name, check.error);
    }
    assert!(result.all_passed());

    let path = runner.write_results(&result).unwrap();
    let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["total"], 6);
    assert_eq!(written["passed"], 6);

    let manifest = sink.write_manifest().unwrap();
    assert!(manifest.ends_with("evidence/manifest.json"));
    assert!(!sink.entries_for("api_genre").is_empty());
}
