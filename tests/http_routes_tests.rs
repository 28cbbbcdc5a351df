//! End-to-end tests of the REST surface using actix's test service

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use conflagent::error_handling::not_found_handler;
use conflagent::metrics::RequestMetrics;
use conflagent::server::{configure_app, AppState};
use conflagent::testing_utils::{InMemoryTransport, StaticTransportProvider, TestEndpointFactory};
use conflagent::config::TreeConfig;
use serde_json::{json, Value};
use std::sync::Arc;

const SECRET: &str = "team-a-secret";
const AUTH: (&str, &str) = ("Authorization", "Bearer team-a-secret");

fn app_state(transport: Arc<InMemoryTransport>) -> web::Data<AppState> {
    let _ = env_logger::builder().is_test(true).try_init();

    let registry = TestEndpointFactory::registry("team-a", SECRET).expect("valid registry");
    let provider = StaticTransportProvider::new().with("team-a", transport);
    web::Data::new(AppState::new(
        registry,
        Arc::new(provider),
        TreeConfig::default(),
    )
    .expect("valid app state"))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestMetrics::new($state.metrics.clone()))
                .app_data($state.clone())
                .configure(configure_app)
                .default_service(web::route().to(not_found_handler)),
        )
        .await
    };
}

#[tokio::test]
async fn health_is_public_and_enveloped() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/health")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], "OK");
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn health_for_unknown_endpoint_is_not_found() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/endpoint/nobody/health")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn openapi_document_is_public() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/openapi.json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let doc: Value = test::read_body_json(resp).await;
    assert_eq!(doc["openapi"], "3.1.0");
    let server_url = doc["servers"][0]["url"].as_str().unwrap();
    assert!(server_url.ends_with("/endpoint/team-a"), "got {}", server_url);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_wrong_credentials() {
    let transport = TestEndpointFactory::transport();
    transport.add_page("Notes", "1", "");
    let state = app_state(transport);
    let app = init_app!(state);

    let cases = vec![
        ("/endpoint/team-a/pages", None),
        ("/endpoint/team-a/pages/Notes", None),
        ("/endpoint/team-a/pages/Missing", None),
        ("/endpoint/team-a/pages/Notes", Some("Bearer wrong")),
        ("/endpoint/team-a/pages/Notes", Some("Basic team-a-secret")),
        ("/endpoint/team-a/pages/tree", Some(SECRET)),
        ("/endpoint/nobody/pages", Some("Bearer team-a-secret")),
        ("/endpoint/nobody/pages/Notes", None),
    ];

    for (uri, header) in cases {
        let mut req = test::TestRequest::get().uri(uri);
        if let Some(value) = header {
            req = req.insert_header(("Authorization", value));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{} {:?}", uri, header);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn auth_runs_before_body_parsing() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn team_a_scenario() {
    let transport = TestEndpointFactory::transport();
    let state = app_state(transport.clone());
    let app = init_app!(state);

    // create Notes
    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages")
        .insert_header(AUTH)
        .set_json(json!({"title": "Notes", "body": "# Hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["title"], "Notes");
    assert_eq!(body["data"]["version"], 1);

    // read Notes
    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/Notes")
        .insert_header(AUTH)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"]["body"].as_str().unwrap().contains("<h1>Hello</h1>"));

    // rename Notes -> Docs
    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages/rename")
        .insert_header(AUTH)
        .set_json(json!({"old_title": "Notes", "new_title": "Docs"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["oldTitle"], "Notes");
    assert_eq!(body["data"]["newTitle"], "Docs");

    // Notes is gone
    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/Notes")
        .insert_header(AUTH)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "NOT_FOUND");

    // list shows Docs
    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages")
        .insert_header(AUTH)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["title"], "Docs");
}

#[tokio::test]
async fn nested_paths_for_children_and_parent() {
    let transport = TestEndpointFactory::transport();
    let a = transport.add_page("A", "1", "");
    let b = transport.add_page("B", &a, "");
    transport.add_page("C", &b, "");
    let state = app_state(transport);
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/A/B/children")
        .insert_header(AUTH)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], "OK");
    assert_eq!(body["data"][0]["title"], "C");
    assert_eq!(body["data"][0]["path"], json!(["A", "B", "C"]));

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/A/B/parent")
        .insert_header(AUTH)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["parent"]["title"], "A");
    assert_eq!(body["data"]["path"], json!(["A", "B"]));

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/Sandbox/parent")
        .insert_header(AUTH)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"]["parent"].is_null());
}

#[tokio::test]
async fn tree_depth_is_validated() {
    let transport = TestEndpointFactory::transport();
    let a = transport.add_page("A", "1", "");
    transport.add_page("B", &a, "");
    let state = app_state(transport);
    let app = init_app!(state);

    for depth in ["abc", "-1", "11"] {
        let req = test::TestRequest::get()
            .uri(&format!("/endpoint/team-a/pages/tree?depth={}", depth))
            .insert_header(AUTH)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "depth {}", depth);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/tree?depth=0")
        .insert_header(AUTH)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "Sandbox");
    assert_eq!(body["data"]["children"][0]["title"], "A");
    assert_eq!(body["data"]["children"][0]["children"], json!([]));

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/tree?startTitle=A")
        .insert_header(AUTH)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "A");
    assert_eq!(body["data"]["children"][0]["title"], "B");
}

#[tokio::test]
async fn missing_fields_and_bad_json_are_invalid_input() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages")
        .insert_header(AUTH)
        .set_json(json!({"body": "no title"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(body["message"].as_str().unwrap().contains("title"));

    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages")
        .insert_header(AUTH)
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_INPUT");

    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages/rename")
        .insert_header(AUTH)
        .set_json(json!({"old_title": "A"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_accepts_content_alias_and_reports_conflicts() {
    let transport = TestEndpointFactory::transport();
    let id = transport.add_page("Notes", "1", "<p>v1</p>");
    let state = app_state(transport.clone());
    let app = init_app!(state);

    let req = test::TestRequest::put()
        .uri("/endpoint/team-a/pages/Notes")
        .insert_header(AUTH)
        .set_json(json!({"content": "<p>v2</p>"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["version"], 2);
    assert_eq!(transport.body(&id).unwrap(), "<p>v2</p>");

    transport.schedule_concurrent_write(&id, "<p>theirs</p>");
    let req = test::TestRequest::put()
        .uri("/endpoint/team-a/pages/Notes")
        .insert_header(AUTH)
        .set_json(json!({"body": "<p>ours</p>"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VERSION_CONFLICT");
    assert_eq!(transport.body(&id).unwrap(), "<p>theirs</p>");
}

#[tokio::test]
async fn circular_move_is_invalid_operation() {
    let transport = TestEndpointFactory::transport();
    let x = transport.add_page("X", "1", "");
    transport.add_page("Y", &x, "");
    let state = app_state(transport.clone());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/pages/X/move")
        .insert_header(AUTH)
        .set_json(json!({"newParentTitle": "Y"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_OPERATION");
    assert_eq!(transport.page(&x).unwrap().parent_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn upstream_failure_hides_details() {
    let transport = TestEndpointFactory::transport();
    transport.set_unavailable(true);
    let state = app_state(transport);
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages")
        .insert_header(AUTH)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "An unexpected error occurred.");
}

#[tokio::test]
async fn landing_page_and_unknown_routes() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&html);
    assert!(html.contains("Welcome to Conflagent"));
    assert!(html.contains(env!("CARGO_PKG_VERSION")));

    let req = test::TestRequest::get().uri("/nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

/// Value of the sample `metric{labels}` in Prometheus text output, 0 when absent.
fn metric_value(text: &str, metric: &str, labels: &[(&str, &str)]) -> f64 {
    let mut labels = labels.to_vec();
    labels.sort();
    let rendered: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect();
    let target = format!("{}{{{}}} ", metric, rendered.join(","));
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| line.strip_prefix(&target))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0.0)
}

#[tokio::test]
async fn metrics_count_requests_per_route() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let before = String::from_utf8_lossy(&test::read_body(resp).await).into_owned();

    let counter = [("method", "GET"), ("route", "/"), ("status", "200")];
    let histogram = [("method", "GET"), ("route", "/")];
    let before_count = metric_value(&before, "http_requests_total", &counter);
    let before_observed = metric_value(&before, "http_request_duration_seconds_count", &histogram);

    let req = test::TestRequest::get().uri("/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"), "got {}", content_type);
    let after = String::from_utf8_lossy(&test::read_body(resp).await).into_owned();

    assert_eq!(metric_value(&after, "http_requests_total", &counter), before_count + 1.0);
    assert_eq!(
        metric_value(&after, "http_request_duration_seconds_count", &histogram),
        before_observed + 1.0
    );
    assert_eq!(metric_value(&after, "http_requests_in_progress", &[("route", "/")]), 0.0);
}

#[tokio::test]
async fn metrics_label_pages_by_pattern_not_title() {
    let transport = TestEndpointFactory::transport();
    transport.add_page("Notes", "1", "<p>n</p>");
    let state = app_state(transport);
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/endpoint/team-a/pages/Notes")
        .insert_header(AUTH)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let route = "/endpoint/{endpoint}/pages/{title:.*}";
    assert_eq!(state.metrics.requests_total("GET", route, 200), 1.0);
    assert_eq!(state.metrics.in_progress(route), 0.0);
    let text = state.metrics.encode_text().unwrap();
    assert!(!text.contains("Notes"));
}

#[tokio::test]
async fn unsupported_methods_get_envelopes() {
    let state = app_state(TestEndpointFactory::transport());
    let app = init_app!(state);

    for (method, uri) in [
        (actix_web::http::Method::PUT, "/endpoint/team-a/pages"),
        (actix_web::http::Method::DELETE, "/endpoint/team-a/pages/Notes"),
        (actix_web::http::Method::GET, "/endpoint/team-a/pages/rename"),
    ] {
        let req = test::TestRequest::default()
            .method(method.clone())
            .uri(uri)
            .insert_header(AUTH)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_OPERATION");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    let req = test::TestRequest::post()
        .uri("/endpoint/team-a/health")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_OPERATION");
}
