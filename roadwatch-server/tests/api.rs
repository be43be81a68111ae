use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use roadwatch_core::{RoadGraphBuilder, RoutingEngine, SeverityPolicy};
use roadwatch_server::{AppState, Limits, StaticDirectory, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

/// A-B-C-D along the equator with a detour A-E-D of the same length
fn app() -> (Router, Arc<AppState>) {
    let mut builder = RoadGraphBuilder::new();
    builder
        .add_node("A", 0.0, 0.0)
        .add_node("B", 0.0, 0.001)
        .add_node("C", 0.0, 0.002)
        .add_node("D", 0.0, 0.003)
        .add_node("E", 0.001, 0.0015)
        .add_edge("A", "B", Some(1.0), false)
        .add_edge("B", "C", Some(1.0), false)
        .add_edge("C", "D", Some(1.0), false)
        .add_edge("A", "E", Some(2.0), false)
        .add_edge("E", "D", Some(2.0), false);
    let engine = RoutingEngine::new(builder.build().unwrap(), SeverityPolicy::default()).unwrap();

    let identity = Arc::new(StaticDirectory::new([(
        "u1".to_string(),
        "Asha".to_string(),
    )]));
    let state = Arc::new(AppState::new(Arc::new(engine), identity, 50.0));
    (build_router(Arc::clone(&state), Limits::default()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn report(node_id: &str, severity: &str, owner: &str) -> Value {
    json!({
        "node_id": node_id,
        "name": "Burst pipe",
        "type": "Flooding",
        "severity": severity,
        "expected_duration": "1:00:00",
        "comments": "water everywhere",
        "owner": owner,
    })
}

#[tokio::test]
async fn nodes_are_geojson_points() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/nodes", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 5);
    assert_eq!(features[0]["geometry"]["type"], "Point");
}

#[tokio::test]
async fn shortest_path_follows_the_cheapest_route() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/shortest_path",
        Some(json!({"source": "A", "destination": "D"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"], json!(["A", "B", "C", "D"]));
    assert_eq!(body["cost"], 3.0);
    assert_eq!(body["path"][0], json!([0.0, 0.0]));
    assert!(!body["explored"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn critical_obstacle_forces_the_detour() {
    let (app, _) = app();
    let (status, saved) = send(&app, "POST", "/save_obstacles", Some(report("B", "Critical", "u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["owner_name"], "Asha");
    assert_eq!(saved["type"], "Flooding");
    assert_eq!(saved["expected_duration"], "1:00:00");

    let (_, body) = send(
        &app,
        "POST",
        "/shortest_path",
        Some(json!({"source": "A", "destination": "D"})),
    )
    .await;
    assert_eq!(body["nodes"], json!(["A", "E", "D"]));
    assert_eq!(body["cost"], 4.0);
}

#[tokio::test]
async fn integer_ids_are_accepted() {
    let mut builder = RoadGraphBuilder::new();
    builder
        .add_node("1", 0.0, 0.0)
        .add_node("2", 0.0, 0.001)
        .add_edge("1", "2", None, false);
    let engine = RoutingEngine::new(builder.build().unwrap(), SeverityPolicy::default()).unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(engine),
        Arc::new(StaticDirectory::default()),
        50.0,
    ));
    let app = build_router(state, Limits::default());

    let (status, body) = send(
        &app,
        "POST",
        "/shortest_path",
        Some(json!({"source": 1, "destination": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"], json!(["1", "2"]));
}

#[tokio::test]
async fn errors_carry_a_machine_code() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/shortest_path",
        Some(json!({"source": "A", "destination": "Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_NODE");

    let (status, body) = send(&app, "POST", "/shortest_path", Some(json!({"source": "A"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = send(&app, "POST", "/save_obstacles", Some(report("Z", "High", "u1"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NODE_NOT_FOUND");

    let (status, body) = send(&app, "POST", "/save_obstacles", Some(report("A", "Apocalyptic", "u1"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OBSTACLE");

    let mut endless = report("A", "High", "u1");
    endless["expected_duration"] = json!("9000000000000000:00:00");
    let (status, body) = send(&app, "POST", "/save_obstacles", Some(endless)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OBSTACLE");
}

#[tokio::test]
async fn blocked_everywhere_means_no_path() {
    let (app, _) = app();
    send(&app, "POST", "/save_obstacles", Some(report("B", "Critical", "u1"))).await;
    send(&app, "POST", "/save_obstacles", Some(report("E", "Critical", "u1"))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/shortest_path",
        Some(json!({"source": "A", "destination": "D"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NO_PATH");
}

#[tokio::test]
async fn only_the_owner_can_delete() {
    let (app, _) = app();
    let (_, saved) = send(&app, "POST", "/save_obstacles", Some(report("C", "High", "u1"))).await;
    let id = saved["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/delete_obstacle",
        Some(json!({"id": id, "owner": "u2"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_OWNER");

    let (status, body) = send(
        &app,
        "POST",
        "/delete_obstacle",
        Some(json!({"id": id, "owner": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "id": id}));

    let (status, body) = send(
        &app,
        "POST",
        "/delete_obstacle",
        Some(json!({"id": id, "owner": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, listed) = send(&app, "GET", "/get_obstacles", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn coordinate_only_reports_snap_to_the_nearest_node() {
    let (app, _) = app();
    let mut body = report("", "Low", "u1");
    body.as_object_mut().unwrap().remove("node_id");
    body["latitude"] = json!(0.0);
    body["longitude"] = json!(0.0021);

    let (status, saved) = send(&app, "POST", "/save_obstacles", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["node_id"], "C");
    assert_eq!(saved["longitude"], 0.0021);

    body["latitude"] = json!(10.0);
    let (status, error) = send(&app, "POST", "/save_obstacles", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NODE_NOT_FOUND");
}

#[tokio::test]
async fn obstacles_are_listed_with_owner_names() {
    let (app, _) = app();
    send(&app, "POST", "/save_obstacles", Some(report("B", "Moderate", "u1"))).await;
    send(&app, "POST", "/save_obstacles", Some(report("C", "Low", "u9"))).await;

    let (status, body) = send(&app, "GET", "/get_obstacles", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["node_id"], "B");
    assert_eq!(listed[0]["owner_name"], "Asha");
    assert_eq!(listed[1]["owner_name"], "u9");
    assert_eq!(listed[1]["severity"], "Low");
    assert!(listed[0]["created_at"].is_string());
}

#[tokio::test]
async fn saved_obstacles_reach_the_change_feed() {
    let (app, state) = app();
    let mut events = state.events.subscribe();

    send(&app, "POST", "/save_obstacles", Some(report("B", "High", "u1"))).await;
    let event = events.recv().await.unwrap();
    assert_eq!(event.kind(), "added");
    assert_eq!(event.obstacle().node_id, "B");
}

#[tokio::test]
async fn boundary_nearest_and_health() {
    let (app, _) = app();

    let (status, body) = send(&app, "GET", "/map_boundary", None).await;
    assert_eq!(status, StatusCode::OK);
    let ring = body["boundary"].as_array().unwrap();
    assert!(ring.len() >= 4);
    assert_eq!(ring.first(), ring.last());

    let (status, body) = send(&app, "GET", "/nearest?lat=0.0009&lon=0.0016", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "E");

    let (status, body) = send(&app, "GET", "/nearest?lat=north", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = send(&app, "GET", "/nearest?lat=NaN&lon=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_COORDINATES");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["nodes"], 5);
    assert_eq!(body["edges"], 10);
}

#[tokio::test]
async fn expired_obstacles_are_announced_after_compaction() {
    let (app, state) = app();
    let (_, saved) = send(&app, "POST", "/save_obstacles", Some(report("C", "High", "u1"))).await;

    let mut events = state.events.subscribe();
    let removed = state
        .engine
        .overlay()
        .compact(chrono::Utc::now() + chrono::TimeDelta::hours(2));
    assert_eq!(removed, 1);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind(), "expired");
    assert_eq!(event.obstacle().id, saved["id"].as_str().unwrap());

    let (_, listed) = send(&app, "GET", "/get_obstacles", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn slow_searches_time_out() {
    const SIDE: usize = 300;
    let id = |row: usize, col: usize| format!("{row}-{col}");

    let mut builder = RoadGraphBuilder::new();
    for row in 0..SIDE {
        for col in 0..SIDE {
            builder.add_node(id(row, col), row as f64 * 0.0005, col as f64 * 0.0005);
            if col > 0 {
                builder.add_edge(id(row, col - 1), id(row, col), None, false);
            }
            if row > 0 {
                builder.add_edge(id(row - 1, col), id(row, col), None, false);
            }
        }
    }
    let engine = RoutingEngine::new(builder.build().unwrap(), SeverityPolicy::default()).unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(engine),
        Arc::new(StaticDirectory::default()),
        50.0,
    ));
    let limits = Limits {
        request_timeout: Duration::from_millis(1),
        ..Limits::default()
    };
    let app = build_router(state, limits);

    let (status, body) = send(
        &app,
        "POST",
        "/shortest_path",
        Some(json!({"source": "0-0", "destination": id(SIDE - 1, SIDE - 1)})),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert!(body["code"] == "TIMEOUT" || body["code"] == "CANCELLED", "{body}");
}
