use std::sync::{Arc, Mutex};

use axum::{body::to_bytes, extract::State, http::StatusCode, response::Response};
use bytes::Bytes;
use serde_json::Value;
use spherebox::{
    web::{add_sphere, delete_sphere, latest_state, reset_simulation, AppState},
    world::lock_world,
    SimConfig, SimulationWorld,
};
use tokio::sync::broadcast;

fn app_state() -> Arc<AppState> {
    let mut config = SimConfig::default();
    config.population.seed = Some(17);
    let world = Arc::new(Mutex::new(SimulationWorld::from_config(&config)));
    let (tx, _) = broadcast::channel(8);
    Arc::new(AppState::new(world, tx))
}

async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn state_starts_empty_with_bounds() {
    let state = app_state();
    let document = serde_json::to_value(latest_state(State(state)).await.0).unwrap();
    assert_eq!(document["spheres"], serde_json::json!([]));
    assert_eq!(document["bounds"]["max"], serde_json::json!([15.0, 10.0, 15.0]));
}

#[tokio::test]
async fn reset_populates_ten_spheres() {
    let state = app_state();
    let ack = reset_simulation(State(state.clone())).await;
    assert_eq!(ack.0.message, "Simulation reset successfully.");

    let document = serde_json::to_value(latest_state(State(state)).await.0).unwrap();
    let spheres = document["spheres"].as_array().unwrap();
    assert_eq!(spheres.len(), 10);
    assert_eq!(spheres[0]["position"], serde_json::json!([-5.0, 0.0, 0.0]));
    assert_eq!(spheres[1]["radius"], 1.5);
}

#[tokio::test]
async fn add_returns_the_new_id() {
    let state = app_state();
    let body = Bytes::from_static(br#"{"position":[1,2,3],"velocity":[0,0,0],"radius":0.5}"#);
    let (status, document) = json_body(add_sphere(State(state.clone()), body).await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["message"], "Sphere added successfully");
    assert_eq!(document["id"], 0);
    assert_eq!(lock_world(state.world()).len(), 1);
}

#[tokio::test]
async fn malformed_add_is_a_client_error() {
    let state = app_state();
    let bodies: [&[u8]; 5] = [
        br#"{"position":[1,2],"velocity":[0,0,0],"radius":0.5}"#,
        br#"{"velocity":[0,0,0],"radius":0.5}"#,
        br#"{"position":[1,2,3],"velocity":[0,0,0],"radius":-1}"#,
        br#"{"position":[1,2,3],"velocity":[0,0,"x"],"radius":1}"#,
        b"",
    ];
    for body in bodies {
        let (status, document) =
            json_body(add_sphere(State(state.clone()), Bytes::copy_from_slice(body)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(document["error"].is_string());
    }
    assert!(lock_world(state.world()).is_empty());
}

#[tokio::test]
async fn delete_reports_found_and_missing() {
    let state = app_state();
    reset_simulation(State(state.clone())).await;

    let (status, document) =
        json_body(delete_sphere(State(state.clone()), Bytes::from_static(br#"{"id":2}"#)).await)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["message"], "Sphere 2 deleted successfully.");

    let (status, document) =
        json_body(delete_sphere(State(state.clone()), Bytes::from_static(br#"{"id":2}"#)).await)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(document["error"], "Sphere with ID 2 not found.");

    let (status, _) =
        json_body(delete_sphere(State(state.clone()), Bytes::from_static(br#"{"id":-1}"#)).await)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = json_body(
        delete_sphere(State(state.clone()), Bytes::from_static(br#"{"id":"2"}"#)).await,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(lock_world(state.world()).len(), 9);
}

#[tokio::test]
async fn run_refuses_a_config_it_cannot_schedule() {
    let mut config = SimConfig::default();
    config.stepping.rate_hz = 1.0e-30;
    let err = spherebox::web::run(config).await.unwrap_err();
    assert!(err.to_string().contains("rate_hz"), "{err}");
}
