mod assets;
pub mod requests;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{
    config::SimConfig,
    scheduler::SteppingScheduler,
    world::{lock_world, SharedWorld, SimulationWorld, WorldSnapshot},
};

use self::requests::{parse_add_sphere, parse_delete_sphere, DeleteTarget};

pub struct AppState {
    world: SharedWorld,
    broadcaster: broadcast::Sender<String>,
    closing: AtomicBool,
}

impl AppState {
    pub fn new(world: SharedWorld, broadcaster: broadcast::Sender<String>) -> Self {
        Self {
            world,
            broadcaster,
            closing: AtomicBool::new(false),
        }
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn message(text: impl Into<String>) -> Json<MessageBody> {
    Json(MessageBody {
        message: text.into(),
        id: None,
    })
}

fn error_response(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: text.into() })).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/styles.css", get(styles))
        .route("/app.js", get(script))
        .route("/api/state", get(latest_state))
        .route("/api/reset", post(reset_simulation))
        .route("/api/add_sphere", post(add_sphere))
        .route("/api/delete_sphere", post(delete_sphere))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

pub async fn run(config: SimConfig) -> Result<()> {
    config.validate()?;
    let world: SharedWorld = Arc::new(Mutex::new(SimulationWorld::from_config(&config)));
    if config.population.reset_on_start {
        lock_world(&world).reset();
    }

    let (tx, _) = broadcast::channel::<String>(64);
    let every = config.server.broadcast_every;
    let tx_for_sim = tx.clone();
    let scheduler = SteppingScheduler::from_config(world.clone(), &config.stepping).with_hook(
        move |step, world| {
            if every == 0 || step % every != 0 || tx_for_sim.receiver_count() == 0 {
                return;
            }
            if let Ok(payload) = serde_json::to_string(&world.world_snapshot()) {
                let _ = tx_for_sim.send(payload);
            }
        },
    );
    let stepper = scheduler
        .spawn()
        .context("failed to start the stepping thread")?;

    let state = Arc::new(AppState::new(world, tx));
    let app = router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    println!(
        "[web] Sphere simulation live at http://{} (Ctrl+C to stop)",
        addr
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tokio::task::spawn_blocking(move || stepper.shutdown()).await?;
    println!("[web] Server stopped.");
    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    let _ = tokio::signal::ctrl_c().await;
    println!("[web] Shutting down...");
    state.closing.store(true, Ordering::SeqCst);
    // wakes idle event streams so they observe the flag
    let _ = state.broadcaster.send(String::new());
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        assets::STYLES_CSS,
    )
}

async fn script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        assets::APP_JS,
    )
}

pub async fn latest_state(State(state): State<Arc<AppState>>) -> Json<WorldSnapshot> {
    let snapshot = lock_world(&state.world).world_snapshot();
    Json(snapshot)
}

pub async fn reset_simulation(State(state): State<Arc<AppState>>) -> Json<MessageBody> {
    println!("[web] Resetting simulation...");
    lock_world(&state.world).reset();
    message("Simulation reset successfully.")
}

pub async fn add_sphere(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let params = match parse_add_sphere(&body) {
        Ok(params) => params,
        Err(err) => {
            eprintln!("[web] Rejected add_sphere: {err}");
            return error_response(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    let (id, total) = {
        let mut world = lock_world(&state.world);
        let id = world.add(params);
        (id, world.len())
    };
    println!("[web] Added sphere {id}. Total spheres: {total}");

    Json(MessageBody {
        message: "Sphere added successfully".into(),
        id: Some(id.raw()),
    })
    .into_response()
}

pub async fn delete_sphere(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let target = match parse_delete_sphere(&body) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("[web] Rejected delete_sphere: {err}");
            return error_response(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    let removed_total = match target {
        DeleteTarget::Sphere(id) => {
            let mut world = lock_world(&state.world);
            world.remove_by_id(id).then(|| world.len())
        }
        DeleteTarget::Unassignable(_) => None,
    };

    if let Some(total) = removed_total {
        println!("[web] Deleted sphere {target}. Total spheres: {total}");
        message(format!("Sphere {target} deleted successfully.")).into_response()
    } else {
        println!("[web] Sphere {target} not found for deletion.");
        error_response(
            StatusCode::NOT_FOUND,
            format!("Sphere with ID {target} not found."),
        )
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let watcher = state.clone();
    let stream = BroadcastStream::new(rx)
        .take_while(move |_| !watcher.closing.load(Ordering::SeqCst))
        .filter_map(|msg| match msg {
            Ok(payload) => Some(Ok(Event::default().event("state").data(payload))),
            Err(_) => None,
        });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
