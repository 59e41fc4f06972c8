//! # Meal Ping
//!
//! Backend for a shared-residence meal bell: one member announces that a
//! meal is starting, everyone else gets pinged on their phone and answers
//! with a lightweight "joining" / "not coming".
//!
//! The service keeps a member directory (name to push token) and a single
//! active meal event. Starting a meal replaces whatever event was active
//! before; there is no expiry and no multi-event support. Announcements
//! fan out through Expo push in three staggered bursts so the alert is
//! hard to miss, and clients poll `GET /meal/current` for RSVP state.
//!
//! ## Routes
//!
//! - `GET /` — health plus directory-store connectivity
//! - `POST /register` — upsert a member and their push token
//! - `POST /meal` — start a meal event and notify everyone else
//! - `GET /meal/current` — the active event, or `no_active_meal`
//! - `POST /meal/rsvp` — record a join / not_coming decision

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod event;
pub mod push;
pub mod routes;
pub mod state;

use routes::{current_handler, health_handler, meal_handler, register_handler, rsvp_handler};
use state::State;

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(health_handler))
        .route("/register", post(register_handler))
        .route("/meal", post(meal_handler))
        .route("/meal/current", get(current_handler))
        .route("/meal/rsvp", post(rsvp_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = app(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
