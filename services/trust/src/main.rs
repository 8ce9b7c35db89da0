use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod breaker;
mod error;
mod health;
mod models;
mod registry;
mod routes;
mod state;

use breaker::{BreakerConfig, CircuitBreaker};
use registry::RegistryClient;
use state::AppState;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let discovery_url =
        std::env::var("DISCOVERY_URL").context("DISCOVERY_URL must be set")?;
    let pool_max = std::env::var("DB_POOL_MAX")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(pool_max)
        .idle_timeout(Duration::from_secs(20))
        .acquire_timeout(Duration::from_secs(10))
        .connect(&database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let registry = RegistryClient::new(&discovery_url)
        .context("Failed to build registry client")?;
    let breaker = CircuitBreaker::new(BreakerConfig::default());
    let state = Arc::new(AppState::new(pool.clone(), registry, breaker));

    let cors = match std::env::var("CORS_ORIGIN") {
        Ok(origin) if origin != "*" => {
            let origin = origin
                .parse::<HeaderValue>()
                .context("CORS_ORIGIN is not a valid origin")?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        _ => CorsLayer::permissive(),
    };

    let draining = Arc::new(AtomicBool::new(false));
    let drain_started = Arc::new(Notify::new());

    // Once draining has begun, every request is answered with 503.
    let drain_flag = draining.clone();
    let reject_during_drain = middleware::from_fn(move |request: Request, next: Next| {
        let draining = drain_flag.clone();
        async move {
            if draining.load(Ordering::Relaxed) {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({ "error": "shutting down" })),
                )
                    .into_response();
            }
            next.run(request).await
        }
    });

    let app = Router::new()
        .merge(health::routes())
        .merge(routes::trust::routes())
        .merge(routes::identities::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::verify_signatures,
        ))
        .layer(reject_during_drain)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3002);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "fides-trustd listening");

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(draining, drain_started.clone()));

    let drain_deadline = async {
        drain_started.notified().await;
        tokio::time::sleep(DRAIN_TIMEOUT).await;
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => warn!("Drain deadline reached, forcing shutdown"),
    }

    pool.close().await;
    info!("fides-trustd stopped");
    Ok(())
}

async fn shutdown_signal(draining: Arc<AtomicBool>, drain_started: Arc<Notify>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    draining.store(true, Ordering::Relaxed);
    drain_started.notify_waiters();
    info!("Shutdown signal received, draining in-flight requests");
}
