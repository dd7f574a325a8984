//! HTTP API server for the scorekeeping core.
//!
//! Exposes the use cases as REST endpoints, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use application::{CoreConfig, GameServices};
use axum::Router;
use axum::routing::{get, post};
use event_store::{EventStore, SnapshotStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, P> {
    pub services: GameServices<S, P>,
    /// `"memory"` or `"postgres"`, reported by the health check.
    pub storage: &'static str,
}

/// Builds the state around a pair of stores.
pub fn create_state<S, P>(
    events: S,
    snapshots: P,
    config: CoreConfig,
    storage: &'static str,
) -> Arc<AppState<S, P>>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    Arc::new(AppState {
        services: GameServices::new(events, snapshots, config),
        storage,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, P>(state: Arc<AppState<S, P>>, metrics_handle: PrometheusHandle) -> Router
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    use routes::games;

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, P>))
        .route("/games", post(games::start::<S, P>))
        .route("/games/{id}", get(games::get::<S, P>))
        .route("/games/{id}/events", get(games::events::<S, P>))
        .route("/games/{id}/history", get(games::history::<S, P>))
        .route("/games/{id}/at-bats", post(games::record_at_bat::<S, P>))
        .route("/games/{id}/substitutions", post(games::substitute::<S, P>))
        .route("/games/{id}/end-inning", post(games::end_inning::<S, P>))
        .route("/games/{id}/undo", post(games::undo::<S, P>))
        .route("/games/{id}/redo", post(games::redo::<S, P>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
