//! Router assembly and middleware stack

pub mod articles;
pub mod health;

use axum::{routing::get, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{metrics, AppState};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout();
    let max_concurrent = state.config.server.max_concurrent_requests;

    let api_routes = Router::new()
        .route("/", get(articles::root_redirect))
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route("/articles/new", get(articles::new_article))
        .route(
            "/articles/{id}",
            get(articles::show_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route("/articles/{id}/edit", get(articles::edit_article))
        .route("/health", get(health::health))
        .route("/readiness", get(health::readiness));

    Router::new()
        .merge(api_routes)
        .merge(metrics::metrics_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(ConcurrencyLimitLayer::new(max_concurrent)),
        )
        .with_state(state)
}
