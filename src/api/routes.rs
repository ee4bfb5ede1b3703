use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/users/:user_key/balance/:contract_number",
            get(handlers::get_balance),
        )
        .route(
            "/users/:user_key/withdrawals",
            post(handlers::create_withdrawal),
        )
        .route("/status/:transaction_id", get(handlers::get_status))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
