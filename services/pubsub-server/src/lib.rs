pub mod config;
pub mod http;
pub mod startup;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/subscribers", post(http::subscribers::post_subscribers).get(http::subscribers::get_combined_set))
        .route(
            "/subscribers/{location}",
            get(http::subscribers::get_subscriber).put(http::subscribers::put_subscriber).delete(http::subscribers::delete_subscriber),
        )
        .route("/publish", post(http::publish::post_publish))
        .route("/diagnostics/subscriptions", get(http::diagnostics::list_subscriptions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
