use axum::{extract::DefaultBodyLimit, Router};

mod health;
mod predict;

// ---

pub fn router() -> Router {
    // ---
    // Histories have no size cap; axum would otherwise reject bodies over 2 MiB
    Router::new()
        .merge(predict::router())
        .merge(health::router())
        .layer(DefaultBodyLimit::disable())
}
