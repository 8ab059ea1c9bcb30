mod handlers;

use std::path::Path;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::db::Repository;

const STATIC_DIR: &str = "web";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/news", get(handlers::list_news))
        .route("/api/news/{id}", get(handlers::get_news))
        .route("/health", get(handlers::health))
        .with_state(state);

    // Serve the browser frontend when its assets are present
    if Path::new(STATIC_DIR).exists() {
        let serve_dir = ServeDir::new(STATIC_DIR)
            .not_found_service(ServeFile::new(format!("{STATIC_DIR}/index.html")));
        router.fallback_service(serve_dir)
    } else {
        router
    }
}
