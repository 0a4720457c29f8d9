use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;

/// File ids the player reports, fixed for the lifetime of the server.
pub type Files = Arc<Vec<String>>;

pub fn app(files: Vec<String>) -> Router {
    let files: Files = Arc::new(files);
    Router::new()
        .route("/api/available-files", get(available_files))
        .with_state(files)
}

pub async fn run(listener: TcpListener, files: Vec<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(files)).await
}

async fn available_files(State(files): State<Files>) -> Json<Vec<String>> {
    log::info!("serving {} available files", files.len());
    Json(files.as_ref().clone())
}
