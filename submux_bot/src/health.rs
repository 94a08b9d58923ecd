use axum::routing::get;
use axum::{Json, Router};

/// One-route liveness endpoint, served only when PORT is configured.
pub async fn serve(port: u16) {
    let app = Router::new().route("/", get(|| async { Json("submux") }));
    let addr = format!("0.0.0.0:{port}");
    match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            log::info!("[health] listening on http://{addr}");
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[health] server error: {e}");
            }
        }
        Err(e) => log::error!("[health] failed to bind {addr}: {e}"),
    }
}
