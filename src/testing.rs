//! Test helpers: throwaway HTTP endpoints on localhost

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use parking_lot::Mutex;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port and return its base URL
pub(crate) async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Endpoint that records every JSON body POSTed to `/hook` and answers with a fixed status
pub(crate) struct CaptureServer {
    pub url: String,
    pub bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl CaptureServer {
    pub(crate) async fn start(status: StatusCode) -> Self {
        let bodies: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));

        async fn capture(
            State((bodies, status)): State<(Arc<Mutex<Vec<serde_json::Value>>>, StatusCode)>,
            Json(body): Json<serde_json::Value>,
        ) -> StatusCode {
            bodies.lock().push(body);
            status
        }

        let router = Router::new()
            .route("/hook", post(capture))
            .with_state((Arc::clone(&bodies), status));
        let base = spawn_router(router).await;

        Self {
            url: format!("{}/hook", base),
            bodies,
        }
    }

    pub(crate) fn received(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().clone()
    }
}
