use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::libs::dispatch::{Dispatcher, Reply, Request};
use crate::libs::error::ExplorerError;

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Every path goes to the dispatcher; routing happens there, not in axum.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

async fn handle(
    State(dispatcher): State<Dispatcher>,
    method: Method,
    uri: Uri,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Reply {
    // oversized or unreadable bodies still get a JSON envelope
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(%rejection, "cannot read request body");
            return Reply::error(&ExplorerError::UnreadableBody(rejection));
        }
    };
    // unparsable query strings behave like missing parameters
    let query = query.map(|Query(q)| q).unwrap_or_default();
    dispatcher
        .dispatch(Request {
            method: &method,
            path: uri.path(),
            query: &query,
            body: &body,
        })
        .await
}

pub async fn serve(listener: TcpListener, dispatcher: Dispatcher) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
