//! HTTP front of the symbol server.

mod sink;

use axum::Router;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use http::header::ALLOW;
use http::{Method, StatusCode};
use sink::ChannelSink;
use std::future::Future;
use std::sync::Arc;
use symserve_core::SymbolService;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Every path goes through the symbol service; it answers 404 for what it does not know.
pub fn router(service: Arc<SymbolService>) -> Router {
    Router::new().fallback(serve_symbol).with_state(service)
}

pub async fn run_http_server(
    listener: TcpListener,
    service: Arc<SymbolService>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(
        "Symbol server listening on {} under {}",
        listener.local_addr()?,
        service.resolver().prefix()
    );
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Symbol server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn serve_symbol(State(service): State<Arc<SymbolService>>, request: Request) -> Response {
    if request.method() != Method::GET {
        return (StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, "GET")]).into_response();
    }

    let (parts, _body) = request.into_parts();
    let head = http::Request::from_parts(parts, ());
    let (head_tx, head_rx) = oneshot::channel();

    let task = tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(head_tx);
        service.handle(&head, &mut sink);
    });

    match head_rx.await {
        Ok(response) => response,
        Err(_) => {
            // The handler ended without committing a response, which only a panic does.
            let message = match task.await {
                Err(e) => e.to_string(),
                Ok(()) => "no response produced".to_string(),
            };
            error!("Symbol request handler failed: {}", message);
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
    }
}
