//! HTTP server

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::http::handlers::relay_stream;
use crate::network::{MulticastOpener, SourceOpener};
use crate::relay::Relay;

/// Build the router. Every path goes to the relay handler, which decides
/// whether the path names a valid group.
pub fn build_router<O: SourceOpener>(relay: Arc<Relay<O>>, cors: bool) -> Router {
    let router = Router::new()
        .fallback(relay_stream::<O>)
        .with_state(relay)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// HTTP front end for a provisioned relay
pub struct HttpServer<O = MulticastOpener> {
    config: ServerConfig,
    relay: Arc<Relay<O>>,
}

impl<O: SourceOpener> HttpServer<O> {
    pub fn new(config: ServerConfig, relay: Arc<Relay<O>>) -> Self {
        Self { config, relay }
    }

    pub fn router(&self) -> Router {
        build_router(self.relay.clone(), self.config.cors)
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Relay listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Relay stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
