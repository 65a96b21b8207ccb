//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use vhost_registry::config::ServiceConfig;
use vhost_registry::http::HttpServer;
use vhost_registry::lifecycle::Shutdown;
use vhost_registry::vhosts::{error_handler, handler, Handler, Vhost, Vhosts};
use axum::http::StatusCode;

/// Handler answering 200 with a fixed body.
#[allow(dead_code)]
pub fn text_handler(body: &'static str) -> Handler {
    handler(move |ctx| ctx.send_string(body))
}

/// A vhost answering "Hello, World!" whose error handler answers 404.
#[allow(dead_code)]
pub fn hello_vhost(hostname: &str) -> Vhost {
    Vhost::new(
        hostname,
        "",
        "site-1",
        text_handler("Hello, World!"),
        error_handler(|ctx, _| ctx.send_status(StatusCode::NOT_FOUND)),
    )
}

/// Start the HTTP server on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(vhosts: Arc<Vhosts>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ServiceConfig::default();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, vhosts);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
