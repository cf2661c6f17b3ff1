//! Listener setup and connection handling.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use gantry_core::error::{Exception, Result};

use super::handler::{ServerState, handle};
use crate::executor::Executor;

/// Listener and transport settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins echoed in `Access-Control-Allow-Origin`.
    pub allowed_origins: Vec<String>,
    /// Delay between event-stream cycles, in milliseconds.
    pub event_stream_interval_ms: u64,
}

impl ServerConfig {
    /// Create a configuration for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        let host: std::net::IpAddr = self.host.parse().unwrap_or([0, 0, 0, 0].into());
        SocketAddr::new(host, self.port)
    }

    /// Event-stream cycle interval.
    pub fn event_stream_interval(&self) -> Duration {
        Duration::from_millis(self.event_stream_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
            event_stream_interval_ms: 2000,
        }
    }
}

/// HTTP server running an [`Executor`].
pub struct EngineServer {
    state: Arc<ServerState>,
}

impl EngineServer {
    /// Create a server.
    pub fn new(config: ServerConfig, executor: Executor) -> Self {
        Self {
            state: Arc::new(ServerState::new(config, executor)),
        }
    }

    /// Shared handler state.
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let config = self.state.config();
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            Exception::config(format!("failed to bind {}:{}", config.host, config.port)).wrap(e)
        })?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections accepted on an already bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener
            .local_addr()
            .map_err(|e| Exception::unknown("listener has no local address").wrap(e))?;
        tracing::info!(address = %local, "gantry server started");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = result
                        .map_err(|e| Exception::unknown("failed to accept connection").wrap(e))?;

                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle(req, state).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            if !e.is_incomplete_message() {
                                tracing::warn!(
                                    remote = %remote_addr,
                                    error = %e,
                                    "HTTP connection error"
                                );
                            }
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("gantry server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.event_stream_interval(), Duration::from_secs(2));
    }

    #[test]
    fn server_config_socket_addr() {
        let config = ServerConfig::new("127.0.0.1", 9000);
        let addr = config.socket_addr();

        assert_eq!(addr.port(), 9000);
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ServerConfig = serde_yaml::from_str("port: 9090\nallowed_origins: [https://a.example]").unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.allowed_origins, vec!["https://a.example"]);
    }
}
