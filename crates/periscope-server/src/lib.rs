//! Periscope Server - forward proxy HTTP server.
//!
//! This crate provides the HTTP surface for the Periscope content proxy.
//!
//! ## Endpoints
//!
//! - `GET /` - Landing page with a URL entry form
//! - `ANY /p?u=<url>` - Fetch the percent-encoded target and return it,
//!   rewritten so every embedded reference routes back through the proxy
//!
//! ## Example
//!
//! ```no_run
//! use periscope_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default()).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
mod home;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::{any, get};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use periscope_core::{FALLBACK_USER_AGENT, PROXY_PATH};

pub use error::{ProxyError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8088;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 8088).
    pub port: u16,
    /// User-Agent presented upstream when the client sends none.
    pub user_agent: String,
    /// Timeout applied to upstream fetches (default: none).
    pub timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user_agent: FALLBACK_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the fallback User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the upstream fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Failed to build the upstream HTTP client.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// The proxy HTTP server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server with the given configuration.
    pub fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let state = AppState::new(config.user_agent.as_str(), config.timeout)?;
        Self::with_state(config, state)
    }

    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let router = build_router(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Periscope proxy on {}", self.addr);

        // Create socket with SO_REUSEADDR to allow binding even when sockets are lingering
        let socket = Socket::new(Domain::for_address(self.addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Allow address reuse (helps with TIME_WAIT/CLOSE_WAIT sockets)
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Bind and listen
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Set non-blocking for tokio
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Convert to tokio TcpListener
        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route(PROXY_PATH, any(handlers::proxy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
