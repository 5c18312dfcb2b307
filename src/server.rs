//! Relay Server
//!
//! Wires the session client, session state, dispatcher and HTTP router
//! together and runs them until Ctrl-C.

use crate::api::{self, AppState};
use crate::client::SessionClient;
use crate::config::Config;
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::event_log::EventLog;
use crate::session::{self, SessionState};
use anyhow::{Context, Result};
use axum::Router;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Capacity of the lifecycle event channel.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Port {0} is already in use. Choose another one.")]
    PortInUse(u16),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Bind the HTTP listener. An occupied port is reported as
/// [`StartupError::PortInUse`] so the caller can stop before anything else
/// starts.
pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, StartupError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr).await.map_err(|source| {
        if source.kind() == io::ErrorKind::AddrInUse {
            StartupError::PortInUse(port)
        } else {
            StartupError::Bind { addr, source }
        }
    })
}

/// The assembled relay
pub struct RelayServer {
    config: Config,
    client: Arc<dyn SessionClient>,
    session: SessionState,
    log: Arc<EventLog>,
    dispatcher: Arc<Dispatcher>,
}

impl RelayServer {
    pub fn new(config: Config, client: Arc<dyn SessionClient>, log: Arc<EventLog>) -> Self {
        let session = SessionState::new();
        let dispatcher = Arc::new(Dispatcher::new(
            client.clone(),
            session.clone(),
            log.clone(),
            DispatchOptions::from(&config.dispatch),
        ));

        Self {
            config,
            client,
            session,
            log,
            dispatcher,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn router(&self) -> Router {
        api::router(
            AppState {
                session: self.session.clone(),
                dispatcher: self.dispatcher.clone(),
            },
            &self.config.server,
        )
    }

    /// Start the session client and serve HTTP on `listener` until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let pump = session::spawn_event_pump(rx, self.session.clone(), self.log.clone());

        self.client
            .initialize(tx)
            .await
            .context("Failed to initialize WhatsApp session client")?;

        let local = listener
            .local_addr()
            .context("Failed to read listener address")?;
        self.log
            .record(format!("HTTP server listening on http://{local}"));

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error");

        pump.abort();
        tracing::info!("Relay stopped");
        result
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
