use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream},
    select,
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{
    config::HubConfig,
    registry::{Registry, SessionId},
    router::{self, SessionEnd},
};

/// State shared by the accept loop and every session task.
pub struct HubState {
    pub registry: Registry,
    pub config: HubConfig,
}

impl HubState {
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
        }
    }
}

pub struct Hub {
    listener: TcpListener,
    state: Arc<HubState>,
}

impl Hub {
    /// Binds `config.listen`. Nothing else happens if the bind fails.
    pub async fn bind(config: HubConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.listen)
            .await
            .with_context(|| format!("failed to listen on {}", config.listen))?;
        Ok(Self::new(listener, config))
    }

    pub fn new(listener: TcpListener, config: HubConfig) -> Self {
        Self {
            listener,
            state: Arc::new(HubState::new(config)),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> Arc<HubState> {
        Arc::clone(&self.state)
    }

    /// Accepts connections until `shutdown` resolves, then drops every
    /// registered stream and aborts every session task, closing their sockets.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        info!("hub listening on {}", self.listener.local_addr()?);
        tokio::pin!(shutdown);

        let mut sessions = JoinSet::new();
        loop {
            select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        sessions.spawn(async move { serve_connection(stream, peer, &state).await });
                    }
                    Err(err) => warn!(error = ?err, "accept failed, still listening"),
                },
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            }
        }

        close_sessions(&self.state, sessions).await;
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(ctrl_c()).await
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "ctrl-c handler unavailable, hub runs until killed");
        std::future::pending::<()>().await;
    }
}

async fn close_sessions(state: &HubState, mut sessions: JoinSet<()>) {
    let registered = state.registry.drain().await;
    info!(registered, running = sessions.len(), "hub shutting down");
    sessions.shutdown().await;
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, state: &HubState) {
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let (session, writer) = state.registry.register(writer).await;
    info!(session, %peer, "user connected");

    match router::route_session(state, session, &mut reader, &writer).await {
        Ok(SessionEnd::Disconnected) => info!(session, %peer, "user disconnected"),
        Ok(SessionEnd::Rejected(err)) => {
            warn!(session, %peer, error = %err, "dropping user after protocol error")
        }
        Err(err) => warn!(session, %peer, error = ?err, "error reading from connection"),
    }

    cleanup_session(state, session).await;
}

async fn cleanup_session(state: &HubState, session: SessionId) {
    if !state.config.prune_disconnected {
        return;
    }
    if state.registry.remove(session).await.is_some() {
        debug!(session, "removed from registry");
    }
}
