use crate::{
    call::WelcomeApp,
    config::Config,
    handler::middleware::request_log::log_requests,
    server::{CallHandler, RealtimeServer},
};
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub server: RealtimeServer,
    pub token: CancellationToken,
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateBuilder {
    pub config: Option<Config>,
    pub handler: Option<Arc<dyn CallHandler>>,
    pub token: Option<CancellationToken>,
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            handler: None,
            token: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Application logic answering call events. Defaults to [`WelcomeApp`].
    pub fn handler(mut self, handler: Arc<dyn CallHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn build(self) -> AppState {
        let config = Arc::new(self.config.unwrap_or_default());
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(WelcomeApp::new(config.welcome_media.clone())));

        let mut server = RealtimeServer::new(handler);
        if let Some(name) = &config.server_name {
            server = server.with_banner(name);
        }

        Arc::new(AppStateInner {
            config,
            server,
            token: self.token.unwrap_or_default(),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;
    crate::handler::router(&state.config.path)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn(log_requests))
}

pub async fn run(state: AppState) -> Result<()> {
    let addr: SocketAddr = state.config.http_addr.parse()?;
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", addr, e));
        }
    };
    serve(listener, state).await
}

/// Serve call events on an already bound listener until the state's token is
/// cancelled.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let token = state.token.clone();
    info!(
        addr = %listener.local_addr()?,
        path = state.config.path.as_str(),
        banner = ?state.server.banner(),
        "serving call events"
    );

    let app = create_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { token.cancelled().await })
    .await
    .map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    info!("Server shut down gracefully");
    Ok(())
}
