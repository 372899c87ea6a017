//! HTTP server for OCR processing.

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use handlebars::Handlebars;
use tower_http::trace::TraceLayer;

use crate::{
    config::{AppConfig, Variant},
    ocr::engines::TextExtractor,
    prelude::*,
};

pub mod html;
pub mod json;
pub mod preview;

/// State shared by all handlers. Cloned per request; everything inside is
/// read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<dyn TextExtractor>,
    templates: Arc<Handlebars<'static>>,
}

impl AppState {
    /// Build handler state, compiling our templates.
    pub fn new(config: AppConfig, engine: Arc<dyn TextExtractor>) -> Result<Self> {
        let mut templates = Handlebars::new();
        html::register_templates(&mut templates)?;
        Ok(Self {
            config: Arc::new(config),
            engine,
            templates: Arc::new(templates),
        })
    }
}

/// Build the router for the configured variant. Each variant sets its own
/// request body limit.
pub fn router(state: AppState) -> Router {
    let routes = match state.config.variant {
        Variant::Html => html::routes(&state.config),
        Variant::Json => json::routes(),
    };
    routes
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until we're asked to shut down.
#[instrument(level = "debug", skip_all)]
pub async fn run_server(config: AppConfig, engine: Arc<dyn TextExtractor>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| {
            format!("invalid listen address {}:{}", config.host, config.port)
        })?;
    if config.variant == Variant::Html && !config.default_image.is_file() {
        warn!(
            path = %config.default_image.display(),
            "Default image not found; requests without an upload will show an error"
        );
    }

    let variant = config.variant;
    let app = router(AppState::new(config, engine)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;
    info!(%addr, ?variant, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Cannot listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
pub mod test_utils;
