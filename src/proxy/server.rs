use crate::cache::{CacheInvalidator, RenderCache};
use crate::error::AppResult;
use crate::proxy::config::ProxyConfig;
use crate::proxy::upstream::UpstreamClient;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{any, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: Arc<UpstreamClient>,
    /// Rendered SSG/ISR pages and their tagged fetches
    pub render_cache: RenderCache,
    /// What the revalidation gateway invalidates; the render cache unless overridden
    pub invalidator: Arc<dyn CacheInvalidator>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let render_cache = RenderCache::new();
        Self {
            upstream: Arc::new(UpstreamClient::new(&config)),
            config: Arc::new(config),
            invalidator: Arc::new(render_cache.clone()),
            render_cache,
        }
    }

    /// Swap the invalidation backend (tests, external CDN purgers)
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }
}

/// Build the full route table
pub fn build_router(state: AppState) -> Router {
    use crate::proxy::handlers::{items, pages, proxy, revalidate};
    use crate::proxy::middleware;

    let mut app = Router::new()
        // Generic proxy; request bodies are forwarded without a size cap
        .route(
            "/api/proxy/*path",
            any(proxy::handle_proxy).layer(DefaultBodyLimit::disable()),
        )
        // Item reads
        .route("/api/pages", get(items::handle_list_pages))
        .route("/api/pages/:id", get(items::handle_get_page))
        .route("/api/ssg_pages/:id", get(items::handle_get_ssg_page))
        .route("/api/sections", get(items::handle_sections))
        .route("/api/ssr_sections", get(items::handle_ssr_sections))
        // Cache lifecycle
        .route("/api/revalidate", post(revalidate::handle_revalidate))
        // Rendered pages
        .route("/csr_page/:id", get(pages::handle_csr_page))
        .route("/ssr_page/:id", get(pages::handle_ssr_page))
        .route("/ssg_page/:id", get(pages::handle_ssg_page))
        .route("/isr_page/:id", get(pages::handle_isr_page))
        .route("/healthz", get(health_check_handler));

    if let Some(dir) = &state.config.static_dir {
        app = app.nest_service(
            middleware::cache_control::STATIC_PREFIX,
            ServeDir::new(dir),
        );
    }

    app.layer(axum::middleware::from_fn(
        middleware::cache_control_middleware,
    ))
    .layer(axum::middleware::from_fn(middleware::logging_middleware))
    .layer(TraceLayer::new_for_http())
    .layer(middleware::cors_layer())
    .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        config: &ProxyConfig,
        state: AppState,
    ) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let app = build_router(state);

        // Bind address
        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Edge server started at http://{}", local_addr);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
            local_addr,
        };

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                // Dropping the connection drops the handler future with it
                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Edge server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}
