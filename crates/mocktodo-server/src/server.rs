use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use mocktodo_auth::{
    AuthConfig, AuthMode, AuthService, AuthState, AuthorizationCodeStore, ConfigError, JwtService,
    OidcConfig, OidcProvider, SessionRegistry, SigningKeyPair, http as auth_http, require_auth,
    spawn_sweeper,
};
use mocktodo_storage::{RecordSet, StorageError, Stores, create_stores};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, error::ServerError, handlers};

/// State shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub auth: AuthState,
    /// Whether the task routes sit behind [`require_auth`].
    pub auth_required: bool,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub fn build_app(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.auth.clone(), require_auth);

    // Authentication routes (no auth required)
    let mut auth_routes = Router::new()
        .route("/auth/register", post(auth_http::register_handler))
        .route("/auth/jwks", get(auth_http::jwks_handler))
        .route("/.well-known/jwks.json", get(auth_http::jwks_handler))
        .route(
            "/.well-known/openid_configuration",
            get(auth_http::discovery_handler),
        );
    if state.auth.mode == AuthMode::Oidc {
        auth_routes = auth_routes
            .route(
                "/auth/authorize",
                get(auth_http::authorize_get).post(auth_http::authorize_post),
            )
            .route("/auth/token", post(auth_http::token_handler))
            .route("/auth/userinfo", get(auth_http::userinfo_handler));
    } else {
        auth_routes = auth_routes
            .route("/auth/login", post(auth_http::login_handler))
            .route("/auth/logout", post(auth_http::logout_handler));
    }

    // `/auth/me` is always authenticated, whatever `auth.required` says
    let me = Router::new()
        .route("/auth/me", get(auth_http::me_handler))
        .route_layer(auth_layer.clone());

    let mut tasks = Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        );
    if state.auth_required {
        tasks = tasks.route_layer(auth_layer);
    }

    Router::new()
        .merge(auth_routes)
        .merge(me)
        .merge(tasks)
        .route("/internal/memory-state", get(handlers::memory_state))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Opens the stores, sets up key material and, in oidc mode, loads the
    /// client configuration.
    pub async fn build(self) -> Result<MockTodoServer, ServerError> {
        self.config
            .validate()
            .map_err(|e| ServerError::Config(ConfigError::InvalidValue(e)))?;
        let auth_config = &self.config.auth;
        let stores = create_stores(&self.config.storage_backend()).await?;

        let key_mode = auth_config.key_mode()?;
        // RSA generation is CPU bound
        let keys = tokio::task::spawn_blocking(move || SigningKeyPair::from_key_mode(&key_mode))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;
        let jwt = Arc::new(JwtService::new(keys));
        tracing::info!(
            mode = %auth_config.mode,
            algorithm = %jwt.algorithm(),
            required = auth_config.required,
            "Authentication configured"
        );

        let service = Arc::new(AuthService::new(
            Arc::clone(&stores.users),
            jwt,
            auth_config.token_lifetime,
        ));
        let sessions = Arc::new(SessionRegistry::new());
        let mut auth = AuthState::new(
            auth_config,
            Arc::clone(&service),
            Arc::clone(&sessions),
            self.config.base_url(),
        );

        if auth_config.mode == AuthMode::Oidc {
            auth = auth.with_oidc(build_oidc_provider(auth_config, service)?);
        }

        Ok(MockTodoServer {
            addr: self.addr,
            state: AppState {
                stores,
                auth,
                auth_required: auth_config.required,
            },
            sessions,
            cancel: CancellationToken::new(),
            shutdown_grace: self.config.server.shutdown_grace,
            sweep_interval: auth_config.sweep_interval,
        })
    }
}

fn build_oidc_provider(
    config: &AuthConfig,
    service: Arc<AuthService>,
) -> Result<Arc<OidcProvider>, ConfigError> {
    let path = config.oidc_config.as_deref().ok_or_else(|| {
        ConfigError::Missing("auth.oidc_config is required when auth.mode = \"oidc\"".into())
    })?;
    let oidc_config = OidcConfig::from_file(path)?;
    tracing::info!(
        issuer = %oidc_config.issuer,
        client_id = %oidc_config.client_id,
        "OIDC provider configured"
    );

    let codes = Arc::new(AuthorizationCodeStore::new(
        config.authorization_code_lifetime,
    ));
    Ok(Arc::new(OidcProvider::new(
        oidc_config,
        service,
        codes,
        config.access_token_lifetime,
    )))
}

pub struct MockTodoServer {
    addr: SocketAddr,
    state: AppState,
    sessions: Arc<SessionRegistry>,
    cancel: CancellationToken,
    shutdown_grace: Duration,
    sweep_interval: Duration,
}

impl MockTodoServer {
    /// Returns a handle that can stop the server and read its stores.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            cancel: self.cancel.clone(),
            stores: self.state.stores.clone(),
        }
    }

    pub fn app(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener).await
    }

    /// Serves on `listener` until SIGINT/SIGTERM or [`ServerHandle::stop`].
    ///
    /// In-flight requests get the configured grace period; after that the
    /// server task is aborted.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.app();
        tracing::info!("listening on {}", listener.local_addr()?);

        let sweeper = spawn_sweeper(
            Arc::clone(&self.sessions),
            self.state.auth.oidc.clone(),
            self.sweep_interval,
            self.cancel.clone(),
        );
        let signals = tokio::spawn(shutdown_signal(self.cancel.clone()));

        let graceful = self.cancel.clone();
        let mut serve = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { graceful.cancelled().await })
                .await
        });

        let result = tokio::select! {
            res = &mut serve => res,
            _ = self.cancel.cancelled() => {
                match tokio::time::timeout(self.shutdown_grace, &mut serve).await {
                    Ok(res) => res,
                    Err(_) => {
                        tracing::warn!(
                            grace = ?self.shutdown_grace,
                            "shutdown grace period elapsed, aborting in-flight requests"
                        );
                        serve.abort();
                        Ok(Ok(()))
                    }
                }
            }
        };

        self.cancel.cancel();
        signals.abort();
        if let Err(e) = sweeper.await {
            tracing::error!(error = %e, "credential sweeper failed");
        }
        tracing::info!("server stopped");

        result.map_err(|e| std::io::Error::other(e.to_string()))??;
        Ok(())
    }
}

/// Cloneable control handle of a [`MockTodoServer`].
#[derive(Clone)]
pub struct ServerHandle {
    cancel: CancellationToken,
    stores: Stores,
}

impl ServerHandle {
    /// Starts graceful shutdown.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Every task and user currently in the stores.
    pub async fn memory_state(&self) -> Result<RecordSet, StorageError> {
        self.stores.snapshot().await
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => return,
    }
    tracing::info!("shutdown signal received");
    cancel.cancel();
}
