//! HTTP API Module
//!
//! Axum router for the generic CRUD endpoints, the raw SQL passthrough and
//! the health endpoints, plus the server entry point with graceful shutdown.

pub mod dto;
pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::auth::{bearer_token, ApiKeyVerifier, CredentialVerifier};
use crate::config::HttpConfig;
use crate::protocol::Handler;

use self::error::RestError;
use self::handlers::{admin, crud, sql};

/// Paths that never require a credential.
const PUBLIC_PATHS: [&str; 4] = ["/", "/health", "/live", "/ready"];

#[derive(Clone)]
struct Verifier(Arc<dyn CredentialVerifier>);

/// Middleware: credential check.
/// Expects `Authorization: Bearer <key>`; health endpoints and the root banner stay
/// public. The verified `Identity` is attached to the request extensions.
async fn auth_middleware(
    Extension(verifier): Extension<Verifier>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let identity = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| verifier.0.verify(token));

    match identity {
        Some(identity) => {
            tracing::debug!(subject = %identity.subject, path = %req.uri().path(), "authenticated");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        None => RestError::unauthorized("Invalid or missing API key").into_response(),
    }
}

fn cors_layer(config: &HttpConfig) -> Option<CorsLayer> {
    if !config.cors_origins.is_empty() {
        // Explicit origins configured: restrict to those
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| {
                let parsed = s.parse();
                if parsed.is_err() {
                    tracing::warn!(origin = %s, "invalid CORS origin ignored");
                }
                parsed.ok()
            })
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if config.cors_allow_all {
        Some(CorsLayer::permissive())
    } else {
        // Same-origin only
        None
    }
}

/// Creates the Axum router
pub fn create_router(handler: Arc<Handler>, config: &HttpConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(admin::root))
        .route("/health", get(admin::health))
        .route("/live", get(admin::liveness))
        .route("/ready", get(admin::readiness))
        .route("/crud/:table", get(crud::list_rows).post(crud::create_row))
        .route(
            "/crud/:table/:item_id",
            get(crud::read_row)
                .put(crud::update_row)
                .delete(crud::delete_row),
        );

    // Raw SQL is operator-only: mounted behind auth, or on explicit opt-in
    if config.auth.enabled || config.enable_raw_sql {
        app = app
            .route("/sql", post(sql::execute_sql))
            .route("/sql/", post(sql::execute_sql));
    }

    app = app
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(Extension(handler));

    // Extension must be the OUTER layer so the middleware can extract it.
    // In Axum, .layer(A).layer(B) means B wraps A, so B runs first.
    if config.auth.enabled {
        let verifier = ApiKeyVerifier::from_config(&config.auth);
        if verifier.is_empty() {
            tracing::warn!("auth enabled with no API keys configured; all data requests will be rejected");
        }
        app = app
            .layer(middleware::from_fn(auth_middleware))
            .layer(Extension(Verifier(Arc::new(verifier))));
    }

    if let Some(cors) = cors_layer(config) {
        app = app.layer(cors);
    }

    app
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Listens for SIGINT (ctrl-c) and SIGTERM. In-flight requests are allowed
/// to finish; statements already sent to the database are not cancelled.
pub async fn start_http_server(
    handler: Arc<Handler>,
    config: &HttpConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(handler, config);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let socket = match addr {
        SocketAddr::V4(_) => tokio::net::TcpSocket::new_v4()?,
        SocketAddr::V6(_) => tokio::net::TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;

    tracing::info!(%addr, raw_sql = config.auth.enabled || config.enable_raw_sql, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await;
                tracing::info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}
