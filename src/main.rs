use std::sync::Arc;

use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use atelier_api::auth::{CredentialVerifier, JwtVerifier};
use atelier_api::handlers;
use atelier_api::middleware::{optional_principal, require_principal};
use atelier_api::state::AppState;
use atelier_api::store::{PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = atelier_api::config::config();
    tracing::info!("Starting Atelier API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = Arc::new(PgStore::connect().await?);
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(JwtVerifier::from_config()?);
    let state = AppState::new(store, verifier);

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("ATELIER_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Atelier API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes(state.clone()))
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Read surface: anonymous access allowed, bad credentials degrade to
/// anonymous so public pages keep rendering.
fn public_routes(state: AppState) -> Router<AppState> {
    use handlers::{articles, courses, projects, tags};

    Router::new()
        .route("/api/articles", get(articles::list))
        .route("/api/articles/:id", get(articles::detail))
        .route("/api/courses", get(courses::list))
        .route("/api/courses/:id", get(courses::detail))
        .route("/api/projects", get(projects::list))
        .route("/api/projects/:id", get(projects::detail))
        .route("/api/tags", get(tags::list))
        .layer(axum::middleware::from_fn_with_state(
            state,
            optional_principal,
        ))
}

/// Write surface plus whoami: credential resolution fails closed.
fn protected_routes(state: AppState) -> Router<AppState> {
    use axum::routing::{delete, post, put};
    use handlers::{articles, auth, courses, projects, tags};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/articles", post(articles::create))
        .route(
            "/api/articles/:id",
            put(articles::update).delete(articles::delete),
        )
        .route("/api/courses", post(courses::create))
        .route("/api/courses/:id/modules", post(courses::create_module))
        .route("/api/modules/:id/lessons", post(courses::create_lesson))
        .route("/api/projects", post(projects::create))
        .route("/api/tags/:id", delete(tags::delete))
        .layer(axum::middleware::from_fn_with_state(
            state,
            require_principal,
        ))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Atelier API",
            "version": version,
            "description": "Creator platform backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "articles": "/api/articles[/:slug] (public read, author write)",
                "courses": "/api/courses[/:slug], /api/courses/:id/modules, /api/modules/:id/lessons",
                "projects": "/api/projects[/:slug] (public read, author write)",
                "tags": "/api/tags (public), /api/tags/:id (admin delete)",
                "auth": "/api/auth/whoami (protected)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
