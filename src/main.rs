use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use todo_api_rust::config;
use todo_api_rust::handlers::{health, todos};
use todo_api_rust::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up TODO_AUTH_*, TODO_QUOTA_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting Todo API in {:?} mode", config.environment);

    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {}", e);
        std::process::exit(1);
    }

    let state = AppState::new(config).expect("failed to build application state");
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("TODO_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Todo API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    let config = config::config();

    // Admission runs before credential verification; both run before any
    // store access.
    let protected = Router::new()
        .route("/todos", get(todos::list).post(todos::create))
        .route(
            "/todos/:id",
            get(todos::get).put(todos::update).delete(todos::delete),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            todo_api_rust::middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            todo_api_rust::middleware::admission_middleware,
        ))
        .with_state(state);

    let mut app = Router::new()
        // Public
        .route("/", get(health::root))
        .route("/health", get(health::health))
        // Protected todo surface
        .merge(protected)
        // Unknown routes 404 before any auth work
        .fallback(todos::not_found)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(TraceLayer::new_for_http());

    if config.api.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}
