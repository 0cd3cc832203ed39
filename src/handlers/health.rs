use axum::response::Json;
use serde_json::{json, Value};

/// GET / - service info
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Todo API (Rust)",
            "version": version,
            "description": "Multi-tenant todo API with owner isolation and quota admission",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "todos": "/todos, /todos/:id (protected - bearer token, access key per policy)",
            }
        }
    }))
}

/// GET /health - liveness check
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}
