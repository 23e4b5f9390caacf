// ABOUTME: Liveness and readiness probes
// ABOUTME: Readiness round-trips the database and the key-value store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

//! Health check routes for service monitoring

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::server::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .with_state(resources)
    }

    async fn handle_health() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339()
        }))
    }

    async fn handle_ready(
        State(resources): State<Arc<ServerResources>>,
    ) -> (StatusCode, Json<Value>) {
        let database = match resources.database.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                warn!("Readiness: database check failed: {e}");
                "unavailable"
            }
        };
        let store = match resources.kv.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                warn!("Readiness: {} check failed: {e}", resources.kv.backend_name());
                "unavailable"
            }
        };

        let ready = database == "ok" && store == "ok";
        let status = if ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (
            status,
            Json(json!({
                "status": if ready { "ready" } else { "not_ready" },
                "checks": {
                    "database": database,
                    "keyValueStore": store,
                },
                "timestamp": Utc::now().to_rfc3339()
            })),
        )
    }
}
