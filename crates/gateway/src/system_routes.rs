//! `/api/system/*`: initialization status and first-run admin creation.
//!
//! Every response is a JSON envelope with a `success` flag. Backend error
//! details are logged, never returned.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use {
    agentdesk_bootstrap::{AdminSpec, Error},
    serde_json::json,
    tracing::{error, info, warn},
};

use crate::state::AppState;

/// Build the router for all `/api/system/*` routes.
pub fn system_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/init-check", get(init_check_handler))
        .route("/simple-init-check", get(simple_init_check_handler))
        .route("/init-admin", post(init_admin_handler))
}

// ── Status ───────────────────────────────────────────────────────────────────

async fn init_check_handler(State(state): State<AppState>) -> Response {
    let report = state.bootstrapper.check().await;

    if let Some(cause) = report.backend_error {
        error!(error = %cause, "initialization check failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "isInitialized": false,
                "message": "failed to check initialization status",
            })),
        )
            .into_response();
    }

    let message = if report.initialized {
        "system is initialized"
    } else {
        "system needs initialization"
    };
    let mut body = json!({
        "success": true,
        "isInitialized": report.initialized,
        "message": message,
    });
    if report.initialized
        && let Some(flag) = report.flag
    {
        body["initInfo"] = json!({
            "timestamp": flag.timestamp,
            "company": flag.company,
        });
    }
    Json(body).into_response()
}

async fn simple_init_check_handler(State(state): State<AppState>) -> Response {
    match state.bootstrapper.store().count_users().await {
        Ok(count) => {
            let needs_init = count == 0;
            let message = if needs_init {
                "no users found; initialization required"
            } else {
                "users found; system is initialized"
            };
            Json(json!({
                "success": true,
                "needsInit": needs_init,
                "userCount": count,
                "message": message,
            }))
            .into_response()
        },
        Err(e) => {
            error!(error = %e, "user count failed");
            let details = if e.is_unavailable() {
                "database unreachable"
            } else {
                "database query failed"
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "needsInit": true,
                    "error": "failed to check user count",
                    "details": details,
                })),
            )
                .into_response()
        },
    }
}

// ── Setup (first run) ────────────────────────────────────────────────────────

async fn init_admin_handler(
    State(state): State<AppState>,
    body: Result<Json<AdminSpec>, JsonRejection>,
) -> Response {
    let Json(spec) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "malformed init-admin request");
            return failure(StatusCode::BAD_REQUEST, "invalid request body");
        },
    };

    match state.bootstrapper.initialize_system(spec).await {
        Ok(outcome) => {
            info!(username = %outcome.admin.username, "administrator created via api");
            let mut body = json!({
                "success": true,
                "message": "system initialized",
                "user": outcome.admin,
            });
            if !outcome.warnings.is_empty() {
                body["warnings"] = json!(outcome.warnings);
            }
            Json(body).into_response()
        },
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &Error) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match e {
        Error::Validation { .. } | Error::AlreadyInitialized | Error::NotInitialized => {
            failure(status, &e.to_string())
        },
        Error::Conflict { .. } => {
            warn!(error = %e, "init-admin lost a uniqueness race");
            failure(status, "an administrator or company with these details already exists")
        },
        _ => {
            error!(error = %e, "init-admin failed");
            failure(status, "failed to initialize system")
        },
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message,
        })),
    )
        .into_response()
}
