use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trackql_core::{GatewayError, GraphRequest, Introspection};

// ── Envelopes ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQueryParams {
    query: Option<String>,
    /// JSON object, URL-encoded.
    variables: Option<String>,
    operation_name: Option<String>,
}

#[derive(Serialize)]
struct ErrorExtensions {
    code: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    extensions: ErrorExtensions,
}

fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    let errors = vec![ErrorBody { message, extensions: ErrorExtensions { code } }];
    (
        status,
        Json(serde_json::json!({ "data": null, "errors": errors })),
    ).into_response()
}

fn bad_request(message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, "BAD_REQUEST", message.to_string())
}

/// Validation errors map to 400. Store failures are reported in-band with a 200.
fn gateway_error_response(err: GatewayError) -> Response {
    let status = if err.is_validation() {
        tracing::debug!("Rejected query: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    error_response(status, err.code(), err.to_string())
}

async fn run(state: &crate::AppState, request: GraphRequest, introspection: Introspection) -> Response {
    match state.gateway.execute(&request, introspection).await {
        Ok(data) => Json(serde_json::json!({ "data": data })).into_response(),
        Err(e) => gateway_error_response(e),
    }
}

fn json_rejection_response(rejection: JsonRejection) -> Response {
    tracing::debug!("Unreadable request body: {}", rejection);
    error_response(rejection.status(), "BAD_REQUEST", rejection.body_text())
}

// ── Interactive endpoint ──────────────────────────────────────────

pub async fn graphql_get(
    State(state): State<Arc<crate::AppState>>,
    Query(params): Query<GraphQueryParams>,
) -> Response {
    let Some(query) = params.query else {
        return bad_request("Must provide query string.");
    };

    let variables = match params.variables.as_deref().map(serde_json::from_str::<serde_json::Value>) {
        None | Some(Ok(serde_json::Value::Null)) => None,
        Some(Ok(serde_json::Value::Object(map))) => Some(map),
        Some(Ok(_)) | Some(Err(_)) => return bad_request("Variables are invalid JSON."),
    };

    let request = GraphRequest {
        query,
        variables,
        operation_name: params.operation_name,
    };
    run(&state, request, Introspection::Enabled).await
}

pub async fn graphql_post(
    State(state): State<Arc<crate::AppState>>,
    payload: Result<Json<GraphRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => run(&state, request, Introspection::Enabled).await,
        Err(rejection) => json_rejection_response(rejection),
    }
}

// ── API endpoint ──────────────────────────────────────────────────

pub async fn api_post(
    State(state): State<Arc<crate::AppState>>,
    payload: Result<Json<GraphRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => run(&state, request, Introspection::Disabled).await,
        Err(rejection) => json_rejection_response(rejection),
    }
}
