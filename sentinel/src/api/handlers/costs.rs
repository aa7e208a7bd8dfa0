//! HTTP handlers for the cost report.

use axum::{
    Json,
    extract::State,
    http::{
        Method, StatusCode, Uri,
        header::{ALLOW, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::AppState;
use crate::api::{access_control_headers, cors_headers};
use crate::errors::{ErrorBody, Result};

#[utoipa::path(
    get,
    path = "/costs",
    tag = "costs",
    summary = "Get cost report",
    description = "Runs the cost query on Athena, waits for it to finish and returns every line item with the rounded total.
Rows whose cost is not a number are left out of both the list and the total.",
    responses(
        (status = 200, description = "Cost report", body = crate::report::CostReport),
        (status = 500, description = "The query could not be submitted, failed, or its results could not be read", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_costs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let report = state.runner.run().await?;
    Ok((StatusCode::OK, cors_headers(), Json(report)))
}

#[utoipa::path(
    get,
    path = "/costs.csv",
    tag = "costs",
    summary = "Export cost report as CSV",
    description = "Same report as `GET /costs`, rendered as a CSV attachment with one line per item.",
    responses(
        (status = 200, description = "CSV export", body = String, content_type = "text/csv"),
        (status = 500, description = "The query could not be submitted, failed, or its results could not be read", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let report = state.runner.run().await?;
    let disposition = format!("attachment; filename=\"aws_sentinel_report_{}.csv\"", Utc::now().format("%Y-%m-%d"));

    Ok((
        StatusCode::OK,
        access_control_headers(),
        [(CONTENT_TYPE, "text/csv".to_string()), (CONTENT_DISPOSITION, disposition)],
        report.to_csv(),
    ))
}

/// CORS preflight. Answers without touching the query service.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

/// Fallback of the server router.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    let body = ErrorBody {
        error: format!("No route for {}", uri.path()),
    };
    (StatusCode::NOT_FOUND, cors_headers(), Json(body))
}

/// Fallback of the function router: any path is a report request.
///
/// API Gateway REST stages stay in the path (`/prod/costs`), so the path is not matched
/// beyond picking the CSV export for a trailing `.csv`.
#[tracing::instrument(skip(state))]
pub async fn any_path(state: State<AppState>, method: Method, uri: Uri) -> Response {
    if method == Method::OPTIONS {
        preflight().await.into_response()
    } else if method != Method::GET {
        (StatusCode::METHOD_NOT_ALLOWED, cors_headers(), [(ALLOW, "OPTIONS,GET")]).into_response()
    } else if uri.path().ends_with(".csv") {
        export_csv(state).await.into_response()
    } else {
        get_costs(state).await.into_response()
    }
}
