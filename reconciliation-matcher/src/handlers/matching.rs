//! Matching pass handler.

use axum::extract::{Json, State};
use service_core::error::AppError;
use service_core::middleware::TenantContext;

use crate::dtos::{MatchRequest, MatchResponse};
use crate::startup::AppState;

/// Run the matcher over the tenant's pending credits.
///
/// POST /reconciliation/match
pub async fn run_match(
    State(state): State<AppState>,
    tenant: TenantContext,
    body: Option<Json<MatchRequest>>,
) -> Result<Json<MatchResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let report = state
        .reconciler
        .run_matching(tenant.tenant_id, req.bank_account_id)
        .await?;

    Ok(Json(MatchResponse::from(report)))
}
