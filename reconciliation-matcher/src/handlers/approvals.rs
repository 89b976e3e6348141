//! Approval request handlers.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use service_core::error::AppError;
use service_core::middleware::TenantContext;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    ApprovalResponse, DecisionRequest, ExecutionResponse, SubmitApprovalRequest,
    SubmitApprovalResponse,
};
use crate::services::MatchSubmission;
use crate::startup::AppState;

/// Submit reviewed matches. High-confidence entries settle immediately;
/// the rest become one approval request.
///
/// POST /reconciliation/approvals
pub async fn submit_for_approval(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<SubmitApprovalRequest>,
) -> Result<(StatusCode, Json<SubmitApprovalResponse>), AppError> {
    req.validate()?;

    let submissions: Vec<MatchSubmission> = req.matches.iter().map(MatchSubmission::from).collect();
    let report = state
        .reconciler
        .submit_for_approval(tenant.tenant_id, tenant.actor(), &submissions)
        .await?;

    let status = if report.approval_id.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(SubmitApprovalResponse::from(report))))
}

/// GET /reconciliation/approvals/:approval_id
pub async fn get_approval(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(approval_id): Path<Uuid>,
) -> Result<Json<ApprovalResponse>, AppError> {
    let approval = state
        .reconciler
        .get_approval(tenant.tenant_id, approval_id)
        .await?;

    Ok(Json(ApprovalResponse::from(approval)))
}

/// POST /reconciliation/approvals/:approval_id/decision
pub async fn decide_approval(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(approval_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApprovalResponse>, AppError> {
    let approval = state
        .reconciler
        .decide_approval(tenant.tenant_id, approval_id, req.decision, tenant.actor())
        .await?;

    Ok(Json(ApprovalResponse::from(approval)))
}

/// Execute an approved request.
///
/// POST /reconciliation/approvals/:approval_id/execute
pub async fn execute_approval(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(approval_id): Path<Uuid>,
) -> Result<Json<ExecutionResponse>, AppError> {
    let report = state
        .reconciler
        .execute_approval(tenant.tenant_id, approval_id, tenant.actor())
        .await?;

    Ok(Json(ExecutionResponse::from(report)))
}
