use axum::extract::{Json, Path, State};
use service_core::error::AppError;
use service_core::middleware::TenantContext;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::TransitionRequest;
use crate::models::TransitionOutcome;
use crate::startup::AppState;

/// POST /workflow/instances/:instance_id/transitions
pub async fn transition(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(instance_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<TransitionOutcome>, AppError> {
    req.validate()?;

    let outcome = state
        .reconciler
        .transition(
            tenant.tenant_id,
            instance_id,
            &req.target_state,
            &req.action,
            tenant.actor(),
        )
        .await?;

    Ok(Json(outcome))
}
