//! Persistence seam for the reconciler.

use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    ApprovalCandidate, ApprovalRequest, Receivable, SettlementOutcome, StatementLine,
    TransitionOutcome,
};

/// Storage operations needed by matching, settlement and approvals.
///
/// Every call is scoped by tenant. Implementations must make `settle`
/// atomic: either the line is reconciled and the receivable paid, or
/// neither changes.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// Pending credit lines, newest first, at most `limit`.
    async fn pending_credit_lines(
        &self,
        tenant_id: Uuid,
        bank_account_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<StatementLine>, AppError>;

    /// Receivables without a payment date, with customer display names.
    async fn open_receivables(&self, tenant_id: Uuid) -> Result<Vec<Receivable>, AppError>;

    async fn statement_lines_by_ids(
        &self,
        tenant_id: Uuid,
        line_ids: &[Uuid],
    ) -> Result<Vec<StatementLine>, AppError>;

    /// Link the line to the receivable and set the receivable's payment
    /// date to the line date, only if the line is still pending and the
    /// receivable still open.
    async fn settle(
        &self,
        tenant_id: Uuid,
        line_id: Uuid,
        receivable_id: Uuid,
    ) -> Result<SettlementOutcome, AppError>;

    /// Persist an approval request and register its workflow instance in
    /// the `pending` state.
    async fn create_approval_request(
        &self,
        tenant_id: Uuid,
        candidates: &[ApprovalCandidate],
        total_value: Decimal,
        requested_by: Option<&str>,
    ) -> Result<ApprovalRequest, AppError>;

    async fn get_approval_request(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
    ) -> Result<Option<ApprovalRequest>, AppError>;

    /// Validate and apply a named-state transition, appending history.
    /// Rejections come back as `success: false` with a reason.
    async fn transition_workflow(
        &self,
        tenant_id: Uuid,
        instance_id: Uuid,
        target_state: &str,
        action: &str,
        actor: Option<&str>,
    ) -> Result<TransitionOutcome, AppError>;
}
