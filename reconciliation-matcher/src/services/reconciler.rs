//! Reconciliation orchestration: matching passes, settlement and the
//! approval lifecycle on top of a [`ReconciliationStore`].

use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::matching::{plan_pass, Classification, MatchPolicy, PlannedMatch};
use crate::models::{
    approval_actions, ApprovalCandidate, ApprovalDecision, ApprovalRequest, ApprovalStatus,
    TransitionOutcome, AUTO_RULE_ACTOR,
};
use crate::services::events::{EventBus, ReconciliationEvent, SettlementOrigin};
use crate::services::metrics::{
    record_approval_operation, record_classification, record_error, record_settlement,
};
use crate::services::store::ReconciliationStore;

/// Result of one matching pass.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// Pairs that were settled during the pass.
    pub auto_settled: Vec<PlannedMatch>,
    pub requires_review: Vec<PlannedMatch>,
    pub unmatched: usize,
}

/// One pair submitted by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSubmission {
    pub statement_id: Uuid,
    pub transaction_id: Uuid,
    pub confidence: u8,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionReport {
    pub executed: usize,
    pub failed: usize,
    pub approval_id: Option<Uuid>,
    pub total_value: Decimal,
    pub auto_approved_by_rule: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ReconciliationStore>,
    events: EventBus,
    policy: MatchPolicy,
    pending_line_limit: i64,
    auto_approve_max_total: Decimal,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ReconciliationStore>, events: EventBus, config: &MatchingConfig) -> Self {
        Self {
            store,
            events,
            policy: config.policy(),
            pending_line_limit: config.pending_line_limit,
            auto_approve_max_total: config.auto_approve_max_total,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReconciliationStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Score pending credits against open receivables, settle the
    /// high-confidence pairs and return the rest for review.
    #[instrument(skip(self))]
    pub async fn run_matching(
        &self,
        tenant_id: Uuid,
        bank_account_id: Option<Uuid>,
    ) -> Result<MatchReport, AppError> {
        let lines = self
            .store
            .pending_credit_lines(tenant_id, bank_account_id, self.pending_line_limit)
            .await
            .map_err(|e| {
                record_error("database_error");
                e
            })?;

        let mut report = MatchReport::default();

        if lines.is_empty() {
            tracing::info!("No pending statement lines to match");
            self.publish_pass(tenant_id, &report);
            return Ok(report);
        }

        let receivables = self.store.open_receivables(tenant_id).await.map_err(|e| {
            record_error("database_error");
            e
        })?;

        tracing::info!(
            lines = lines.len(),
            receivables = receivables.len(),
            "Starting matching pass"
        );

        let plan = plan_pass(&lines, &receivables, &self.policy);
        report.unmatched = plan.unmatched.len();
        report.requires_review = plan.review;

        for planned in plan.auto_settle {
            let settled = self
                .settle_pair(
                    tenant_id,
                    planned.line.line_id,
                    planned.receivable.receivable_id,
                    SettlementOrigin::MatchPass,
                )
                .await;

            if settled {
                report.auto_settled.push(planned);
            } else {
                // Lost the pair to a concurrent writer.
                report.unmatched += 1;
            }
        }

        record_classification(
            Classification::AutoApprove.as_str(),
            report.auto_settled.len(),
        );
        record_classification(
            Classification::RequiresReview.as_str(),
            report.requires_review.len(),
        );
        record_classification(Classification::Unmatched.as_str(), report.unmatched);

        self.publish_pass(tenant_id, &report);

        Ok(report)
    }

    fn publish_pass(&self, tenant_id: Uuid, report: &MatchReport) {
        self.events.publish(ReconciliationEvent::MatchPassCompleted {
            tenant_id,
            auto_approved: report.auto_settled.len(),
            requires_review: report.requires_review.len(),
            unmatched: report.unmatched,
        });
    }

    /// Settle one pair, tallying the outcome instead of raising it.
    async fn settle_pair(
        &self,
        tenant_id: Uuid,
        statement_id: Uuid,
        receivable_id: Uuid,
        origin: SettlementOrigin,
    ) -> bool {
        match self.store.settle(tenant_id, statement_id, receivable_id).await {
            Ok(outcome) => {
                record_settlement(origin.as_str(), outcome.as_str());

                if outcome.is_settled() {
                    self.events.publish(ReconciliationEvent::Settled {
                        tenant_id,
                        statement_id,
                        receivable_id,
                        origin,
                    });
                    true
                } else {
                    self.events.publish(ReconciliationEvent::SettlementRejected {
                        tenant_id,
                        statement_id,
                        receivable_id,
                        reason: outcome.as_str(),
                    });
                    false
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    statement_id = %statement_id,
                    receivable_id = %receivable_id,
                    "Settlement failed"
                );
                record_settlement(origin.as_str(), "error");
                record_error("settlement_error");
                false
            }
        }
    }

    /// Settle high-confidence entries now and put the rest into one
    /// approval request.
    #[instrument(skip(self, submissions), fields(entries = submissions.len()))]
    pub async fn submit_for_approval(
        &self,
        tenant_id: Uuid,
        requested_by: Option<&str>,
        submissions: &[MatchSubmission],
    ) -> Result<SubmissionReport, AppError> {
        let mut report = SubmissionReport::default();
        let auto_threshold = self.policy.thresholds.auto_approve;

        let (direct, review): (Vec<MatchSubmission>, Vec<MatchSubmission>) = submissions
            .iter()
            .copied()
            .partition(|s| s.confidence >= auto_threshold);

        for entry in &direct {
            if self
                .settle_pair(
                    tenant_id,
                    entry.statement_id,
                    entry.transaction_id,
                    SettlementOrigin::Submission,
                )
                .await
            {
                report.executed += 1;
            } else {
                report.failed += 1;
            }
        }

        if review.is_empty() {
            return Ok(report);
        }

        let ids: Vec<Uuid> = review.iter().map(|s| s.statement_id).collect();
        let amounts: HashMap<Uuid, Decimal> = self
            .store
            .statement_lines_by_ids(tenant_id, &ids)
            .await
            .map_err(|e| {
                record_error("database_error");
                e
            })?
            .into_iter()
            .filter(|line| line.is_pending_credit())
            .map(|line| (line.line_id, line.amount))
            .collect();

        let mut candidates = Vec::with_capacity(review.len());
        for entry in &review {
            match amounts.get(&entry.statement_id) {
                Some(amount) => candidates.push(ApprovalCandidate {
                    statement_id: entry.statement_id,
                    transaction_id: entry.transaction_id,
                    confidence: entry.confidence,
                    amount: *amount,
                }),
                None => {
                    tracing::warn!(
                        statement_id = %entry.statement_id,
                        "Submitted statement line is not a pending credit"
                    );
                    report.failed += 1;
                }
            }
        }

        if candidates.is_empty() {
            return Ok(report);
        }

        let total_value: Decimal = candidates.iter().map(|c| c.amount).sum();
        let approval = self
            .store
            .create_approval_request(tenant_id, &candidates, total_value, requested_by)
            .await
            .map_err(|e| {
                record_approval_operation("create", "failed");
                record_error("database_error");
                e
            })?;
        record_approval_operation("create", "success");

        tracing::info!(
            approval_id = %approval.approval_id,
            candidates = candidates.len(),
            total_value = %total_value,
            "Approval request created"
        );
        self.events.publish(ReconciliationEvent::ApprovalRequested {
            tenant_id,
            approval_id: approval.approval_id,
            candidates: candidates.len(),
            total_value,
        });

        report.approval_id = Some(approval.approval_id);
        report.total_value = total_value;

        if self.auto_approve_max_total > Decimal::ZERO && total_value <= self.auto_approve_max_total {
            match self.approve_by_rule(tenant_id, approval.approval_id).await {
                Ok(execution) => {
                    report.executed += execution.succeeded;
                    report.failed += execution.failed;
                    report.auto_approved_by_rule = true;
                }
                Err(e) => {
                    // The request stays open for a reviewer.
                    tracing::warn!(
                        error = %e,
                        approval_id = %approval.approval_id,
                        "Low-value rule could not complete the approval"
                    );
                    record_error("auto_rule_error");
                }
            }
        }

        Ok(report)
    }

    async fn approve_by_rule(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
    ) -> Result<ExecutionReport, AppError> {
        self.decide_approval(
            tenant_id,
            approval_id,
            ApprovalDecision::Approve,
            Some(AUTO_RULE_ACTOR),
        )
        .await?;
        self.execute_approval(tenant_id, approval_id, Some(AUTO_RULE_ACTOR))
            .await
    }

    pub async fn get_approval(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
    ) -> Result<ApprovalRequest, AppError> {
        self.store
            .get_approval_request(tenant_id, approval_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Approval request {} not found", approval_id))
            })
    }

    /// Approve or reject a pending request through the workflow engine.
    #[instrument(skip(self))]
    pub async fn decide_approval(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
        decision: ApprovalDecision,
        actor: Option<&str>,
    ) -> Result<ApprovalRequest, AppError> {
        let mut approval = self.get_approval(tenant_id, approval_id).await?;
        let target = decision.target_status();

        let outcome = self
            .store
            .transition_workflow(
                tenant_id,
                approval_id,
                target.as_str(),
                decision.action(),
                actor,
            )
            .await?;

        if !outcome.success {
            record_approval_operation(decision.action(), "rejected");
            tracing::warn!(reason = outcome.failure_reason(), "Approval decision refused");
            return Err(AppError::Conflict(anyhow::anyhow!(
                "{}",
                outcome.failure_reason()
            )));
        }
        record_approval_operation(decision.action(), "success");

        approval.status = target.as_str().to_string();
        self.events.publish(ReconciliationEvent::ApprovalDecided {
            tenant_id,
            approval_id,
            status: approval.status.clone(),
            actor: actor.map(|a| a.to_string()),
        });

        Ok(approval)
    }

    /// Settle every pair of an approved request and mark it executed.
    ///
    /// The request is moved to `executed` before any settlement, so two
    /// concurrent executions cannot both run.
    #[instrument(skip(self))]
    pub async fn execute_approval(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
        actor: Option<&str>,
    ) -> Result<ExecutionReport, AppError> {
        let approval = self.get_approval(tenant_id, approval_id).await?;

        let outcome = self
            .store
            .transition_workflow(
                tenant_id,
                approval_id,
                ApprovalStatus::Executed.as_str(),
                approval_actions::EXECUTE,
                actor,
            )
            .await?;

        if !outcome.success {
            record_approval_operation(approval_actions::EXECUTE, "rejected");
            return Err(AppError::Conflict(anyhow::anyhow!(
                "{}",
                outcome.failure_reason()
            )));
        }

        let mut report = ExecutionReport::default();
        for candidate in approval.candidates.iter() {
            if self
                .settle_pair(
                    tenant_id,
                    candidate.statement_id,
                    candidate.transaction_id,
                    SettlementOrigin::Approval,
                )
                .await
            {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        record_approval_operation(approval_actions::EXECUTE, "success");

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Approval executed"
        );
        self.events.publish(ReconciliationEvent::ApprovalExecuted {
            tenant_id,
            approval_id,
            succeeded: report.succeeded,
            failed: report.failed,
        });

        Ok(report)
    }

    /// Generic workflow transition; refusals are returned, not raised.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        tenant_id: Uuid,
        instance_id: Uuid,
        target_state: &str,
        action: &str,
        actor: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        // Approval requests only move through decide/execute, which settle.
        if let Some(approval) = self.store.get_approval_request(tenant_id, instance_id).await? {
            tracing::warn!("Generic transition refused for approval request");
            return Ok(TransitionOutcome::failed(
                Some(&approval.status),
                "approval requests are driven through /reconciliation/approvals",
            ));
        }

        let outcome = self
            .store
            .transition_workflow(tenant_id, instance_id, target_state, action, actor)
            .await?;

        if !outcome.success {
            tracing::info!(reason = outcome.failure_reason(), "Workflow transition refused");
        }

        Ok(outcome)
    }
}
