//! In-memory store with the same semantics as the PostgreSQL store,
//! including the data-driven workflow transition check.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    ApprovalCandidate, ApprovalRequest, ApprovalStatus, Direction, LineStatus, Receivable,
    SettlementOutcome, StatementLine, TransitionOutcome, APPROVAL_ENTITY_TYPE,
};
use crate::services::store::ReconciliationStore;
use sqlx::types::Json;

#[derive(Debug, Clone)]
struct WorkflowInstance {
    tenant_id: Uuid,
    entity_type: String,
    current_state: String,
}

/// One appended workflow history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub instance_id: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub action: String,
    pub actor: Option<String>,
}

#[derive(Default)]
struct State {
    lines: Vec<StatementLine>,
    receivables: Vec<Receivable>,
    approvals: HashMap<Uuid, ApprovalRequest>,
    instances: HashMap<Uuid, WorkflowInstance>,
    transitions: HashSet<(String, String, String, String)>,
    history: Vec<HistoryEntry>,
}

pub struct InMemoryStore {
    state: Mutex<State>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store seeded with the approval lifecycle transitions.
    pub fn new() -> Self {
        let store = Self {
            state: Mutex::new(State::default()),
        };
        if let Ok(mut state) = store.state.lock() {
            for (from, to, action) in [
                ("pending", "approved", "approve"),
                ("pending", "rejected", "reject"),
                ("approved", "executed", "execute"),
            ] {
                state.transitions.insert((
                    APPROVAL_ENTITY_TYPE.to_string(),
                    from.to_string(),
                    to.to_string(),
                    action.to_string(),
                ));
            }
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Store mutex poisoned: {}", e)))
    }

    pub fn insert_statement_line(&self, line: StatementLine) -> Result<(), AppError> {
        self.lock()?.lines.push(line);
        Ok(())
    }

    pub fn insert_receivable(&self, receivable: Receivable) -> Result<(), AppError> {
        self.lock()?.receivables.push(receivable);
        Ok(())
    }

    pub fn statement_line(&self, line_id: Uuid) -> Option<StatementLine> {
        let state = self.state.lock().ok()?;
        state.lines.iter().find(|l| l.line_id == line_id).cloned()
    }

    pub fn receivable(&self, receivable_id: Uuid) -> Option<Receivable> {
        let state = self.state.lock().ok()?;
        state
            .receivables
            .iter()
            .find(|r| r.receivable_id == receivable_id)
            .cloned()
    }

    /// Register a workflow instance of any entity type.
    pub fn register_workflow_instance(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        initial_state: &str,
    ) -> Result<Uuid, AppError> {
        let instance_id = Uuid::new_v4();
        self.lock()?.instances.insert(
            instance_id,
            WorkflowInstance {
                tenant_id,
                entity_type: entity_type.to_string(),
                current_state: initial_state.to_string(),
            },
        );
        Ok(instance_id)
    }

    /// Add an allowed transition row.
    pub fn allow_transition(
        &self,
        entity_type: &str,
        from_state: &str,
        to_state: &str,
        action: &str,
    ) -> Result<(), AppError> {
        self.lock()?.transitions.insert((
            entity_type.to_string(),
            from_state.to_string(),
            to_state.to_string(),
            action.to_string(),
        ));
        Ok(())
    }

    pub fn history(&self, instance_id: Uuid) -> Vec<HistoryEntry> {
        match self.state.lock() {
            Ok(state) => state
                .history
                .iter()
                .filter(|h| h.instance_id == instance_id)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn pending_credit_lines(
        &self,
        tenant_id: Uuid,
        bank_account_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<StatementLine>, AppError> {
        let state = self.lock()?;
        let mut lines: Vec<StatementLine> = state
            .lines
            .iter()
            .filter(|l| l.tenant_id == tenant_id && l.is_pending_credit())
            .filter(|l| bank_account_id.map_or(true, |id| l.bank_account_id == id))
            .cloned()
            .collect();

        lines.sort_by(|a, b| {
            b.line_date
                .cmp(&a.line_date)
                .then(a.line_id.cmp(&b.line_id))
        });
        lines.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(lines)
    }

    async fn open_receivables(&self, tenant_id: Uuid) -> Result<Vec<Receivable>, AppError> {
        let state = self.lock()?;
        let mut receivables: Vec<Receivable> = state
            .receivables
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.is_open())
            .cloned()
            .collect();

        receivables.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.receivable_id.cmp(&b.receivable_id))
        });

        Ok(receivables)
    }

    async fn statement_lines_by_ids(
        &self,
        tenant_id: Uuid,
        line_ids: &[Uuid],
    ) -> Result<Vec<StatementLine>, AppError> {
        let state = self.lock()?;
        Ok(state
            .lines
            .iter()
            .filter(|l| l.tenant_id == tenant_id && line_ids.contains(&l.line_id))
            .cloned()
            .collect())
    }

    async fn settle(
        &self,
        tenant_id: Uuid,
        line_id: Uuid,
        receivable_id: Uuid,
    ) -> Result<SettlementOutcome, AppError> {
        // Both checks happen under one lock, so the pair changes together.
        let mut state = self.lock()?;

        let Some(line_idx) = state.lines.iter().position(|l| {
            l.tenant_id == tenant_id
                && l.line_id == line_id
                && l.status == LineStatus::Pending.as_str()
        }) else {
            return Ok(SettlementOutcome::LineNotPending);
        };

        if state.lines[line_idx].direction != Direction::Credit.as_str() {
            return Ok(SettlementOutcome::LineNotCredit);
        }

        let Some(recv_idx) = state.receivables.iter().position(|r| {
            r.tenant_id == tenant_id && r.receivable_id == receivable_id && r.is_open()
        }) else {
            return Ok(SettlementOutcome::ReceivableNotOpen);
        };

        let payment_date = state.lines[line_idx].line_date;

        let line = &mut state.lines[line_idx];
        line.status = LineStatus::Reconciled.as_str().to_string();
        line.receivable_id = Some(receivable_id);

        state.receivables[recv_idx].payment_date = Some(payment_date);

        Ok(SettlementOutcome::Settled { payment_date })
    }

    async fn create_approval_request(
        &self,
        tenant_id: Uuid,
        candidates: &[ApprovalCandidate],
        total_value: Decimal,
        requested_by: Option<&str>,
    ) -> Result<ApprovalRequest, AppError> {
        let mut state = self.lock()?;
        let approval_id = Uuid::new_v4();
        let initial_state = ApprovalStatus::Pending.as_str();

        state.instances.insert(
            approval_id,
            WorkflowInstance {
                tenant_id,
                entity_type: APPROVAL_ENTITY_TYPE.to_string(),
                current_state: initial_state.to_string(),
            },
        );
        state.history.push(HistoryEntry {
            instance_id: approval_id,
            from_state: None,
            to_state: initial_state.to_string(),
            action: "create".to_string(),
            actor: requested_by.map(|s| s.to_string()),
        });

        let approval = ApprovalRequest {
            approval_id,
            tenant_id,
            status: initial_state.to_string(),
            candidates: Json(candidates.to_vec()),
            total_value,
            requested_by: requested_by.map(|s| s.to_string()),
            created_utc: Utc::now(),
        };
        state.approvals.insert(approval_id, approval.clone());

        Ok(approval)
    }

    async fn get_approval_request(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let state = self.lock()?;
        let Some(approval) = state
            .approvals
            .get(&approval_id)
            .filter(|a| a.tenant_id == tenant_id)
        else {
            return Ok(None);
        };

        let mut approval = approval.clone();
        if let Some(instance) = state.instances.get(&approval_id) {
            approval.status = instance.current_state.clone();
        }
        Ok(Some(approval))
    }

    async fn transition_workflow(
        &self,
        tenant_id: Uuid,
        instance_id: Uuid,
        target_state: &str,
        action: &str,
        actor: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        let mut state = self.lock()?;

        let Some(instance) = state
            .instances
            .get(&instance_id)
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
        else {
            return Ok(TransitionOutcome::failed(None, "workflow instance not found"));
        };

        let key = (
            instance.entity_type.clone(),
            instance.current_state.clone(),
            target_state.to_string(),
            action.to_string(),
        );
        if !state.transitions.contains(&key) {
            return Ok(TransitionOutcome::failed(
                Some(&instance.current_state),
                format!(
                    "transition {} -> {} via {} is not allowed",
                    instance.current_state, target_state, action
                ),
            ));
        }

        if let Some(current) = state.instances.get_mut(&instance_id) {
            current.current_state = target_state.to_string();
        }
        state.history.push(HistoryEntry {
            instance_id,
            from_state: Some(instance.current_state.clone()),
            to_state: target_state.to_string(),
            action: action.to_string(),
            actor: actor.map(|s| s.to_string()),
        });

        Ok(TransitionOutcome::succeeded(
            &instance.current_state,
            target_state,
        ))
    }
}
