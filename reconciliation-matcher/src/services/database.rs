//! PostgreSQL store for reconciliation-matcher.

use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    ApprovalCandidate, ApprovalRequest, ApprovalStatus, Direction, LineStatus, Receivable,
    SettlementOutcome, StatementLine, TransitionOutcome, APPROVAL_ENTITY_TYPE,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::ReconciliationStore;

const STATEMENT_LINE_COLUMNS: &str = "line_id, tenant_id, bank_account_id, line_date, description, amount, direction, status, receivable_id, external_id";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "reconciliation-matcher"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl ReconciliationStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn pending_credit_lines(
        &self,
        tenant_id: Uuid,
        bank_account_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<StatementLine>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["pending_credit_lines"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {STATEMENT_LINE_COLUMNS}
            FROM statement_lines
            WHERE tenant_id = $1
              AND status = $2
              AND direction = $3
              AND ($4::uuid IS NULL OR bank_account_id = $4)
            ORDER BY line_date DESC, line_id
            LIMIT $5
            "#
        );

        let lines = sqlx::query_as::<_, StatementLine>(&sql)
            .bind(tenant_id)
            .bind(LineStatus::Pending.as_str())
            .bind(Direction::Credit.as_str())
            .bind(bank_account_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to load pending lines: {}", e))
            })?;

        timer.observe_duration();

        Ok(lines)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn open_receivables(&self, tenant_id: Uuid) -> Result<Vec<Receivable>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["open_receivables"])
            .start_timer();

        let receivables = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT r.receivable_id, r.tenant_id, r.customer_id, c.display_name AS customer_name,
                   r.net_amount, r.due_date, r.payment_date
            FROM receivables r
            JOIN customers c ON c.customer_id = r.customer_id AND c.tenant_id = r.tenant_id
            WHERE r.tenant_id = $1 AND r.payment_date IS NULL
            ORDER BY r.due_date, r.receivable_id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load open receivables: {}", e))
        })?;

        timer.observe_duration();

        Ok(receivables)
    }

    #[instrument(skip(self, line_ids), fields(tenant_id = %tenant_id, count = line_ids.len()))]
    async fn statement_lines_by_ids(
        &self,
        tenant_id: Uuid,
        line_ids: &[Uuid],
    ) -> Result<Vec<StatementLine>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["statement_lines_by_ids"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {STATEMENT_LINE_COLUMNS}
            FROM statement_lines
            WHERE tenant_id = $1 AND line_id = ANY($2)
            "#
        );

        let lines = sqlx::query_as::<_, StatementLine>(&sql)
            .bind(tenant_id)
            .bind(line_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to load statement lines: {}", e))
            })?;

        timer.observe_duration();

        Ok(lines)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, line_id = %line_id, receivable_id = %receivable_id))]
    async fn settle(
        &self,
        tenant_id: Uuid,
        line_id: Uuid,
        receivable_id: Uuid,
    ) -> Result<SettlementOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["settle"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Lock the pending line, then claim the receivable conditionally. A
        // concurrent settlement that got there first leaves zero rows and
        // this one is rolled back.
        let locked = sqlx::query_as::<_, (chrono::NaiveDate, String)>(
            r#"
            SELECT line_date, direction
            FROM statement_lines
            WHERE tenant_id = $1 AND line_id = $2 AND status = $3
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(line_id)
        .bind(LineStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to lock statement line: {}", e))
        })?;

        let Some((payment_date, direction)) = locked else {
            tx.rollback().await.ok();
            timer.observe_duration();
            warn!("Statement line is not pending");
            return Ok(SettlementOutcome::LineNotPending);
        };

        if direction != Direction::Credit.as_str() {
            tx.rollback().await.ok();
            timer.observe_duration();
            warn!(direction = %direction, "Statement line is not a credit");
            return Ok(SettlementOutcome::LineNotCredit);
        }

        let claimed = sqlx::query(
            r#"
            UPDATE receivables
            SET payment_date = $3, updated_utc = NOW()
            WHERE tenant_id = $1 AND receivable_id = $2 AND payment_date IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(receivable_id)
        .bind(payment_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to settle receivable: {}", e))
        })?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.ok();
            timer.observe_duration();
            warn!("Receivable is not open");
            return Ok(SettlementOutcome::ReceivableNotOpen);
        }

        sqlx::query(
            r#"
            UPDATE statement_lines
            SET status = $3, receivable_id = $4, updated_utc = NOW()
            WHERE tenant_id = $1 AND line_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(line_id)
        .bind(LineStatus::Reconciled.as_str())
        .bind(receivable_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to reconcile statement line: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit settlement: {}", e))
        })?;

        timer.observe_duration();
        info!(payment_date = %payment_date, "Settlement committed");

        Ok(SettlementOutcome::Settled { payment_date })
    }

    #[instrument(skip(self, candidates), fields(tenant_id = %tenant_id, candidates = candidates.len()))]
    async fn create_approval_request(
        &self,
        tenant_id: Uuid,
        candidates: &[ApprovalCandidate],
        total_value: Decimal,
        requested_by: Option<&str>,
    ) -> Result<ApprovalRequest, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_approval_request"])
            .start_timer();

        let approval_id = Uuid::new_v4();
        let initial_state = ApprovalStatus::Pending.as_str();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO workflow_instances (instance_id, tenant_id, entity_type, current_state)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(approval_id)
        .bind(tenant_id)
        .bind(APPROVAL_ENTITY_TYPE)
        .bind(initial_state)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to register workflow instance: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO workflow_history (history_id, instance_id, from_state, to_state, action, actor)
            VALUES ($1, $2, NULL, $3, 'create', $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(approval_id)
        .bind(initial_state)
        .bind(requested_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to write workflow history: {}", e))
        })?;

        let approval = sqlx::query_as::<_, ApprovalRequest>(
            r#"
            INSERT INTO reconciliation_approvals (approval_id, tenant_id, candidates, total_value, requested_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING approval_id, tenant_id, CAST($6 AS VARCHAR) AS status, candidates, total_value, requested_by, created_utc
            "#,
        )
        .bind(approval_id)
        .bind(tenant_id)
        .bind(Json(candidates))
        .bind(total_value)
        .bind(requested_by)
        .bind(initial_state)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create approval request: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit approval request: {}", e))
        })?;

        timer.observe_duration();
        info!(approval_id = %approval.approval_id, "Approval request created");

        Ok(approval)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, approval_id = %approval_id))]
    async fn get_approval_request(
        &self,
        tenant_id: Uuid,
        approval_id: Uuid,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_approval_request"])
            .start_timer();

        let approval = sqlx::query_as::<_, ApprovalRequest>(
            r#"
            SELECT a.approval_id, a.tenant_id, wi.current_state AS status, a.candidates,
                   a.total_value, a.requested_by, a.created_utc
            FROM reconciliation_approvals a
            JOIN workflow_instances wi ON wi.instance_id = a.approval_id
            WHERE a.tenant_id = $1 AND a.approval_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(approval_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get approval request: {}", e))
        })?;

        timer.observe_duration();

        Ok(approval)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, instance_id = %instance_id))]
    async fn transition_workflow(
        &self,
        tenant_id: Uuid,
        instance_id: Uuid,
        target_state: &str,
        action: &str,
        actor: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transition_workflow"])
            .start_timer();

        let Json(outcome) = sqlx::query_scalar::<_, Json<TransitionOutcome>>(
            "SELECT workflow_transition($1, $2, $3, $4, $5)",
        )
        .bind(tenant_id)
        .bind(instance_id)
        .bind(target_state)
        .bind(action)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Workflow transition failed: {}", e))
        })?;

        timer.observe_duration();

        if outcome.success {
            info!(
                from_state = outcome.from_state.as_deref().unwrap_or("-"),
                to_state = outcome.to_state.as_deref().unwrap_or("-"),
                action = action,
                "Workflow transitioned"
            );
        } else {
            warn!(reason = outcome.failure_reason(), action = action, "Workflow transition rejected");
        }

        Ok(outcome)
    }
}
