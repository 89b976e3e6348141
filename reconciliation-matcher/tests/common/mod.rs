#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use reconciliation_matcher::config::MatchingConfig;
use reconciliation_matcher::models::{Direction, LineStatus, Receivable, StatementLine};
use reconciliation_matcher::services::{EventBus, InMemoryStore};
use reconciliation_matcher::startup::{build_router, AppState};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub events: EventBus,
    pub tenant_id: Uuid,
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(MatchingConfig::default())
    }

    pub fn with_config(matching: MatchingConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let events = EventBus::default();
        let state = AppState::new(store.clone(), events.clone(), &matching);

        Self {
            router: build_router(state),
            store,
            events,
            tenant_id: Uuid::new_v4(),
        }
    }

    pub fn add_line(&self, amount: Decimal, line_date: &str, description: &str) -> StatementLine {
        self.insert_line(amount, line_date, description, Direction::Credit)
    }

    /// Outgoing payment; never eligible to settle a receivable.
    pub fn add_debit_line(&self, amount: Decimal, line_date: &str, description: &str) -> StatementLine {
        self.insert_line(amount, line_date, description, Direction::Debit)
    }

    fn insert_line(
        &self,
        amount: Decimal,
        line_date: &str,
        description: &str,
        direction: Direction,
    ) -> StatementLine {
        let line = StatementLine {
            line_id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            bank_account_id: Uuid::nil(),
            line_date: date(line_date),
            description: description.to_string(),
            amount,
            direction: direction.as_str().to_string(),
            status: LineStatus::Pending.as_str().to_string(),
            receivable_id: None,
            external_id: None,
        };
        self.store.insert_statement_line(line.clone()).unwrap();
        line
    }

    pub fn add_receivable(&self, net_amount: Decimal, due_date: &str, customer: &str) -> Receivable {
        let receivable = Receivable {
            receivable_id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            customer_id: Uuid::new_v4(),
            customer_name: customer.to_string(),
            net_amount,
            due_date: date(due_date),
            payment_date: None,
        };
        self.store.insert_receivable(receivable.clone()).unwrap();
        receivable
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("X-Tenant-ID", self.tenant_id.to_string())
            .header("X-User-ID", "reviewer-1")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header("X-Tenant-ID", self.tenant_id.to_string())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}
