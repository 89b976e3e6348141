//! Tenant context extraction for multi-tenant services.
//!
//! The upstream gateway authenticates the caller and forwards the tenant it
//! resolved in `X-Tenant-ID` (and the acting user in `X-User-ID`). Every
//! business route takes a [`TenantContext`] so no query can run unscoped.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";
pub const USER_ID_HEADER: &str = "X-User-ID";

/// Tenant context extracted from request headers.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    /// Acting user, recorded as the actor on approvals and workflow history.
    pub user_id: Option<String>,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid, user_id: Option<String>) -> Self {
        Self { tenant_id, user_id }
    }

    pub fn actor(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_tenant = parts
            .headers
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing X-Tenant-ID header"))
            })?;

        let tenant_id = Uuid::parse_str(raw_tenant)
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid X-Tenant-ID header")))?;

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(TenantContext::new(tenant_id, user_id))
    }
}
