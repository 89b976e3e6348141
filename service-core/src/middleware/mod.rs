pub mod metrics;
pub mod tenant;
pub mod tracing;

pub use tenant::TenantContext;
