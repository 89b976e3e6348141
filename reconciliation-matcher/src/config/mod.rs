//! Configuration module for reconciliation-matcher.

use crate::matching::{MatchPolicy, Thresholds, TieBreak};
use rust_decimal::Decimal;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub auto_approve_threshold: u8,
    pub review_threshold: u8,
    /// Upper bound on pending statement lines read per pass.
    pub pending_line_limit: i64,
    pub tie_break: TieBreak,
    /// Approval requests whose total is at or below this value are approved
    /// by rule and executed immediately. Zero disables the rule.
    pub auto_approve_max_total: Decimal,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            auto_approve_threshold: thresholds.auto_approve,
            review_threshold: thresholds.review,
            pending_line_limit: 100,
            tie_break: TieBreak::default(),
            auto_approve_max_total: Decimal::ZERO,
        }
    }
}

impl MatchingConfig {
    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            thresholds: Thresholds {
                auto_approve: self.auto_approve_threshold,
                review: self.review_threshold,
            },
            tie_break: self.tie_break,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.auto_approve_threshold > 100 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUTO_APPROVE_THRESHOLD must be at most 100"
            )));
        }
        if self.review_threshold > self.auto_approve_threshold {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "REVIEW_THRESHOLD ({}) must not exceed AUTO_APPROVE_THRESHOLD ({})",
                self.review_threshold,
                self.auto_approve_threshold
            )));
        }
        if self.pending_line_limit < 1 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PENDING_LINE_LIMIT must be positive"
            )));
        }
        if self.auto_approve_max_total.is_sign_negative() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUTO_APPROVE_MAX_TOTAL must not be negative"
            )));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} has an invalid value", key))),
        Err(_) => Ok(default),
    }
}

impl MatcherConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = MatchingConfig::default();

        let matching = MatchingConfig {
            auto_approve_threshold: parse_env(
                "AUTO_APPROVE_THRESHOLD",
                defaults.auto_approve_threshold,
            )?,
            review_threshold: parse_env("REVIEW_THRESHOLD", defaults.review_threshold)?,
            pending_line_limit: parse_env("PENDING_LINE_LIMIT", defaults.pending_line_limit)?,
            tie_break: parse_env("MATCH_TIE_BREAK", defaults.tie_break)?,
            auto_approve_max_total: parse_env(
                "AUTO_APPROVE_MAX_TOTAL",
                defaults.auto_approve_max_total,
            )?,
        };
        matching.validate()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "reconciliation-matcher".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2)?,
            },
            matching,
        })
    }
}
