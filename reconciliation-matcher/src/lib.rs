//! Reconciliation matcher - pairs bank statement credits with open receivables.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod services;
pub mod startup;
