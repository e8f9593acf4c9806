//! Shared custom-resource domain primitives.
//!
//! This crate owns the orchestrator lifecycle contract, typed resource
//! property bags, retry scheduling, and compensation bookkeeping. It
//! intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod properties;
pub mod retry;
pub mod saga;
