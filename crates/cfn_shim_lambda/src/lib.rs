//! AWS-oriented adapters and handlers for custom resource provisioning.
//!
//! This crate owns runtime integration details (Lambda entry points,
//! provider API adapters, and callback delivery) and exposes a single
//! runtime module boundary for the lifecycle contract, property, and
//! compensation primitives.

pub mod adapters;
pub mod handlers;
pub mod logging;
pub mod runtime;
