//! Module boundary for domain primitives consumed by handlers and binaries.

pub use cfn_shim_core::contract;
pub use cfn_shim_core::properties;
pub use cfn_shim_core::retry;
pub use cfn_shim_core::saga;
