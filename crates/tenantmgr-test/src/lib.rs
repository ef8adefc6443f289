//! Integration test infrastructure for the tenant convergence controller
//!
//! Provides:
//! - An in-memory spec store whose tenants tests edit between cycles
//! - Tenant and topology fixtures
//! - A test environment wiring the engine to an in-memory fabric
//! - Journal verification helpers for ordering and idempotence checks

mod env;
pub mod fixtures;
mod store;
mod verification;

pub use env::TenantTestEnv;
pub use fixtures::*;
pub use store::InMemorySpecStore;
pub use verification::*;
