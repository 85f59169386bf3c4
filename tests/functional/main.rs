// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the TKEClusterConfig lifecycle.
//!
//! These tests drive full passes of the reconciler WITHOUT a live Kubernetes
//! cluster or Tencent Cloud account. The object store and the upstream service
//! are in-memory fakes that behave like the real ones, so multi-pass scenarios
//! play out end to end.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_create_lifecycle_reaches_active
//!
//! # Run with verbose output
//! cargo test --test functional -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! - **Lifecycle tests**: creation, import, waiting and failure recording
//!   across several passes
//! - **Drift tests**: which upstream calls a pass issues for a given difference
//!   between the declared and observed cluster
//! - **Removal tests**: guards and retries around deleting the upstream cluster
//!
//! ## Design Principles
//!
//! - **No K8s Required**: Tests run without any cluster infrastructure
//! - **Fast Execution**: No real sleeps, removal retries use a zero backoff
//! - **Real Logic**: Only the store and the cloud are faked, every decision is
//!   made by production code

#[path = "../common/fixtures.rs"]
mod fixtures;

mod fake_store;
mod harness;
mod removal_tests;

// Re-export for use in tests
pub use fake_cloud::*;
pub use fake_store::*;
pub use harness::*;
