//! Controller module for tke-operator.
//!
//! The reconciliation core (state machine, drift engine, applier, requeue
//! scheduling, failure recording and removal) plus the glue that connects it
//! to the Kubernetes controller runtime.

// Core
pub mod applier;
pub mod drift;
pub mod failure_recorder;
pub mod lifecycle;
pub mod normalize;
pub mod removal;
pub mod requeue;
pub mod state_machine;

// Seams and helpers
pub mod ca_secret;
pub mod common;
pub mod credentials;
pub mod error;
pub mod store;

// Controller runtime glue
pub mod cluster_reconciler;
pub mod context;
