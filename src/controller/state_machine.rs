//! Finite state machine for the TKEClusterConfig lifecycle.
//!
//! ```text
//! NotCreated ──CreationRequested──▶ Creating ──ClusterRunning──▶ Active ◀──┐
//!     │                                                          │  ▲     │
//!     └──ImportRequested──▶ Importing ──ImportCompleted──────────┘  │     │
//!                                                                   │     │
//!          Active ──DriftDetected / UpstreamBusy / FailureRecorded──▶ Updating
//!                                                 Updating ──Converged──┘
//! ```
//!
//! There is no terminal phase. Deletion is handled outside the machine.

use std::fmt;

use crate::crd::ClusterConfigPhase;

/// Events that trigger phase transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterEvent {
    /// `spec.imported` is set on a new resource
    ImportRequested,
    /// The upstream create call returned a cluster ID
    CreationRequested,
    /// Remote settings were adopted into the spec
    ImportCompleted,
    /// The upstream cluster reports Running
    ClusterRunning,
    /// Mutation calls were issued this pass
    DriftDetected,
    /// The cluster or a node pool is mid-transition upstream
    UpstreamBusy,
    /// Nothing left to apply
    Converged,
    /// A pass failed
    FailureRecorded,
}

impl fmt::Display for ClusterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterEvent::ImportRequested => write!(f, "ImportRequested"),
            ClusterEvent::CreationRequested => write!(f, "CreationRequested"),
            ClusterEvent::ImportCompleted => write!(f, "ImportCompleted"),
            ClusterEvent::ClusterRunning => write!(f, "ClusterRunning"),
            ClusterEvent::DriftDetected => write!(f, "DriftDetected"),
            ClusterEvent::UpstreamBusy => write!(f, "UpstreamBusy"),
            ClusterEvent::Converged => write!(f, "Converged"),
            ClusterEvent::FailureRecorded => write!(f, "FailureRecorded"),
        }
    }
}

/// A state transition definition
#[derive(Debug)]
pub struct Transition {
    pub from: ClusterConfigPhase,
    pub to: ClusterConfigPhase,
    pub event: ClusterEvent,
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: ClusterConfigPhase,
        to: ClusterConfigPhase,
        event: ClusterEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

/// Result of attempting a state transition
#[derive(Debug, PartialEq)]
pub enum TransitionResult {
    /// Transition was successful
    Success {
        from: ClusterConfigPhase,
        to: ClusterConfigPhase,
        event: ClusterEvent,
        description: &'static str,
    },
    /// Transition was not valid for current state
    InvalidTransition {
        current: ClusterConfigPhase,
        event: ClusterEvent,
    },
}

/// Transition table for the TKEClusterConfig lifecycle
pub struct ClusterStateMachine {
    transitions: Vec<Transition>,
}

impl Default for ClusterStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterStateMachine {
    pub fn new() -> Self {
        use ClusterConfigPhase::{Active, Creating, Importing, NotCreated, Updating};

        Self {
            transitions: vec![
                // ========================================
                // NotCreated
                // ========================================
                Transition::new(
                    NotCreated,
                    Importing,
                    ClusterEvent::ImportRequested,
                    "Importing existing cluster",
                ),
                Transition::new(
                    NotCreated,
                    Creating,
                    ClusterEvent::CreationRequested,
                    "Cluster creation requested",
                ),
                // ========================================
                // Importing / Creating
                // ========================================
                Transition::new(
                    Importing,
                    Active,
                    ClusterEvent::ImportCompleted,
                    "Cluster imported",
                ),
                Transition::new(
                    Creating,
                    Active,
                    ClusterEvent::ClusterRunning,
                    "Cluster is running",
                ),
                // ========================================
                // Active / Updating
                // ========================================
                Transition::new(
                    Active,
                    Updating,
                    ClusterEvent::DriftDetected,
                    "Applying configuration drift",
                ),
                Transition::new(
                    Updating,
                    Updating,
                    ClusterEvent::DriftDetected,
                    "Applying configuration drift",
                ),
                Transition::new(
                    Active,
                    Updating,
                    ClusterEvent::UpstreamBusy,
                    "Waiting for upstream operation",
                ),
                Transition::new(
                    Updating,
                    Updating,
                    ClusterEvent::UpstreamBusy,
                    "Waiting for upstream operation",
                ),
                Transition::new(
                    Active,
                    Updating,
                    ClusterEvent::FailureRecorded,
                    "Update is failing",
                ),
                Transition::new(
                    Updating,
                    Updating,
                    ClusterEvent::FailureRecorded,
                    "Update is failing",
                ),
                Transition::new(
                    Updating,
                    Active,
                    ClusterEvent::Converged,
                    "Cluster finished updating",
                ),
                Transition::new(Active, Active, ClusterEvent::Converged, "Cluster is active"),
            ],
        }
    }

    /// Attempt a transition from `current` on `event`
    pub fn transition(&self, current: ClusterConfigPhase, event: ClusterEvent) -> TransitionResult {
        match self
            .transitions
            .iter()
            .find(|t| t.from == current && t.event == event)
        {
            Some(t) => TransitionResult::Success {
                from: t.from,
                to: t.to,
                event,
                description: t.description,
            },
            None => TransitionResult::InvalidTransition { current, event },
        }
    }

    pub fn can_transition(&self, from: ClusterConfigPhase, event: ClusterEvent) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == from && t.event == event)
    }

    /// Events accepted in `state`
    pub fn valid_events(&self, state: ClusterConfigPhase) -> Vec<ClusterEvent> {
        self.transitions
            .iter()
            .filter(|t| t.from == state)
            .map(|t| t.event)
            .collect()
    }
}

// ============================================================================
// Phase dispatch
// ============================================================================

/// The handler responsible for a pass in a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseHandler {
    /// Start creation, or hand over to import
    Create,
    /// Adopt an existing upstream cluster
    Import,
    /// Poll until the new cluster is running
    AwaitCreation,
    /// Diff and apply drift
    CheckAndUpdate,
}

/// Handler lookup, exhaustive over every phase.
pub const fn handler_for(phase: ClusterConfigPhase) -> PhaseHandler {
    match phase {
        ClusterConfigPhase::NotCreated => PhaseHandler::Create,
        ClusterConfigPhase::Importing => PhaseHandler::Import,
        ClusterConfigPhase::Creating => PhaseHandler::AwaitCreation,
        ClusterConfigPhase::Active | ClusterConfigPhase::Updating => PhaseHandler::CheckAndUpdate,
    }
}
