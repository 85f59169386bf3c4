//! Scheduling of the next pass for a resource.

use std::time::Duration;

use kube::runtime::controller::Action;

use crate::controller::state_machine::ClusterEvent;

/// When the resource should next be reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requeue {
    /// No pending work; wait for the next watch event
    Done,
    /// Re-enter dispatch now
    Immediate,
    /// Re-check after a fixed delay
    After(Duration),
}

impl Requeue {
    pub fn into_action(self) -> Action {
        match self {
            Requeue::Done => Action::await_change(),
            Requeue::Immediate => Action::requeue(Duration::ZERO),
            Requeue::After(delay) => Action::requeue(delay),
        }
    }
}

/// Picks between the three requeue styles.
///
/// Delays never grow: every wait on an upstream operation uses the same interval.
#[derive(Clone, Copy, Debug)]
pub struct RequeueScheduler {
    interval: Duration,
}

impl RequeueScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waiting on cluster creation, pool changes or endpoint provisioning.
    pub fn wait_upstream(&self) -> Requeue {
        Requeue::After(self.interval)
    }

    /// After a persisted phase change.
    ///
    /// Convergence leaves nothing to do. Every other change may unlock work
    /// for the next handler right away.
    pub fn after_transition(&self, event: ClusterEvent) -> Requeue {
        match event {
            ClusterEvent::Converged => Requeue::Done,
            _ => Requeue::Immediate,
        }
    }
}
