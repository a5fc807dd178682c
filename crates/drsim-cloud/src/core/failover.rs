//! Disaster detection and failover orchestration.

use std::cell::RefCell;
use std::rc::Rc;

use drsim_core::cast;
use drsim_core::context::SimulationContext;
use drsim_core::event::Event;
use drsim_core::handler::EventHandler;
use drsim_core::{log_info, log_trace, log_warn};

use crate::core::broker::Broker;
use crate::core::datacenter::Datacenter;
use crate::core::events::failover::DisasterCheck;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailoverState {
    Armed,
    Triggered { failure_time: f64 },
}

/// Tracks whether the disaster has struck. The disaster is single-shot: once
/// triggered, all subsequent checks are no-ops.
pub struct FailoverManager {
    failure_probability: f64,
    state: FailoverState,
}

impl FailoverManager {
    pub fn new(failure_probability: f64) -> Self {
        Self {
            failure_probability,
            state: FailoverState::Armed,
        }
    }

    /// Performs one Bernoulli trial with the given uniform sample from [0, 1).
    /// Returns true and records the failure time iff the disaster strikes now.
    pub fn check(&mut self, now: f64, sample: f64) -> bool {
        match self.state {
            FailoverState::Triggered { .. } => false,
            FailoverState::Armed => {
                if sample < self.failure_probability {
                    self.state = FailoverState::Triggered { failure_time: now };
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn occurred(&self) -> bool {
        matches!(self.state, FailoverState::Triggered { .. })
    }

    pub fn failure_time(&self) -> Option<f64> {
        match self.state {
            FailoverState::Armed => None,
            FailoverState::Triggered { failure_time } => Some(failure_time),
        }
    }
}

/// Periodically samples for a disaster and, when it strikes, takes the primary
/// datacenter down and hands its pending cloudlets over to the backup.
pub struct DisasterMonitor {
    failover: Rc<RefCell<FailoverManager>>,
    primary: Rc<RefCell<Datacenter>>,
    backup: Rc<RefCell<Datacenter>>,
    broker: Rc<RefCell<Broker>>,
    check_interval: f64,
    ctx: SimulationContext,
}

impl DisasterMonitor {
    pub fn new(
        failover: Rc<RefCell<FailoverManager>>,
        primary: Rc<RefCell<Datacenter>>,
        backup: Rc<RefCell<Datacenter>>,
        broker: Rc<RefCell<Broker>>,
        check_interval: f64,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            failover,
            primary,
            backup,
            broker,
            check_interval,
            ctx,
        }
    }

    /// Schedules the first disaster check one interval from now.
    pub fn schedule_checks(&mut self) {
        self.ctx.emit_self(DisasterCheck {}, self.check_interval);
    }

    fn on_disaster_check(&mut self) {
        if self.failover.borrow().occurred() {
            return;
        }
        // The check loop must not keep the event queue alive after the batch
        // is done, otherwise the run would never terminate while armed.
        if !self.broker.borrow().has_outstanding_work() {
            log_trace!(self.ctx, "workload complete, stopping disaster checks");
            return;
        }
        let now = self.ctx.time();
        let sample = self.ctx.rand();
        if self.failover.borrow_mut().check(now, sample) {
            log_warn!(self.ctx, "disaster struck the primary datacenter");
            let paused = self.primary.borrow_mut().fail_and_pause_all();
            log_info!(
                self.ctx,
                "rerouting {} cloudlets to the backup datacenter",
                paused.len()
            );
            self.backup.borrow_mut().accept_rerouted(paused);
        } else {
            log_trace!(self.ctx, "disaster check passed");
            self.ctx.emit_self(DisasterCheck {}, self.check_interval);
        }
    }
}

impl EventHandler for DisasterMonitor {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            DisasterCheck {} => {
                self.on_disaster_check();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certain_failure_triggers_on_first_check() {
        let mut failover = FailoverManager::new(1.);
        assert!(failover.check(10., 0.999));
        assert!(failover.occurred());
        assert_eq!(failover.failure_time(), Some(10.));
    }

    #[test]
    fn zero_probability_never_triggers() {
        let mut failover = FailoverManager::new(0.);
        for i in 1..100 {
            assert!(!failover.check(i as f64 * 10., 0.));
        }
        assert!(!failover.occurred());
        assert_eq!(failover.failure_time(), None);
    }

    #[test]
    fn disaster_is_single_shot() {
        let mut failover = FailoverManager::new(1.);
        assert!(failover.check(10., 0.));
        assert!(!failover.check(20., 0.));
        assert_eq!(failover.failure_time(), Some(10.));
    }
}
