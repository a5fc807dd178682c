//! Cloudlet (task) representation and lifecycle.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use drsim_core::Id;

/// Status of a cloudlet. Exactly one status is held at a time;
/// `Success` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum CloudletStatus {
    Created,
    Queued,
    Executing,
    PausedForReroute,
    Success,
    Failed,
}

impl CloudletStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CloudletStatus::Success | CloudletStatus::Failed)
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "Created"),
            CloudletStatus::Queued => write!(f, "Queued"),
            CloudletStatus::Executing => write!(f, "Executing"),
            CloudletStatus::PausedForReroute => write!(f, "PausedForReroute"),
            CloudletStatus::Success => write!(f, "Success"),
            CloudletStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// A unit of computational work with fixed instruction length and resource
/// requirements.
///
/// The remaining length decreases only while the cloudlet is executing and is
/// frozen while it is queued or paused for rerouting. The recorded start time
/// refers to the datacenter the cloudlet last executed in: admission after a
/// reroute resets it, which is what the failover-impact metric keys on.
#[derive(Clone, Debug)]
pub struct Cloudlet {
    id: u32,
    owner: Id,
    length: f64,
    remaining: f64,
    consumed: f64,
    file_size: u64,
    output_size: u64,
    cores: u32,
    status: CloudletStatus,
    vm_id: Option<u32>,
    datacenter_id: Option<Id>,
    submission_time: f64,
    start_time: f64,
    finish_time: f64,
    wait_time: f64,
    exec_time: f64,
    // Start of the current waiting interval (queued or paused), -1 when not waiting.
    wait_since: f64,
}

impl Cloudlet {
    pub fn new(id: u32, owner: Id, length: f64, file_size: u64, output_size: u64, cores: u32) -> Self {
        Self {
            id,
            owner,
            length,
            remaining: length,
            consumed: 0.,
            file_size,
            output_size,
            cores,
            status: CloudletStatus::Created,
            vm_id: None,
            datacenter_id: None,
            submission_time: -1.,
            start_time: -1.,
            finish_time: -1.,
            wait_time: 0.,
            exec_time: 0.,
            wait_since: -1.,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    /// Original instruction length.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Work left to execute.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Work executed so far, across all execution slices.
    pub fn consumed(&self) -> f64 {
        self.consumed
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn output_size(&self) -> u64 {
        self.output_size
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn datacenter_id(&self) -> Option<Id> {
        self.datacenter_id
    }

    pub fn submission_time(&self) -> f64 {
        self.submission_time
    }

    /// Time execution started in the current datacenter, -1 if never started.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Finish time, -1 unless the cloudlet completed successfully.
    pub fn finish_time(&self) -> f64 {
        self.finish_time
    }

    /// Total time spent waiting (queued and paused), including pause duration
    /// accumulated during a reroute.
    pub fn wait_time(&self) -> f64 {
        self.wait_time
    }

    /// Accumulated busy time across all execution slices.
    pub fn exec_time(&self) -> f64 {
        self.exec_time
    }

    pub(crate) fn submit(&mut self, now: f64, vm_id: u32, datacenter_id: Id) {
        debug_assert_eq!(self.status, CloudletStatus::Created);
        self.status = CloudletStatus::Queued;
        self.submission_time = now;
        self.wait_since = now;
        self.vm_id = Some(vm_id);
        self.datacenter_id = Some(datacenter_id);
    }

    pub(crate) fn start_executing(&mut self, now: f64) {
        debug_assert!(matches!(
            self.status,
            CloudletStatus::Queued | CloudletStatus::PausedForReroute
        ));
        if self.wait_since >= 0. {
            self.wait_time += now - self.wait_since;
            self.wait_since = -1.;
        }
        self.start_time = now;
        self.status = CloudletStatus::Executing;
    }

    /// Applies `elapsed` time units of progress at the given rate (work conserving).
    pub(crate) fn apply_progress(&mut self, elapsed: f64, rate: f64) {
        debug_assert_eq!(self.status, CloudletStatus::Executing);
        let work = (elapsed * rate).min(self.remaining);
        self.remaining -= work;
        self.consumed += work;
        self.exec_time += elapsed;
    }

    pub(crate) fn complete(&mut self, now: f64) {
        debug_assert_eq!(self.status, CloudletStatus::Executing);
        // Absorb floating-point dust left by the last progress update.
        self.consumed += self.remaining;
        self.remaining = 0.;
        self.finish_time = now;
        self.status = CloudletStatus::Success;
    }

    pub(crate) fn pause_for_reroute(&mut self, now: f64) {
        debug_assert!(matches!(self.status, CloudletStatus::Queued | CloudletStatus::Executing));
        if self.wait_since < 0. {
            self.wait_since = now;
        }
        self.status = CloudletStatus::PausedForReroute;
    }

    pub(crate) fn reassign(&mut self, vm_id: u32, datacenter_id: Id) {
        debug_assert_eq!(self.status, CloudletStatus::PausedForReroute);
        self.vm_id = Some(vm_id);
        self.datacenter_id = Some(datacenter_id);
    }

    pub(crate) fn fail(&mut self, now: f64) {
        debug_assert!(!self.status.is_terminal());
        if self.wait_since >= 0. {
            self.wait_time += now - self.wait_since;
            self.wait_since = -1.;
        }
        self.status = CloudletStatus::Failed;
    }
}
