//! Datacenter entity: VM hosting and time-shared cloudlet execution.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use drsim_core::cast;
use drsim_core::context::SimulationContext;
use drsim_core::event::{Event, EventId};
use drsim_core::handler::EventHandler;
use drsim_core::Id;
use drsim_core::{log_debug, log_trace, log_warn};

use crate::core::cloudlet_pool::CloudletPool;
use crate::core::config::CharacteristicsConfig;
use crate::core::events::allocation::{VmAllocationFailed, VmAllocationRequest, VmAllocationSucceeded};
use crate::core::events::cloudlet::{CloudletCompleted, CloudletReturned, CloudletSubmitRequest};
use crate::core::host::Host;
use crate::core::vm::{VirtualMachine, VmSpec};
use crate::core::vm_placement::VmPlacementAlgorithm;

// Execution state of a single VM under the time-shared discipline.
struct VmExecState {
    executing: Vec<u32>,
    waiting: VecDeque<u32>,
    last_update: f64,
    completion_events: HashMap<u32, EventId>,
}

impl VmExecState {
    fn new() -> Self {
        Self {
            executing: Vec::new(),
            waiting: VecDeque::new(),
            last_update: 0.,
            completion_events: HashMap::new(),
        }
    }
}

/// A datacenter hosting VMs on its ordered host list and executing cloudlets
/// on them with equal time sharing of each VM's total rate.
pub struct Datacenter {
    hosts: Vec<Host>,
    vms: BTreeMap<u32, VirtualMachine>,
    exec: BTreeMap<u32, VmExecState>,
    reroute_queue: VecDeque<u32>,
    characteristics: CharacteristicsConfig,
    placement: Box<dyn VmPlacementAlgorithm>,
    pool: Rc<RefCell<CloudletPool>>,
    broker_id: Id,
    vm_admission_limit: u32,
    failed: bool,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(
        hosts: Vec<Host>,
        characteristics: CharacteristicsConfig,
        placement: Box<dyn VmPlacementAlgorithm>,
        pool: Rc<RefCell<CloudletPool>>,
        broker_id: Id,
        vm_admission_limit: u32,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            hosts,
            vms: BTreeMap::new(),
            exec: BTreeMap::new(),
            reroute_queue: VecDeque::new(),
            characteristics,
            placement,
            pool,
            broker_id,
            vm_admission_limit,
            failed: false,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn characteristics(&self) -> &CharacteristicsConfig {
        &self.characteristics
    }

    /// Ids of VMs resident in this datacenter.
    pub fn vm_ids(&self) -> Vec<u32> {
        self.vms.keys().cloned().collect()
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    /// Whether this datacenter went down due to a disaster.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Total number of currently executing cloudlets.
    pub fn executing_count(&self) -> usize {
        self.exec.values().map(|state| state.executing.len()).sum()
    }

    /// Number of rerouted cloudlets still waiting for admission capacity.
    pub fn reroute_queue_len(&self) -> usize {
        self.reroute_queue.len()
    }

    fn has_free_slot(&self, vm_id: u32) -> bool {
        self.exec[&vm_id].executing.len() < self.vm_admission_limit as usize
    }

    fn on_vm_allocation_request(&mut self, spec: VmSpec) {
        let vm_id = spec.id;
        if self.failed {
            log_warn!(self.ctx, "rejecting vm #{}: datacenter is down", vm_id);
            self.ctx.emit_now(VmAllocationFailed { vm_id }, self.broker_id);
            return;
        }
        match self.placement.select_host(&spec, &self.hosts) {
            Some(host_id) => {
                self.hosts[host_id].allocate(&spec);
                let mut vm = VirtualMachine::new(spec);
                vm.set_host(host_id);
                self.exec.insert(vm_id, VmExecState::new());
                self.vms.insert(vm_id, vm);
                log_debug!(self.ctx, "vm #{} allocated on host #{}", vm_id, host_id);
                self.ctx.emit_now(
                    VmAllocationSucceeded {
                        vm_id,
                        host_id: host_id as u32,
                    },
                    self.broker_id,
                );
            }
            None => {
                log_debug!(self.ctx, "not enough capacity for vm #{}", vm_id);
                self.ctx.emit_now(VmAllocationFailed { vm_id }, self.broker_id);
            }
        }
    }

    fn on_cloudlet_submit(&mut self, cloudlet_id: u32) {
        if self.failed {
            log_warn!(self.ctx, "ignoring cloudlet #{}: datacenter is down", cloudlet_id);
            return;
        }
        let vm_id = self
            .pool
            .borrow()
            .get(cloudlet_id)
            .vm_id()
            .expect("submitted cloudlet has no VM assigned");
        if self.has_free_slot(vm_id) {
            self.update_vm_progress(vm_id);
            self.pool.borrow_mut().get_mut(cloudlet_id).start_executing(self.ctx.time());
            self.exec.get_mut(&vm_id).unwrap().executing.push(cloudlet_id);
            self.reschedule_vm(vm_id);
            log_debug!(self.ctx, "cloudlet #{} started on vm #{}", cloudlet_id, vm_id);
        } else {
            self.exec.get_mut(&vm_id).unwrap().waiting.push_back(cloudlet_id);
            log_trace!(self.ctx, "cloudlet #{} queued on vm #{}", cloudlet_id, vm_id);
        }
    }

    // Settles execution progress of the VM at the rate in effect since the
    // last update, so that a subsequent rate change is work conserving.
    fn update_vm_progress(&mut self, vm_id: u32) {
        let now = self.ctx.time();
        let total_mips = self.vms[&vm_id].total_mips();
        let state = self.exec.get_mut(&vm_id).unwrap();
        let elapsed = now - state.last_update;
        state.last_update = now;
        if elapsed <= 0. || state.executing.is_empty() {
            return;
        }
        let rate = total_mips / state.executing.len() as f64;
        let mut pool = self.pool.borrow_mut();
        for &cloudlet_id in &state.executing {
            pool.get_mut(cloudlet_id).apply_progress(elapsed, rate);
        }
    }

    // Re-schedules the completion event of every executing cloudlet on the VM
    // at the current equal-share rate.
    fn reschedule_vm(&mut self, vm_id: u32) {
        let ids: Vec<u32> = self.exec[&vm_id].executing.clone();
        if ids.is_empty() {
            return;
        }
        let rate = self.vms[&vm_id].total_mips() / ids.len() as f64;
        for cloudlet_id in ids {
            if let Some(event_id) = self.exec.get_mut(&vm_id).unwrap().completion_events.remove(&cloudlet_id) {
                self.ctx.cancel_event(event_id);
            }
            let remaining = self.pool.borrow().get(cloudlet_id).remaining();
            let event_id = self.ctx.emit_self(CloudletCompleted { cloudlet_id, vm_id }, remaining / rate);
            self.exec
                .get_mut(&vm_id)
                .unwrap()
                .completion_events
                .insert(cloudlet_id, event_id);
        }
    }

    fn on_cloudlet_completed(&mut self, cloudlet_id: u32, vm_id: u32) {
        let now = self.ctx.time();
        self.update_vm_progress(vm_id);
        {
            let state = self.exec.get_mut(&vm_id).unwrap();
            state.completion_events.remove(&cloudlet_id);
            state.executing.retain(|&c| c != cloudlet_id);
        }
        self.pool.borrow_mut().get_mut(cloudlet_id).complete(now);
        log_debug!(self.ctx, "cloudlet #{} finished on vm #{}", cloudlet_id, vm_id);
        self.ctx.emit_now(CloudletReturned { cloudlet_id }, self.broker_id);

        // Freed slot: first the cloudlets queued on this VM, then rerouted ones.
        while self.has_free_slot(vm_id) {
            match self.exec.get_mut(&vm_id).unwrap().waiting.pop_front() {
                Some(next_id) => {
                    self.pool.borrow_mut().get_mut(next_id).start_executing(now);
                    self.exec.get_mut(&vm_id).unwrap().executing.push(next_id);
                    log_debug!(self.ctx, "cloudlet #{} started on vm #{}", next_id, vm_id);
                }
                None => break,
            }
        }
        let mut dirty = BTreeSet::new();
        dirty.insert(vm_id);
        self.try_admit_rerouted(&mut dirty);
        for vm in dirty {
            self.reschedule_vm(vm);
        }
    }

    // Admits rerouted cloudlets first-fit over resident VMs with free
    // admission slots; the rest keep waiting in the reroute queue.
    fn try_admit_rerouted(&mut self, dirty: &mut BTreeSet<u32>) {
        let limit = self.vm_admission_limit as usize;
        while let Some(&cloudlet_id) = self.reroute_queue.front() {
            let target = self
                .exec
                .iter()
                .find(|(_, state)| state.executing.len() < limit)
                .map(|(&vm_id, _)| vm_id);
            let vm_id = match target {
                Some(vm_id) => vm_id,
                None => break,
            };
            self.reroute_queue.pop_front();
            self.update_vm_progress(vm_id);
            let now = self.ctx.time();
            let dc_id = self.ctx.id();
            {
                let mut pool = self.pool.borrow_mut();
                let cloudlet = pool.get_mut(cloudlet_id);
                cloudlet.reassign(vm_id, dc_id);
                cloudlet.start_executing(now);
            }
            self.exec.get_mut(&vm_id).unwrap().executing.push(cloudlet_id);
            dirty.insert(vm_id);
            log_debug!(self.ctx, "rerouted cloudlet #{} onto vm #{}", cloudlet_id, vm_id);
        }
    }

    /// Takes this datacenter down: settles progress work-conservingly, cancels
    /// all pending completion events and pauses every queued or executing
    /// cloudlet for rerouting.
    ///
    /// Returns the ids of the paused cloudlets in VM order, executing first.
    pub fn fail_and_pause_all(&mut self) -> Vec<u32> {
        let now = self.ctx.time();
        self.failed = true;
        let mut paused = Vec::new();
        let vm_ids: Vec<u32> = self.exec.keys().cloned().collect();
        for vm_id in vm_ids {
            self.update_vm_progress(vm_id);
            let (executing, waiting, events) = {
                let state = self.exec.get_mut(&vm_id).unwrap();
                (
                    std::mem::take(&mut state.executing),
                    std::mem::take(&mut state.waiting),
                    std::mem::take(&mut state.completion_events),
                )
            };
            for (_, event_id) in events {
                self.ctx.cancel_event(event_id);
            }
            let mut pool = self.pool.borrow_mut();
            for cloudlet_id in executing.into_iter().chain(waiting) {
                pool.get_mut(cloudlet_id).pause_for_reroute(now);
                paused.push(cloudlet_id);
            }
        }
        log_warn!(self.ctx, "datacenter is down, paused {} cloudlets for rerouting", paused.len());
        paused
    }

    /// Accepts cloudlets rerouted from a failed datacenter; those that do not
    /// fit now are retried on every subsequent completion.
    pub fn accept_rerouted(&mut self, cloudlet_ids: Vec<u32>) {
        self.reroute_queue.extend(cloudlet_ids);
        let mut dirty = BTreeSet::new();
        self.try_admit_rerouted(&mut dirty);
        for vm_id in dirty {
            self.reschedule_vm(vm_id);
        }
        if !self.reroute_queue.is_empty() {
            log_warn!(
                self.ctx,
                "{} rerouted cloudlets are waiting for backup capacity",
                self.reroute_queue.len()
            );
        }
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmAllocationRequest { spec } => {
                self.on_vm_allocation_request(spec);
            }
            CloudletSubmitRequest { cloudlet_id } => {
                self.on_cloudlet_submit(cloudlet_id);
            }
            CloudletCompleted { cloudlet_id, vm_id } => {
                self.on_cloudlet_completed(cloudlet_id, vm_id);
            }
        })
    }
}
