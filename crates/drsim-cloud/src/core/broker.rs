//! Broker: requests VMs and dispatches the cloudlet batch.

use std::cell::RefCell;
use std::rc::Rc;

use drsim_core::cast;
use drsim_core::context::SimulationContext;
use drsim_core::event::Event;
use drsim_core::handler::EventHandler;
use drsim_core::Id;
use drsim_core::{log_debug, log_error, log_info, log_warn};

use crate::core::cloudlet_pool::CloudletPool;
use crate::core::events::allocation::{VmAllocationFailed, VmAllocationRequest, VmAllocationSucceeded};
use crate::core::events::broker::Start;
use crate::core::events::cloudlet::{CloudletReturned, CloudletSubmitRequest};
use crate::core::vm::VmSpec;

/// Requests VM allocations in both datacenters on start, then binds the whole
/// cloudlet batch round-robin over the successfully placed VMs and collects
/// finished cloudlets.
pub struct Broker {
    pool: Rc<RefCell<CloudletPool>>,
    vm_requests: Vec<(VmSpec, Id)>,
    pending_allocations: usize,
    placed_vms: Vec<(u32, Id)>,
    returned: Vec<u32>,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(pool: Rc<RefCell<CloudletPool>>, vm_requests: Vec<(VmSpec, Id)>, ctx: SimulationContext) -> Self {
        Self {
            pool,
            vm_requests,
            pending_allocations: 0,
            placed_vms: Vec::new(),
            returned: Vec::new(),
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Ids of cloudlets returned to the broker so far, in completion order.
    pub fn returned(&self) -> &[u32] {
        &self.returned
    }

    /// Ids of successfully placed VMs with their datacenters.
    pub fn placed_vms(&self) -> &[(u32, Id)] {
        &self.placed_vms
    }

    /// Whether the broker still waits for allocations or cloudlet completions.
    ///
    /// A batch that cannot run at all (no VMs were placed) counts as no
    /// outstanding work, otherwise the run could never drain its event queue.
    pub fn has_outstanding_work(&self) -> bool {
        if self.pending_allocations > 0 {
            return true;
        }
        !self.placed_vms.is_empty() && self.returned.len() < self.pool.borrow().count()
    }

    fn on_start(&mut self) {
        let requests = std::mem::take(&mut self.vm_requests);
        self.pending_allocations = requests.len();
        log_info!(self.ctx, "requesting allocation of {} VMs", self.pending_allocations);
        if requests.is_empty() {
            self.submit_cloudlets();
            return;
        }
        for (spec, dc_id) in requests {
            self.ctx.emit_now(VmAllocationRequest { spec }, dc_id);
        }
    }

    fn on_allocation_succeeded(&mut self, vm_id: u32, host_id: u32, dc_id: Id) {
        log_debug!(
            self.ctx,
            "vm #{} placed on host #{} in {}",
            vm_id,
            host_id,
            self.ctx.lookup_name(dc_id)
        );
        self.placed_vms.push((vm_id, dc_id));
        self.pending_allocations -= 1;
        if self.pending_allocations == 0 {
            self.submit_cloudlets();
        }
    }

    fn on_allocation_failed(&mut self, vm_id: u32, dc_id: Id) {
        log_warn!(self.ctx, "allocation of vm #{} failed in {}", vm_id, self.ctx.lookup_name(dc_id));
        self.pending_allocations -= 1;
        if self.pending_allocations == 0 {
            self.submit_cloudlets();
        }
    }

    // Binds each cloudlet to a VM round-robin in VM id order and hands it to
    // the VM's datacenter.
    fn submit_cloudlets(&mut self) {
        let count = self.pool.borrow().count();
        if self.placed_vms.is_empty() {
            if count > 0 {
                log_error!(self.ctx, "no VMs were placed, {} cloudlets cannot run", count);
            }
            return;
        }
        self.placed_vms.sort();
        let now = self.ctx.time();
        log_info!(self.ctx, "submitting {} cloudlets to {} VMs", count, self.placed_vms.len());
        for i in 0..count {
            let cloudlet_id = i as u32;
            let (vm_id, dc_id) = self.placed_vms[i % self.placed_vms.len()];
            self.pool.borrow_mut().get_mut(cloudlet_id).submit(now, vm_id, dc_id);
            self.ctx.emit_now(CloudletSubmitRequest { cloudlet_id }, dc_id);
        }
    }

    fn on_cloudlet_returned(&mut self, cloudlet_id: u32) {
        log_debug!(self.ctx, "cloudlet #{} returned", cloudlet_id);
        self.returned.push(cloudlet_id);
        if self.returned.len() == self.pool.borrow().count() {
            log_info!(self.ctx, "all {} cloudlets finished", self.returned.len());
        }
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            Start {} => {
                self.on_start();
            }
            VmAllocationSucceeded { vm_id, host_id } => {
                self.on_allocation_succeeded(vm_id, host_id, src);
            }
            VmAllocationFailed { vm_id } => {
                self.on_allocation_failed(vm_id, src);
            }
            CloudletReturned { cloudlet_id } => {
                self.on_cloudlet_returned(cloudlet_id);
            }
        })
    }
}
