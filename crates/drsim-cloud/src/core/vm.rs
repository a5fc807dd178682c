//! Representations of virtual machines.

use serde::Serialize;

use drsim_core::Id;

/// Static resource requirements of a virtual machine.
#[derive(Clone, Debug, Serialize)]
pub struct VmSpec {
    pub id: u32,
    /// Identifier of the owning broker.
    pub owner: Id,
    pub cores: u32,
    /// Processing rate of a single core in instructions per unit of simulated time.
    pub mips_per_core: f64,
    pub memory: u64,
    pub bandwidth: u64,
    pub disk_size: u64,
}

impl VmSpec {
    /// Total processing rate of the VM, shared equally by its executing cloudlets.
    pub fn total_mips(&self) -> f64 {
        self.cores as f64 * self.mips_per_core
    }
}

/// A virtual machine resident on a host of some datacenter.
///
/// A VM is placed exactly once and is never migrated; failover moves cloudlets,
/// not VMs.
#[derive(Clone)]
pub struct VirtualMachine {
    spec: VmSpec,
    host_id: Option<usize>,
}

impl VirtualMachine {
    pub fn new(spec: VmSpec) -> Self {
        Self { spec, host_id: None }
    }

    pub fn id(&self) -> u32 {
        self.spec.id
    }

    pub fn spec(&self) -> &VmSpec {
        &self.spec
    }

    /// Index of the host this VM is placed on, unset until placement succeeds.
    pub fn host_id(&self) -> Option<usize> {
        self.host_id
    }

    pub fn total_mips(&self) -> f64 {
        self.spec.total_mips()
    }

    pub(crate) fn set_host(&mut self, host_id: usize) {
        debug_assert!(self.host_id.is_none(), "VM is placed exactly once");
        self.host_id = Some(host_id);
    }
}
