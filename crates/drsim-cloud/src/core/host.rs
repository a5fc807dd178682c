//! Physical host resource bookkeeping.

use std::collections::BTreeMap;

use crate::core::common::AllocationVerdict;
use crate::core::vm::VmSpec;

/// A physical host with strict (no overcommit) capacity accounting over
/// cores, memory, bandwidth and storage.
///
/// Invariant: the resources reserved by resident VMs never exceed capacity.
#[derive(Clone)]
pub struct Host {
    cores_total: u32,
    cores_available: u32,
    mips_per_core: f64,
    memory_total: u64,
    memory_available: u64,
    bandwidth_total: u64,
    bandwidth_available: u64,
    storage_total: u64,
    storage_available: u64,
    allocations: BTreeMap<u32, VmSpec>,
}

impl Host {
    pub fn new(cores: u32, mips_per_core: f64, memory: u64, bandwidth: u64, storage: u64) -> Self {
        Self {
            cores_total: cores,
            cores_available: cores,
            mips_per_core,
            memory_total: memory,
            memory_available: memory,
            bandwidth_total: bandwidth,
            bandwidth_available: bandwidth,
            storage_total: storage,
            storage_available: storage,
            allocations: BTreeMap::new(),
        }
    }

    /// Checks whether the VM fits into the currently available capacity.
    pub fn can_allocate(&self, spec: &VmSpec) -> AllocationVerdict {
        if self.cores_available < spec.cores {
            return AllocationVerdict::NotEnoughCpu;
        }
        if self.memory_available < spec.memory {
            return AllocationVerdict::NotEnoughMemory;
        }
        if self.bandwidth_available < spec.bandwidth {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if self.storage_available < spec.disk_size {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    pub fn allocate(&mut self, spec: &VmSpec) {
        debug_assert_eq!(self.can_allocate(spec), AllocationVerdict::Success);
        self.cores_available -= spec.cores;
        self.memory_available -= spec.memory;
        self.bandwidth_available -= spec.bandwidth;
        self.storage_available -= spec.disk_size;
        self.allocations.insert(spec.id, spec.clone());
    }

    pub fn release(&mut self, vm_id: u32) {
        if let Some(spec) = self.allocations.remove(&vm_id) {
            self.cores_available += spec.cores;
            self.memory_available += spec.memory;
            self.bandwidth_available += spec.bandwidth;
            self.storage_available += spec.disk_size;
        }
    }

    pub fn cores_total(&self) -> u32 {
        self.cores_total
    }

    pub fn cores_available(&self) -> u32 {
        self.cores_available
    }

    pub fn mips_per_core(&self) -> f64 {
        self.mips_per_core
    }

    pub fn memory_total(&self) -> u64 {
        self.memory_total
    }

    pub fn memory_available(&self) -> u64 {
        self.memory_available
    }

    pub fn bandwidth_total(&self) -> u64 {
        self.bandwidth_total
    }

    pub fn bandwidth_available(&self) -> u64 {
        self.bandwidth_available
    }

    pub fn storage_total(&self) -> u64 {
        self.storage_total
    }

    pub fn storage_available(&self) -> u64 {
        self.storage_available
    }

    /// Ids of VMs resident on this host.
    pub fn vm_ids(&self) -> Vec<u32> {
        self.allocations.keys().cloned().collect()
    }

    /// Specs of VMs resident on this host.
    pub fn allocations(&self) -> impl Iterator<Item = &VmSpec> {
        self.allocations.values()
    }
}
