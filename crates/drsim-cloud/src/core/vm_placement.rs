//! VM placement algorithms.

use crate::core::common::AllocationVerdict;
use crate::core::host::Host;
use crate::core::vm::VmSpec;

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm is defined as a function of a VM spec and the datacenter's
/// ordered host list, which returns the index of the host selected for
/// placement or `None` if no host fits.
pub trait VmPlacementAlgorithm {
    fn select_host(&self, spec: &VmSpec, hosts: &[Host]) -> Option<usize>;
}

pub fn placement_algorithm_resolver(algorithm_name: &str) -> Box<dyn VmPlacementAlgorithm> {
    match algorithm_name {
        "FirstFit" => Box::new(FirstFit::new()),
        "BestFit" => Box::new(BestFit::new()),
        _ => panic!("Can't resolve: {}", algorithm_name),
    }
}

/// Uses the first suitable host in list order.
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for FirstFit {
    fn default() -> Self {
        Self::new()
    }
}

impl VmPlacementAlgorithm for FirstFit {
    fn select_host(&self, spec: &VmSpec, hosts: &[Host]) -> Option<usize> {
        hosts
            .iter()
            .position(|host| host.can_allocate(spec) == AllocationVerdict::Success)
    }
}

/// Uses the suitable host with the least available cores.
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for BestFit {
    fn default() -> Self {
        Self::new()
    }
}

impl VmPlacementAlgorithm for BestFit {
    fn select_host(&self, spec: &VmSpec, hosts: &[Host]) -> Option<usize> {
        let mut result: Option<usize> = None;
        let mut min_available_cores = u32::MAX;
        for (i, host) in hosts.iter().enumerate() {
            if host.can_allocate(spec) == AllocationVerdict::Success && host.cores_available() < min_available_cores {
                min_available_cores = host.cores_available();
                result = Some(i);
            }
        }
        result
    }
}
