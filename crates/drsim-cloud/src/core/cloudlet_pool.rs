//! Shared cloudlet registry.

use crate::core::cloudlet::Cloudlet;

/// Central store of all cloudlets of a simulation run.
///
/// The pool is shared between the broker, both datacenters and the failover
/// path; the cloudlet-to-VM assignments kept inside the cloudlets are the
/// single source of truth that rerouting rewrites on the broker's behalf.
pub struct CloudletPool {
    cloudlets: Vec<Cloudlet>,
}

impl CloudletPool {
    pub fn new() -> Self {
        Self { cloudlets: Vec::new() }
    }

    pub fn add(&mut self, cloudlet: Cloudlet) {
        debug_assert_eq!(cloudlet.id() as usize, self.cloudlets.len());
        self.cloudlets.push(cloudlet);
    }

    pub fn count(&self) -> usize {
        self.cloudlets.len()
    }

    pub fn get(&self, id: u32) -> &Cloudlet {
        &self.cloudlets[id as usize]
    }

    pub fn get_mut(&mut self, id: u32) -> &mut Cloudlet {
        &mut self.cloudlets[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cloudlet> {
        self.cloudlets.iter()
    }

    /// Ids of cloudlets that reached a terminal status, ordered by id.
    pub fn terminal_ids(&self) -> Vec<u32> {
        self.cloudlets
            .iter()
            .filter(|c| c.status().is_terminal())
            .map(|c| c.id())
            .collect()
    }

    /// Marks all cloudlets still pending at the end of the run as failed.
    ///
    /// Returns the number of newly failed cloudlets.
    pub fn finalize(&mut self, now: f64) -> usize {
        let mut failed = 0;
        for cloudlet in &mut self.cloudlets {
            if !cloudlet.status().is_terminal() {
                cloudlet.fail(now);
                failed += 1;
            }
        }
        failed
    }
}

impl Default for CloudletPool {
    fn default() -> Self {
        Self::new()
    }
}
