//! Standard simulation events.

// VM ALLOCATION EVENTS ////////////////////////////////////////////////////////////////////////////

pub mod allocation {
    use serde::Serialize;

    use crate::core::vm::VmSpec;

    #[derive(Serialize)]
    pub struct VmAllocationRequest {
        pub spec: VmSpec,
    }

    #[derive(Serialize)]
    pub struct VmAllocationSucceeded {
        pub vm_id: u32,
        pub host_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmAllocationFailed {
        pub vm_id: u32,
    }
}

// CLOUDLET LIFECYCLE EVENTS ///////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    #[derive(Serialize)]
    pub struct CloudletSubmitRequest {
        pub cloudlet_id: u32,
    }

    #[derive(Serialize)]
    pub struct CloudletCompleted {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize)]
    pub struct CloudletReturned {
        pub cloudlet_id: u32,
    }
}

// BROKER AND FAILOVER EVENTS //////////////////////////////////////////////////////////////////////

pub mod broker {
    use serde::Serialize;

    #[derive(Serialize)]
    pub struct Start {}
}

pub mod failover {
    use serde::Serialize;

    #[derive(Serialize)]
    pub struct DisasterCheck {}
}
