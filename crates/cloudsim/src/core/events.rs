//! Standard simulation events.

// BROKER REQUESTS /////////////////////////////////////////////////////////////////////////////////

pub mod broker {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;
    use crate::core::vm::VmSpec;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub spec: VmSpec,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletPause {
        pub vm_id: u32,
        pub cloudlet_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletResume {
        pub vm_id: u32,
        pub cloudlet_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletCancel {
        pub vm_id: u32,
        pub cloudlet_id: u32,
    }

    /// Broker reminder to repeat a failed VM creation request.
    #[derive(Serialize, Clone)]
    pub struct VmCreateRetry {
        pub vm_id: u32,
    }
}

// DATACENTER RESPONSES ////////////////////////////////////////////////////////////////////////////

pub mod datacenter {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    /// Result of VM creation, `host_id` is `None` if no suitable host was found.
    #[derive(Serialize, Clone)]
    pub struct VmCreateAck {
        pub vm_id: u32,
        pub host_id: Option<u32>,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyed {
        pub vm_id: u32,
    }

    /// Cloudlet in a terminal status returned to its broker.
    #[derive(Serialize, Clone)]
    pub struct CloudletReturn {
        pub cloudlet: Cloudlet,
    }
}

// DATACENTER INTERNAL EVENTS //////////////////////////////////////////////////////////////////////

pub mod processing {
    use serde::Serialize;

    /// Expected completion of some cloudlet.
    #[derive(Serialize, Clone)]
    pub struct UpdateProcessing {}

    /// Periodic processing update and allocation optimization.
    #[derive(Serialize, Clone)]
    pub struct OptimizeAllocation {}

    #[derive(Serialize, Clone)]
    pub struct VmMigrationComplete {
        pub vm_id: u32,
        pub source: u32,
        pub target: u32,
    }
}
