/// Result of checking resource availability for a placement request.
#[derive(Debug, PartialEq)]
pub enum AllocationVerdict {
    NotEnoughCpu,
    NotEnoughMemory,
    NotEnoughBandwidth,
    NotEnoughStorage,
    Success,
}
