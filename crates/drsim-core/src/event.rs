//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Identifier of an event, unique within a simulation run.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Any serializable type can serve as a payload; handlers recover the concrete
/// type via downcasting (see the `cast!` macro).
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// An event scheduled for delivery at some simulation time.
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Delivery time.
    pub time: f64,
    /// Identifier of the component that scheduled the event.
    pub src: Id,
    /// Identifier of the destination component.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted ordering for use with BinaryHeap as a min-heap.
// Ties on time are broken by event id, i.e. FIFO by scheduling order,
// which keeps runs deterministic for a fixed seed.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
