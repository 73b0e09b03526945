//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::{clone_trait_object, DynClone};
use serde::{Serialize, Serializer};
use serde_type_name::type_name;

use crate::component::Id;

/// Event identifier, equals to the sequence number of event creation.
pub type EventId = u64;

/// Trait that should be implemented by event payloads.
///
/// It is implemented automatically for any type that is `Serialize + Clone + 'static`.
pub trait EventData: Downcast + DynClone + erased_serde::Serialize {}

impl_downcast!(EventData);

clone_trait_object!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + Clone + 'static> EventData for T {}

/// Representation of event.
#[derive(Clone)]
pub struct Event {
    /// Unique event identifier, also used to order events with equal time.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Event {
    /// Returns the name of payload type, e.g. `VmCreateRequest`.
    pub fn type_name(&self) -> &'static str {
        type_name(&self.data).unwrap_or("unknown")
    }
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted so that BinaryHeap pops the earliest event first, ties are broken by creation order.
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

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Event", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("time", &self.time)?;
        state.serialize_field("type", self.type_name())?;
        state.serialize_field("src", &self.src)?;
        state.serialize_field("dst", &self.dst)?;
        state.end()
    }
}

/// Synthetic event injected by the kernel at the configured termination time.
#[derive(Clone, Serialize)]
pub struct SimulationEnd {}
