#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod component;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod log;
pub mod queue;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use error::SimulationError;
pub use event::{Event, EventData, EventId, SimulationEnd};
pub use handler::{EventCancellationPolicy, EventHandler};
pub use queue::{EventQueue, EPSILON, KERNEL_ID};
pub use simulation::Simulation;
