//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
///
/// A registered component receives [`on_start`](Self::on_start) once before the first event is delivered,
/// then every event addressed to it via [`on`](Self::on), and finally [`on_shutdown`](Self::on_shutdown)
/// when the simulation ends.
pub trait EventHandler {
    /// Processes event.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use serde::Serialize;
    /// use simcore::{cast, Event, EventHandler, Simulation, SimulationContext};
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {
    ///     some_field: u32,
    /// }
    ///
    /// pub struct Component {
    ///     state: u32,
    /// }
    ///
    /// impl EventHandler for Component {
    ///     fn on(&mut self, event: Event) {
    ///         cast!(match event.data {
    ///             SomeEvent { some_field } => {
    ///                 self.state = some_field;
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let mut sim = Simulation::new(123);
    /// let mut client_ctx = sim.create_context("client");
    /// let comp = Rc::new(RefCell::new(Component { state: 0 }));
    /// let comp_id = sim.add_handler("comp", comp.clone());
    /// client_ctx.emit(SomeEvent { some_field: 16 }, comp_id, 1.2);
    /// assert_eq!(comp.borrow().state, 0);
    /// sim.step();
    /// assert_eq!(comp.borrow().state, 16);
    /// ```
    fn on(&mut self, event: Event);

    /// Called once before the first event of the simulation is delivered,
    /// or on registration if the simulation is already running.
    fn on_start(&mut self) {}

    /// Called once when the simulation ends.
    fn on_shutdown(&mut self) {}
}

/// Enables the use of pattern matching syntax for processing different types of events
/// by downcasting the event payload from [`EventData`](crate::event::EventData) to user-defined types.
///
/// Match arms need not be exhaustive. If the event payload does not match any of specified arms,
/// the event is logged as unhandled under `ERROR` level.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}

/// Specifies which pending events are cancelled on event handler removal.
pub enum EventCancellationPolicy {
    /// Cancel events destined to the component.
    Incoming,
    /// Cancel events produced by the component.
    Outgoing,
    /// Cancel all events related to the component.
    All,
    /// Do not cancel events.
    None,
}
