//! Simulation configuration and execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;
use serde_json::json;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::error::SimulationError;
use crate::event::Event;
use crate::handler::{EventCancellationPolicy, EventHandler};
use crate::log::{event_json, get_colored, log_undelivered_event};
use crate::queue::KERNEL_ID;
use crate::state::SimulationState;

/// Represents a simulation, provides methods for its configuration and execution.
///
/// The simulation is single-threaded: each event is processed to completion by its destination handler
/// before the next event is taken from the queue.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: HashMap<String, Id>,
    names: Rc<RefCell<Vec<String>>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
    started: bool,
    finished: bool,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            name_to_id: HashMap::new(),
            names: Rc::new(RefCell::new(Vec::new())),
            handlers: Vec::new(),
            started: false,
            finished: false,
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.borrow_mut().push(name.to_owned());
        self.handlers.push(None);
        id
    }

    /// Returns the identifier of component by its name.
    ///
    /// Panics if component with such name does not exist.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simcore::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp_ctx = sim.create_context("comp");
    /// let comp_id = sim.lookup_id(comp_ctx.name());
    /// assert_eq!(comp_id, 0);
    /// ```
    pub fn lookup_id(&self, name: &str) -> Id {
        *self
            .name_to_id
            .get(name)
            .unwrap_or_else(|| panic!("Component {} is not registered", name))
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such Id does not exist.
    pub fn lookup_name(&self, id: Id) -> String {
        if id == KERNEL_ID {
            return "simulation".to_owned();
        }
        self.names.borrow()[id as usize].clone()
    }

    /// Creates a new simulation context with specified name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simcore::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp_ctx = sim.create_context("comp");
    /// assert_eq!(comp_ctx.id(), 0); // component ids are assigned sequentially starting from 0
    /// assert_eq!(comp_ctx.name(), "comp");
    /// ```
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let ctx = SimulationContext::new(
            self.register(name.as_ref()),
            name.as_ref(),
            self.sim_state.clone(),
            self.names.clone(),
        );
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created context: {}",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
            json!({"name": ctx.name(), "id": ctx.id()})
        );
        ctx
    }

    /// Registers the event handler implementation for component with specified name, returns the component Id.
    ///
    /// If the component already has a context, its Id is reused.
    /// If the simulation is already running, [`EventHandler::on_start`] is invoked immediately.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler.clone());
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Added handler: {}",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        if self.started {
            handler.borrow_mut().on_start();
        }
        id
    }

    /// Removes the event handler for component with specified name.
    ///
    /// Pending events related to the component are cancelled according to the given policy.
    /// All subsequent events destined for this component will not be delivered until the handler is added again.
    pub fn remove_handler<S>(&mut self, name: S, cancel_policy: EventCancellationPolicy)
    where
        S: AsRef<str>,
    {
        let id = self.lookup_id(name.as_ref());
        self.handlers[id as usize] = None;
        match cancel_policy {
            EventCancellationPolicy::Incoming => self.cancel_events(|e| e.dst == id),
            EventCancellationPolicy::Outgoing => self.cancel_events(|e| e.src == id),
            EventCancellationPolicy::All => self.cancel_events(|e| e.src == id || e.dst == id),
            EventCancellationPolicy::None => 0,
        };
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Removed handler: {}",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Sets the termination time of the simulation.
    ///
    /// At this time a synthetic end event is processed: all handlers receive
    /// [`EventHandler::on_shutdown`] and no further events are delivered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use simcore::Simulation;
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {}
    ///
    /// let mut sim = Simulation::new(123);
    /// let mut comp_ctx = sim.create_context("comp");
    /// comp_ctx.emit_self(SomeEvent {}, 1.0);
    /// comp_ctx.emit_self(SomeEvent {}, 5.0);
    /// sim.terminate_at(3.0);
    /// sim.step_until_no_events();
    /// assert_eq!(sim.time(), 3.0);
    /// assert!(sim.is_finished());
    /// ```
    pub fn terminate_at(&mut self, time: f64) {
        self.sim_state.borrow_mut().terminate_at(time);
    }

    /// Returns `true` if the simulation has ended and shutdown callbacks were invoked.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn start_components(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let handlers: Vec<_> = self.handlers.iter().flatten().cloned().collect();
        for handler in handlers {
            handler.borrow_mut().on_start();
        }
    }

    fn shutdown_components(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Shutting down components",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
        );
        let handlers: Vec<_> = self.handlers.iter().flatten().cloned().collect();
        for handler in handlers {
            handler.borrow_mut().on_shutdown();
        }
    }

    fn deliver(&mut self, event: Event) {
        if log_enabled!(Trace) {
            let dst_name = self.lookup_name(event.dst);
            trace!(
                target: &dst_name,
                "[{:.3} {} {}] {}",
                event.time,
                get_colored("EVENT", colored::Color::BrightBlack),
                dst_name,
                event_json(&event)
            );
        }
        let handler = self.handlers.get(event.dst as usize).cloned().flatten();
        match handler {
            Some(handler) => handler.borrow_mut().on(event),
            None => log_undelivered_event(event),
        }
    }

    /// Delivers the next pending event and returns its time.
    ///
    /// Returns [`SimulationError::EmptyQueue`] if there are no pending events and
    /// [`SimulationError::Terminated`] if the termination time has already been reached.
    /// When the termination event itself is processed, the components are shut down.
    pub fn advance(&mut self) -> Result<f64, SimulationError> {
        self.start_components();
        let next = self.sim_state.borrow_mut().next_event();
        let event = next?;
        let time = event.time;
        if event.dst == KERNEL_ID {
            self.shutdown_components();
        } else {
            self.deliver(event);
        }
        Ok(time)
    }

    /// Performs a single step through the simulation.
    ///
    /// Takes the next event from the queue, advances the simulation time to event time and tries to process it
    /// by invoking the [`EventHandler::on()`](crate::EventHandler::on()) method of the corresponding event handler.
    /// If there is no handler registered for component with Id `event.dst`, logs the undelivered event and discards it.
    ///
    /// Returns `true` if some pending event was found (no matter was it properly processed or not) and `false`
    /// otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use simcore::Simulation;
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {}
    ///
    /// let mut sim = Simulation::new(123);
    /// let mut comp_ctx = sim.create_context("comp");
    /// comp_ctx.emit_self(SomeEvent {}, 1.2);
    /// assert!(sim.step());
    /// assert_eq!(sim.time(), 1.2);
    /// assert!(!sim.step());
    /// ```
    pub fn step(&mut self) -> bool {
        self.advance().is_ok()
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no pending events left or the termination time is reached,
    /// then shuts down the components.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
        self.shutdown_components();
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Processes events until the next event time is above `current_time + duration`
    /// or there are no pending events left.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use simcore::Simulation;
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {}
    ///
    /// let mut sim = Simulation::new(123);
    /// let mut comp_ctx = sim.create_context("comp");
    /// comp_ctx.emit_self(SomeEvent {}, 1.0);
    /// comp_ctx.emit_self(SomeEvent {}, 2.0);
    /// comp_ctx.emit_self(SomeEvent {}, 3.5);
    /// assert!(sim.step_for_duration(1.5));
    /// assert_eq!(sim.time(), 1.0);
    /// assert!(!sim.step_for_duration(3.0));
    /// assert_eq!(sim.time(), 3.5);
    /// ```
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        loop {
            let next_time = self.sim_state.borrow_mut().peek_event().map(|e| e.time);
            match next_time {
                Some(time) if time <= end_time => {
                    self.step();
                }
                Some(_) => return true,
                None => return false,
            }
        }
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Returns a random alphanumeric string of specified length
    /// using the simulation-wide random number generator.
    pub fn random_string(&mut self, len: usize) -> String {
        self.sim_state.borrow_mut().random_string(len)
    }

    /// Returns the total number of created events.
    ///
    /// Note that cancelled events are also counted here.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Cancels events that satisfy the given predicate function, returns the number of cancelled events.
    ///
    /// Note that already processed events cannot be cancelled.
    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.sim_state.borrow_mut().cancel_events(pred)
    }

    /// Returns copies of pending events in the order of their delivery.
    pub fn dump_events(&self) -> Vec<Event> {
        self.sim_state.borrow().dump_events()
    }
}
