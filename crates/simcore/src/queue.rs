//! Simulation clock and queue of pending events.

use std::collections::{BinaryHeap, HashSet};

use crate::component::Id;
use crate::error::SimulationError;
use crate::event::{Event, EventData, EventId, SimulationEnd};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

/// Identifier used as the source and destination of events produced by the kernel itself.
pub const KERNEL_ID: Id = Id::MAX;

/// Holds the simulation clock and the pending events ordered by time and then by creation order.
///
/// The clock is only moved forward by [`advance`](Self::advance), so it never goes backward.
#[derive(Clone, Default)]
pub struct EventQueue {
    clock: f64,
    events: BinaryHeap<Event>,
    canceled_events: HashSet<EventId>,
    event_count: u64,
    end_event: Option<EventId>,
    end_time: Option<f64>,
    terminated: bool,
}

impl EventQueue {
    /// Creates an empty queue with the clock set to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Returns the total number of created events including the cancelled ones.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Returns the configured termination time, if any.
    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    /// Returns `true` if the termination event has been delivered.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Inserts a new event occurring after `delay` from the current time and returns its id.
    ///
    /// Panics if the delay is negative, because the past cannot be changed.
    pub fn schedule<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        let event_id = self.event_count;
        let event = Event {
            id: event_id,
            time: self.clock + delay.max(0.),
            src,
            dst,
            data: Box::new(data),
        };
        if delay < -EPSILON {
            log_incorrect_event(event, &format!("negative delay {}", delay));
            panic!("Event delay is negative! It is not allowed to add events from the past.");
        }
        self.events.push(event);
        self.event_count += 1;
        event_id
    }

    /// Establishes a hard stop at `time`.
    ///
    /// A [`SimulationEnd`] event is queued at `time`, events with larger time are never delivered.
    /// Calling this again replaces the previous termination time.
    pub fn terminate_at(&mut self, time: f64) {
        if let Some(prev) = self.end_event.take() {
            self.cancel(prev);
        }
        let id = self.schedule(SimulationEnd {}, KERNEL_ID, KERNEL_ID, time - self.clock);
        self.end_event = Some(id);
        self.end_time = Some(time);
    }

    /// Removes the earliest pending event from the queue and moves the clock to its time.
    pub fn advance(&mut self) -> Result<Event, SimulationError> {
        if self.terminated {
            return Err(SimulationError::Terminated { time: self.clock });
        }
        while let Some(event) = self.events.pop() {
            if self.canceled_events.remove(&event.id) {
                continue;
            }
            self.clock = event.time;
            if self.end_event == Some(event.id) {
                self.terminated = true;
            }
            return Ok(event);
        }
        Err(SimulationError::EmptyQueue)
    }

    /// Returns the earliest pending event without removing it.
    pub fn peek(&mut self) -> Option<&Event> {
        if self.terminated {
            return None;
        }
        loop {
            let id = self.events.peek()?.id;
            if self.canceled_events.remove(&id) {
                self.events.pop();
            } else {
                return self.events.peek();
            }
        }
    }

    /// Cancels the specified event, it is a no-op if the event is already delivered.
    pub fn cancel(&mut self, id: EventId) {
        if self.events.iter().any(|e| e.id == id) {
            self.canceled_events.insert(id);
        }
    }

    /// Cancels all pending events that satisfy the predicate and returns their number.
    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        let mut count = 0;
        for event in self.events.iter() {
            if !self.canceled_events.contains(&event.id) && pred(event) {
                self.canceled_events.insert(event.id);
                count += 1;
            }
        }
        count
    }

    /// Returns the number of pending (not cancelled) events.
    pub fn len(&self) -> usize {
        self.events.len() - self.canceled_events.len()
    }

    /// Returns `true` if there are no pending events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns copies of all pending events in the order of their delivery.
    pub fn dump_events(&self) -> Vec<Event> {
        let mut output: Vec<Event> = self
            .events
            .iter()
            .filter(|e| !self.canceled_events.contains(&e.id))
            .cloned()
            .collect();
        // Ord is inverted for the heap
        output.sort_by(|a, b| b.cmp(a));
        output
    }
}
