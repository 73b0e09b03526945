use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::distributions::{Alphanumeric, DistString};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::component::Id;
use crate::error::SimulationError;
use crate::event::{Event, EventData, EventId};
use crate::queue::EventQueue;

/// State shared between the simulation and all component contexts.
pub struct SimulationState {
    queue: EventQueue,
    rand: Pcg64,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            queue: EventQueue::new(),
            rand: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn time(&self) -> f64 {
        self.queue.time()
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    pub fn random_string(&mut self, len: usize) -> String {
        Alphanumeric.sample_string(&mut self.rand, len)
    }

    pub fn add_event<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.queue.schedule(data, src, dst, delay)
    }

    pub fn next_event(&mut self) -> Result<Event, SimulationError> {
        self.queue.advance()
    }

    pub fn peek_event(&mut self) -> Option<&Event> {
        self.queue.peek()
    }

    pub fn cancel_event(&mut self, id: EventId) {
        self.queue.cancel(id);
    }

    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.queue.cancel_events(pred)
    }

    pub fn terminate_at(&mut self, time: f64) {
        self.queue.terminate_at(time);
    }

    pub fn end_time(&self) -> Option<f64> {
        self.queue.end_time()
    }

    pub fn event_count(&self) -> u64 {
        self.queue.event_count()
    }

    pub fn dump_events(&self) -> Vec<Event> {
        self.queue.dump_events()
    }
}
