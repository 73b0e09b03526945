use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use simcore::{cast, Event, EventHandler, Simulation, SimulationContext, SimulationError};

#[derive(Clone, Serialize)]
struct Tick {}

struct Ticker {
    ctx: SimulationContext,
    period: f64,
    started: u32,
    ticks: u32,
    shutdowns: u32,
    shutdown_time: Option<f64>,
}

impl Ticker {
    fn new(ctx: SimulationContext, period: f64) -> Self {
        Self {
            ctx,
            period,
            started: 0,
            ticks: 0,
            shutdowns: 0,
            shutdown_time: None,
        }
    }
}

impl EventHandler for Ticker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Tick {} => {
                self.ticks += 1;
                self.ctx.emit_self(Tick {}, self.period);
            }
        })
    }

    fn on_start(&mut self) {
        self.started += 1;
        self.ctx.emit_self_now(Tick {});
    }

    fn on_shutdown(&mut self) {
        self.shutdowns += 1;
        self.shutdown_time = Some(self.ctx.time());
    }
}

fn ticker(sim: &mut Simulation, name: &str, period: f64) -> Rc<RefCell<Ticker>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let t = Rc::new(RefCell::new(Ticker::new(sim.create_context(name), period)));
    sim.add_handler(name, t.clone());
    t
}

#[test]
fn test_terminate_stops_periodic_component() {
    let mut sim = Simulation::new(123);
    let t = ticker(&mut sim, "ticker", 1.);
    sim.terminate_at(3.5);
    sim.step_until_no_events();

    let t = t.borrow();
    assert_eq!(t.started, 1);
    // ticks at 0, 1, 2, 3
    assert_eq!(t.ticks, 4);
    assert_eq!(t.shutdowns, 1);
    assert_eq!(t.shutdown_time, Some(3.5));
    assert_eq!(sim.time(), 3.5);
    assert!(sim.is_finished());
    assert_eq!(sim.advance(), Err(SimulationError::Terminated { time: 3.5 }));
}

#[test]
fn test_events_at_end_time_are_delivered_before_end() {
    let mut sim = Simulation::new(123);
    let t = ticker(&mut sim, "ticker", 1.);
    // the tick at 2.0 is queued before the end event is
    sim.steps(2);
    sim.terminate_at(2.);
    sim.step_until_no_events();
    assert_eq!(t.borrow().ticks, 3);

    let mut late = Simulation::new(123);
    late.terminate_at(2.);
    let t = ticker(&mut late, "ticker", 1.);
    late.step_until_no_events();
    // the tick at 2.0 is created after the end event and is never delivered
    assert_eq!(t.borrow().ticks, 2);
}

#[test]
fn test_terminate_at_replaces_previous_time() {
    let mut sim = Simulation::new(123);
    let t = ticker(&mut sim, "ticker", 1.);
    sim.terminate_at(10.);
    sim.terminate_at(2.5);
    sim.step_until_no_events();
    assert_eq!(t.borrow().ticks, 3);
    assert_eq!(sim.time(), 2.5);
}

#[test]
fn test_handler_added_while_running_is_started() {
    let mut sim = Simulation::new(123);
    let first = ticker(&mut sim, "first", 2.);
    sim.terminate_at(5.);
    sim.steps(2);
    assert_eq!(first.borrow().started, 1);

    let second = ticker(&mut sim, "second", 2.);
    assert_eq!(second.borrow().started, 1);
    sim.step_until_no_events();

    assert_eq!(first.borrow().shutdowns, 1);
    assert_eq!(second.borrow().shutdowns, 1);
    assert!(second.borrow().ticks >= 2);
}

#[test]
fn test_shutdown_without_termination_time() {
    #[derive(Default)]
    struct Passive {
        events: u32,
        shutdowns: u32,
    }

    impl EventHandler for Passive {
        fn on(&mut self, _: Event) {
            self.events += 1;
        }

        fn on_shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    let mut sim = Simulation::new(123);
    let comp = Rc::new(RefCell::new(Passive::default()));
    let id = sim.add_handler("passive", comp.clone());
    let mut ctx = sim.create_context("driver");
    ctx.emit(Tick {}, id, 1.);
    ctx.emit(Tick {}, id, 7.);

    sim.step_until_no_events();
    sim.step_until_no_events();
    assert_eq!(comp.borrow().events, 2);
    assert_eq!(comp.borrow().shutdowns, 1);
    assert_eq!(sim.time(), 7.);
}
