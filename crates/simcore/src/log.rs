//! Logging facilities.
//!
//! Log records produced by components are prefixed with the current simulation time, the colored level label
//! and the component name, e.g. `[12.500 DEBUG datacenter] vm 3 allocated to host 1`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::{json, Value};

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Shared implementation of the context-aware logging macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_ctx {
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $msg:expr) => (
        log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $msg
        )
    );
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level.
///
/// The first argument is anything with `name()` and `time()` methods, usually a
/// [`SimulationContext`](crate::SimulationContext).
///
/// # Examples
///
/// ```rust
/// use simcore::{log_info, Simulation, SimulationContext};
///
/// struct Component {
///     ctx: SimulationContext,
/// }
///
/// impl Component {
///     fn start(&self) {
///         log_info!(self.ctx, "started with {} workers", 4);
///     }
/// }
///
/// let mut sim = Simulation::new(123);
/// let comp = Component { ctx: sim.create_context("comp") };
/// comp.start();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(warn, "WARN ", Yellow, $ctx, $($arg)+));
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(error, "ERROR", Red, $ctx, $($arg)+));
}

pub(crate) fn event_json(event: &Event) -> Value {
    json!({"type": event.type_name(), "data": event.data, "src": event.src, "dst": event.dst})
}

fn log_event_error(event: &Event, what: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        get_colored("ERROR", Color::Red),
        what,
        event_json(event)
    );
}

/// Logs an unhandled event.
///
/// This method is used internally in [`cast!`](crate::cast!) macro.
pub fn log_unhandled_event(event: Event) {
    log_event_error(&event, "Unhandled event");
}

/// Logs an event whose destination has no registered handler.
pub(crate) fn log_undelivered_event(event: Event) {
    log_event_error(&event, "Undelivered event");
}

/// Logs an event that was rejected by the queue.
pub(crate) fn log_incorrect_event(event: Event, msg: &str) {
    log_event_error(&event, &format!("Incorrect event ({})", msg));
}
