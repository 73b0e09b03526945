//! Kernel-level outcomes that stop the event loop.

use thiserror::Error;

/// Reasons why the next event cannot be obtained from the queue.
///
/// Neither of these is a failure of the simulated model: both are the regular ways a run concludes.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimulationError {
    /// There are no pending events and no termination time was reached.
    #[error("no pending events left")]
    EmptyQueue,
    /// The configured termination time has been reached, no more events will be delivered.
    #[error("simulation was terminated at time {time}")]
    Terminated {
        /// Termination time.
        time: f64,
    },
}
