//! Simulation configuration.

pub mod options;
pub mod sim_config;

pub use options::{parse_config_value, parse_option, parse_options};
pub use sim_config::{HostConfig, SimulationConfig, VmConfig};
