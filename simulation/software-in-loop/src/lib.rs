pub mod config;
pub mod driver;
pub mod logging;
pub mod test_stand;
pub mod wired;

pub use config::{ConfigError, SilConfig, SimulationConfig};
pub use test_stand::{describe_event, SilError, SilHardware, TestStand};
