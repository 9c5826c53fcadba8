use std::{fs::read_to_string, path::Path};

use ground_station_rs::GroundStationConfig;
use relay_rs::RelayConfig;
use serde::{Deserialize, Serialize};
use shared::stand_hal::StandConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot load the config file: {0}")]
    FileLoadError(#[from] std::io::Error),

    #[error("Cannot read the config file: {0}")]
    DeserialiseError(#[from] serde_json::Error),

    #[error("Ping interval ({ping_ms} ms) must be shorter than the relay link timeout ({timeout_ms} ms)")]
    PingTooSlow { ping_ms: u32, timeout_ms: u32 },

    #[error("Retransmit interval ({retransmit_ms} ms) must be shorter than the relay link timeout ({timeout_ms} ms)")]
    RetransmitTooSlow { retransmit_ms: u32, timeout_ms: u32 },

    #[error("Ack burst lasts {burst_ms} ms, longer than the retransmit interval ({retransmit_ms} ms)")]
    AckBurstTooLong { burst_ms: u32, retransmit_ms: u32 },

    #[error("Invalid simulation parameter: {0}")]
    InvalidSimulation(&'static str),
}

/// Physical model of the stand and the radio channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_ms: u32,
    pub seed: u64,
    pub drop_probability: f64,
    pub supply_pressure_psi: f32,
    pub pressurize_rate_psi_per_s: f32,
    pub vent_rate_psi_per_s: f32,
    pub burn_rate_psi_per_s: f32,
    pub sensor_offset_psi: f32,
    pub pressure_noise_std_psi: f32,
    pub load_cell_ready: bool,
    pub firing_load: f32,
    pub load_noise_std: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            seed: 1,
            drop_probability: 0.0,
            supply_pressure_psi: 300.0,
            pressurize_rate_psi_per_s: 50.0,
            vent_rate_psi_per_s: 80.0,
            burn_rate_psi_per_s: 20.0,
            sensor_offset_psi: 0.8,
            pressure_noise_std_psi: 0.05,
            load_cell_ready: true,
            firing_load: 1500.0,
            load_noise_std: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilConfig {
    pub stand: StandConfig,
    pub relay: RelayConfig,
    pub ground: GroundStationConfig,
    pub simulation: SimulationConfig,
}

impl SilConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_str = read_to_string(path)?;

        Self::from_json_str(&config_str)
    }

    pub fn from_json_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: SilConfig = serde_json::from_str(config_str)?;
        config.validate()?;

        Ok(config)
    }

    /// Checks the timing relations the three nodes rely on between each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout_ms = self.relay.link_timeout_ms;
        let retransmit_ms = self.ground.retransmit_interval_ms;

        if self.ground.ping_interval_ms >= timeout_ms {
            return Err(ConfigError::PingTooSlow {
                ping_ms: self.ground.ping_interval_ms,
                timeout_ms,
            });
        }

        if retransmit_ms >= timeout_ms {
            return Err(ConfigError::RetransmitTooSlow {
                retransmit_ms,
                timeout_ms,
            });
        }

        let burst_ms = self
            .relay
            .ack_spacing_ms
            .saturating_mul(self.relay.ack_repeat_count.saturating_sub(1) as u32);

        if burst_ms >= retransmit_ms {
            return Err(ConfigError::AckBurstTooLong {
                burst_ms,
                retransmit_ms,
            });
        }

        let sim = &self.simulation;

        if sim.tick_ms == 0 {
            return Err(ConfigError::InvalidSimulation("tick_ms must be positive"));
        }

        if !(0.0..=1.0).contains(&sim.drop_probability) {
            return Err(ConfigError::InvalidSimulation(
                "drop_probability must be within 0..=1",
            ));
        }

        if sim.pressure_noise_std_psi < 0.0 || sim.load_noise_std < 0.0 {
            return Err(ConfigError::InvalidSimulation(
                "noise standard deviations must not be negative",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = SilConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.relay.link_timeout_ms, 3000);
        assert_eq!(config.ground.retransmit_interval_ms, 500);
        assert_eq!(config.stand.ignition.fire_duration_ms, 5000);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = SilConfig::from_json_str(
            r#"{ "ground": { "ping_interval_ms": 2000 }, "simulation": { "seed": 7 } }"#,
        )
        .unwrap();

        assert_eq!(config.ground.ping_interval_ms, 2000);
        assert_eq!(config.ground.retransmit_interval_ms, 500);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.relay.network_tag, "DC=");
    }

    #[test]
    fn rejects_inconsistent_timing() {
        assert!(matches!(
            SilConfig::from_json_str(r#"{ "ground": { "ping_interval_ms": 4000 } }"#),
            Err(ConfigError::PingTooSlow { .. })
        ));
        assert!(matches!(
            SilConfig::from_json_str(r#"{ "ground": { "retransmit_interval_ms": 3000 } }"#),
            Err(ConfigError::RetransmitTooSlow { .. })
        ));
        assert!(matches!(
            SilConfig::from_json_str(r#"{ "relay": { "ack_spacing_ms": 250 } }"#),
            Err(ConfigError::AckBurstTooLong { .. })
        ));
        assert!(matches!(
            SilConfig::from_json_str(r#"{ "simulation": { "drop_probability": 1.5 } }"#),
            Err(ConfigError::InvalidSimulation(_))
        ));
        assert!(matches!(
            SilConfig::from_json_str("{ not json"),
            Err(ConfigError::DeserialiseError(_))
        ));
    }
}
