use core::any::Any;

use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use shared::{
    stand_hal::{
        PressureChannel, StandDriver, ValveCalibration, ValveId, ValvePosition, NUM_VALVES,
    },
    util::elapsed_ms,
};

use crate::config::SimulationConfig;

/// Simulated stand hardware: two propellant tanks fed by the nitrogen valve, vented
/// by the release valve, and drained while their main valve is open.
pub struct StandDriverSil {
    now_ms: u32,
    params: SimulationConfig,
    calibrations: [ValveCalibration; NUM_VALVES],
    servo_angles: [Option<u8>; NUM_VALVES],
    servo_released: [bool; NUM_VALVES],
    relay: bool,
    tank_psi: [f32; 2],
    rng: StdRng,
    pressure_noise: Option<Normal<f32>>,
    load_noise: Option<Normal<f32>>,
}

impl StandDriver for StandDriverSil {
    fn timestamp_ms(&self) -> u32 {
        self.now_ms
    }

    fn read_pressure(&mut self, channel: PressureChannel) -> f32 {
        let noise = sample(&mut self.rng, &self.pressure_noise);

        self.tank_psi[channel as usize] + self.params.sensor_offset_psi + noise
    }

    fn read_weight(&mut self) -> Option<i32> {
        if !self.params.load_cell_ready {
            return None;
        }

        let load = if self.is_burning() {
            self.params.firing_load
        } else {
            0.0
        };
        let noise = sample(&mut self.rng, &self.load_noise);

        Some((load + noise).round() as i32)
    }

    fn set_servo_angle(&mut self, valve: ValveId, angle: u8) {
        self.servo_angles[valve.index()] = Some(angle);
        self.servo_released[valve.index()] = false;
    }

    fn release_servo(&mut self, valve: ValveId) {
        self.servo_released[valve.index()] = true;
    }

    fn set_igniter_relay(&mut self, energized: bool) {
        self.relay = energized;
    }

    fn igniter_relay(&self) -> bool {
        self.relay
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

impl StandDriverSil {
    pub fn new(params: SimulationConfig, calibrations: [ValveCalibration; NUM_VALVES]) -> Self {
        Self {
            now_ms: 0,
            rng: StdRng::seed_from_u64(params.seed),
            pressure_noise: Normal::new(0.0, params.pressure_noise_std_psi).ok(),
            load_noise: Normal::new(0.0, params.load_noise_std).ok(),
            params,
            calibrations,
            servo_angles: [None; NUM_VALVES],
            servo_released: [false; NUM_VALVES],
            relay: false,
            tank_psi: [0.0; 2],
        }
    }

    /// Moves the simulated clock forward and integrates tank pressures.
    pub fn advance_to(&mut self, now_ms: u32) {
        let dt_s = elapsed_ms(now_ms, self.now_ms) as f32 * 1e-3;
        self.now_ms = now_ms;

        let pressurizing = self.valve_position(ValveId::Nitrogen) == Some(ValvePosition::Open);
        let venting = self.valve_position(ValveId::Release) == Some(ValvePosition::Open);

        for (channel, main_valve) in [
            (PressureChannel::Fuel, ValveId::Fuel),
            (PressureChannel::Oxidizer, ValveId::Oxidizer),
        ] {
            let mut psi = self.tank_psi[channel as usize];

            if pressurizing {
                psi = (psi + self.params.pressurize_rate_psi_per_s * dt_s)
                    .min(self.params.supply_pressure_psi);
            }

            if venting {
                psi -= self.params.vent_rate_psi_per_s * dt_s;
            }

            if self.valve_position(main_valve) == Some(ValvePosition::Open) {
                psi -= self.params.burn_rate_psi_per_s * dt_s;
            }

            self.tank_psi[channel as usize] = psi.max(0.0);
        }
    }

    /// Position implied by the last commanded angle, if it matches a calibrated one.
    pub fn valve_position(&self, valve: ValveId) -> Option<ValvePosition> {
        let angle = self.servo_angles[valve.index()]?;
        let calibration = &self.calibrations[valve.index()];

        [
            ValvePosition::Open,
            ValvePosition::Closed,
            ValvePosition::Neutral,
        ]
        .into_iter()
        .find(|position| calibration.angle(*position) == angle)
    }

    pub fn is_burning(&self) -> bool {
        self.relay
            && self.valve_position(ValveId::Fuel) == Some(ValvePosition::Open)
            && self.valve_position(ValveId::Oxidizer) == Some(ValvePosition::Open)
    }

    pub fn servo_released(&self, valve: ValveId) -> bool {
        self.servo_released[valve.index()]
    }

    pub fn tank_pressure(&self, channel: PressureChannel) -> f32 {
        self.tank_psi[channel as usize]
    }

    pub fn set_tank_pressure(&mut self, channel: PressureChannel, psi: f32) {
        self.tank_psi[channel as usize] = psi;
    }
}

fn sample(rng: &mut StdRng, noise: &Option<Normal<f32>>) -> f32 {
    noise.as_ref().map_or(0.0, |normal| normal.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::stand_hal::StandConfig;

    fn quiet_driver() -> StandDriverSil {
        let params = SimulationConfig {
            pressure_noise_std_psi: 0.0,
            load_noise_std: 0.0,
            ..Default::default()
        };

        StandDriverSil::new(params, StandConfig::default().valves)
    }

    #[test]
    fn nitrogen_pressurizes_and_release_vents() {
        let mut driver = quiet_driver();
        let calibration = StandConfig::default().valves[ValveId::Nitrogen.index()];

        driver.set_servo_angle(ValveId::Nitrogen, calibration.open_angle);
        assert_eq!(driver.valve_position(ValveId::Nitrogen), Some(ValvePosition::Open));

        driver.advance_to(1000);
        assert!((driver.tank_pressure(PressureChannel::Fuel) - 50.0).abs() < 1e-3);

        let release = StandConfig::default().valves[ValveId::Release.index()];
        driver.set_servo_angle(ValveId::Nitrogen, calibration.close_angle);
        driver.set_servo_angle(ValveId::Release, release.open_angle);
        driver.advance_to(2000);
        assert_eq!(driver.tank_pressure(PressureChannel::Oxidizer), 0.0);
    }

    #[test]
    fn load_cell_reads_thrust_only_while_burning() {
        let mut driver = quiet_driver();
        let valves = StandConfig::default().valves;

        assert_eq!(driver.read_weight(), Some(0));

        driver.set_igniter_relay(true);
        driver.set_servo_angle(ValveId::Fuel, valves[ValveId::Fuel.index()].open_angle);
        driver.set_servo_angle(ValveId::Oxidizer, valves[ValveId::Oxidizer.index()].open_angle);
        assert!(driver.is_burning());
        assert_eq!(driver.read_weight(), Some(1500));
    }

    #[test]
    fn pressure_includes_sensor_offset() {
        let mut driver = quiet_driver();
        driver.set_tank_pressure(PressureChannel::Fuel, 100.0);

        assert!((driver.read_pressure(PressureChannel::Fuel) - 100.8).abs() < 1e-4);
    }
}
