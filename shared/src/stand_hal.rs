use core::any::Any;

use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};

pub const NUM_VALVES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnitionState {
    Idle,
    Settling,
    Firing,
}

/// Servo valves in wired-command order (`V1`..`V4`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumCountMacro, EnumIter,
)]
pub enum ValveId {
    Nitrogen,
    Release,
    Fuel,
    Oxidizer,
}

impl ValveId {
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// One-based number used on the wire.
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }

    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(ValveId::Nitrogen),
            2 => Some(ValveId::Release),
            3 => Some(ValveId::Fuel),
            4 => Some(ValveId::Oxidizer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ValvePosition {
    Open,
    Closed,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum PressureChannel {
    Fuel,
    Oxidizer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandCommand {
    Ignite,
    OpenAll,
    CloseAll,
    SetValve {
        valve: ValveId,
        position: ValvePosition,
    },
}

/// Servo angles in degrees for each commanded position of one valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveCalibration {
    pub open_angle: u8,
    pub close_angle: u8,
    pub neutral_angle: u8,
}

impl ValveCalibration {
    pub const fn new(open_angle: u8, close_angle: u8, neutral_angle: u8) -> Self {
        Self {
            open_angle,
            close_angle,
            neutral_angle,
        }
    }

    pub fn angle(&self, position: ValvePosition) -> u8 {
        match position {
            ValvePosition::Open => self.open_angle,
            ValvePosition::Closed => self.close_angle,
            ValvePosition::Neutral => self.neutral_angle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnitionConfig {
    pub settle_ms: u32,
    pub fire_duration_ms: u32,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            fire_duration_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandConfig {
    pub valves: [ValveCalibration; NUM_VALVES],
    pub ignition: IgnitionConfig,
    pub telemetry_interval_ms: u32,
    pub tare_samples: u32,
    pub servo_release_ms: Option<u32>,
}

impl Default for StandConfig {
    fn default() -> Self {
        Self {
            valves: [
                ValveCalibration::new(95, 150, 120),
                ValveCalibration::new(82, 172, 130),
                ValveCalibration::new(85, 170, 130),
                ValveCalibration::new(73, 150, 110),
            ],
            ignition: IgnitionConfig::default(),
            telemetry_interval_ms: 300,
            tare_samples: 100,
            servo_release_ms: None,
        }
    }
}

impl StandConfig {
    pub fn calibration(&self, valve: ValveId) -> &ValveCalibration {
        &self.valves[valve.index()]
    }
}

/// Averaged sensor reading sent over the wired link as `TLM:<json>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub psi_fuel: f64,
    pub psi_ox: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<i32>,
}

pub trait StandDriver {
    /// Monotonic uptime in milliseconds, allowed to wrap.
    fn timestamp_ms(&self) -> u32;

    fn read_pressure(&mut self, channel: PressureChannel) -> f32;
    fn read_weight(&mut self) -> Option<i32>;

    fn set_servo_angle(&mut self, valve: ValveId, angle: u8);
    fn release_servo(&mut self, valve: ValveId);

    fn set_igniter_relay(&mut self, energized: bool);
    fn igniter_relay(&self) -> bool;

    fn as_mut_any(&mut self) -> &mut dyn Any;
}
