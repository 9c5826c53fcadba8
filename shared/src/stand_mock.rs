use core::any::Any;

use alloc::{
    collections::VecDeque,
    string::{String, ToString},
    vec::Vec,
};
use strum::EnumCount;

use crate::{
    comms_hal::WiredLink,
    stand_hal::{PressureChannel, StandDriver, ValveId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoCall {
    SetAngle(ValveId, u8),
    Release(ValveId),
}

/// Records every actuation so tests can assert on exact side effects.
pub struct StandDriverMock {
    pub now_ms: u32,
    pub pressures: [f32; 2],
    pub weight: Option<i32>,
    servo_angles: [Option<u8>; ValveId::COUNT],
    servo_calls: Vec<ServoCall>,
    relay: bool,
    relay_calls: Vec<bool>,
    weight_reads: u32,
}

impl StandDriver for StandDriverMock {
    fn timestamp_ms(&self) -> u32 {
        self.now_ms
    }

    fn read_pressure(&mut self, channel: PressureChannel) -> f32 {
        self.pressures[channel as usize]
    }

    fn read_weight(&mut self) -> Option<i32> {
        self.weight_reads += 1;
        self.weight
    }

    fn set_servo_angle(&mut self, valve: ValveId, angle: u8) {
        self.servo_angles[valve.index()] = Some(angle);
        self.servo_calls.push(ServoCall::SetAngle(valve, angle));
    }

    fn release_servo(&mut self, valve: ValveId) {
        self.servo_calls.push(ServoCall::Release(valve));
    }

    fn set_igniter_relay(&mut self, energized: bool) {
        self.relay = energized;
        self.relay_calls.push(energized);
    }

    fn igniter_relay(&self) -> bool {
        self.relay
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

impl StandDriverMock {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            pressures: [0.0; 2],
            weight: None,
            servo_angles: [None; ValveId::COUNT],
            servo_calls: Vec::new(),
            relay: false,
            relay_calls: Vec::new(),
            weight_reads: 0,
        }
    }

    pub fn set_pressure(&mut self, channel: PressureChannel, psi: f32) {
        self.pressures[channel as usize] = psi;
    }

    pub fn servo_angle(&self, valve: ValveId) -> Option<u8> {
        self.servo_angles[valve.index()]
    }

    pub fn servo_calls(&self) -> &[ServoCall] {
        &self.servo_calls
    }

    pub fn relay_calls(&self) -> &[bool] {
        &self.relay_calls
    }

    /// Number of load cell reads so far.
    pub fn weight_reads(&self) -> u32 {
        self.weight_reads
    }

    pub fn clear_calls(&mut self) {
        self.servo_calls.clear();
        self.relay_calls.clear();
    }
}

impl Default for StandDriverMock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct WiredLinkMock {
    incoming: VecDeque<String>,
    written: Vec<String>,
}

impl WiredLink for WiredLinkMock {
    fn write_line(&mut self, line: &str) {
        self.written.push(line.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.incoming.pop_front()
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

impl WiredLinkMock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_incoming(&mut self, line: &str) {
        self.incoming.push_back(line.to_string());
    }

    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }

    pub fn written(&self) -> &[String] {
        &self.written
    }

    pub fn take_written(&mut self) -> Vec<String> {
        core::mem::take(&mut self.written)
    }
}
