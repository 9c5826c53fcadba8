use std::sync::{Arc, Mutex};

use actuator_rs::Actuator;
use ground_station_rs::{GroundStation, OperatorEvent, SubmitError};
use radio_link::{
    interface::{mock_interface::MockRadio, mock_topology::MockAir},
    RadioLinkError,
};
use relay_rs::RadioRelay;
use shared::{
    comms_hal::{parse_telemetry_line, SequenceNumber},
    stand_hal::StandDriver,
};
use thiserror::Error;

use crate::{
    config::SilConfig,
    driver::StandDriverSil,
    wired::{wired_pair, WiredEnd},
};

#[derive(Debug, Error)]
pub enum SilError {
    #[error("Ground station radio failed to start: {0:?}")]
    GroundRadioInit(RadioLinkError),

    #[error("Relay radio failed to start: {0:?}")]
    RelayRadioInit(RadioLinkError),
}

/// Everything the three nodes borrow. Lives outside `TestStand` so the nodes can hold
/// plain mutable references into it.
pub struct SilHardware {
    pub air: Arc<Mutex<MockAir>>,
    pub driver: StandDriverSil,
    pub ground_radio: MockRadio,
    pub relay_radio: MockRadio,
    pub relay_wired: WiredEnd,
    pub actuator_wired: WiredEnd,
}

impl SilHardware {
    pub fn new(config: &SilConfig) -> Self {
        let air = MockAir::new_shared(config.simulation.seed);
        air.lock()
            .expect("Failed to lock mock air for setup")
            .set_drop_probability(config.simulation.drop_probability);

        let ground_radio = MockRadio::new_on_air(air.clone());
        let relay_radio = MockRadio::new_on_air(air.clone());
        let (relay_wired, actuator_wired) = wired_pair();

        Self {
            driver: StandDriverSil::new(config.simulation.clone(), config.stand.valves),
            air,
            ground_radio,
            relay_radio,
            relay_wired,
            actuator_wired,
        }
    }
}

/// Ground station, relay and actuator stepped together on one simulated clock.
pub struct TestStand<'a> {
    pub ground: GroundStation<'a>,
    pub relay: RadioRelay<'a>,
    pub actuator: Actuator<'a>,
    air: Arc<Mutex<MockAir>>,
    ground_radio_id: usize,
    relay_radio_id: usize,
    now_ms: u32,
    tick_ms: u32,
    events: Vec<OperatorEvent>,
}

impl<'a> TestStand<'a> {
    pub fn new(config: &SilConfig, hardware: &'a mut SilHardware) -> Result<Self, SilError> {
        let SilHardware {
            air,
            driver,
            ground_radio,
            relay_radio,
            relay_wired,
            actuator_wired,
        } = hardware;

        let now_ms = driver.timestamp_ms();
        let ground_radio_id = ground_radio.radio_id;
        let relay_radio_id = relay_radio.radio_id;

        let ground = GroundStation::new(config.ground.clone(), ground_radio, now_ms)
            .map_err(SilError::GroundRadioInit)?;
        let relay = RadioRelay::new(config.relay.clone(), relay_radio, relay_wired, now_ms)
            .map_err(SilError::RelayRadioInit)?;

        let mut actuator = Actuator::new(config.stand.clone(), driver, actuator_wired);
        actuator.tare_pressure_sensors();

        Ok(Self {
            ground,
            relay,
            actuator,
            air: air.clone(),
            ground_radio_id,
            relay_radio_id,
            now_ms,
            tick_ms: config.simulation.tick_ms,
            events: Vec::new(),
        })
    }

    /// Hands an operator line to the ground station at the current time.
    pub fn submit(&mut self, line: &str) -> Result<SequenceNumber, SubmitError> {
        self.ground.submit(line, self.now_ms)
    }

    pub fn step(&mut self) {
        self.now_ms = self.now_ms.wrapping_add(self.tick_ms);
        let now_ms = self.now_ms;

        self.driver().advance_to(now_ms);

        self.ground.update(now_ms);
        self.relay.update(now_ms);
        self.actuator.update();

        let events = self.ground.take_events();
        self.events.extend(events);
    }

    pub fn run_for(&mut self, duration_ms: u32) {
        for _ in 0..(duration_ms / self.tick_ms) {
            self.step();
        }
    }

    /// Steps until `done` holds or `max_ms` has passed. Returns whether `done` held.
    pub fn run_until<F>(&mut self, max_ms: u32, mut done: F) -> bool
    where
        F: FnMut(&mut Self) -> bool,
    {
        for _ in 0..(max_ms / self.tick_ms) {
            if done(&mut *self) {
                return true;
            }

            self.step();
        }

        done(&mut *self)
    }

    pub fn take_events(&mut self) -> Vec<OperatorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    pub fn air(&self) -> &Arc<Mutex<MockAir>> {
        &self.air
    }

    /// Drops everything the ground station transmits.
    pub fn set_ground_muted(&mut self, muted: bool) {
        self.lock_air().set_muted(self.ground_radio_id, muted);
    }

    /// Drops everything the relay transmits.
    pub fn set_relay_muted(&mut self, muted: bool) {
        self.lock_air().set_muted(self.relay_radio_id, muted);
    }

    fn lock_air(&self) -> std::sync::MutexGuard<'_, MockAir> {
        self.air.lock().expect("Failed to lock mock air")
    }

    pub fn driver(&mut self) -> &mut StandDriverSil {
        self.actuator
            .driver
            .as_mut_any()
            .downcast_mut::<StandDriverSil>()
            .expect("Actuator is not driven by the simulated stand")
    }

    /// Wired end owned by the relay; its log holds everything sent to the actuator.
    pub fn relay_wired(&mut self) -> &mut WiredEnd {
        self.relay
            .wired
            .as_mut_any()
            .downcast_mut::<WiredEnd>()
            .expect("Relay is not wired to the simulated cable")
    }

    pub fn actuator_wired(&mut self) -> &mut WiredEnd {
        self.actuator
            .wired
            .as_mut_any()
            .downcast_mut::<WiredEnd>()
            .expect("Actuator is not wired to the simulated cable")
    }
}

/// One line of operator output for an event.
pub fn describe_event(event: &OperatorEvent) -> String {
    match event {
        OperatorEvent::Acknowledged { body, sequence } => format!("ACK #{}: {}", sequence, body),
        OperatorEvent::Dropped { body, sequence } => {
            format!("DROPPED #{}: {} (does not fit in a packet)", sequence, body)
        }
        OperatorEvent::Telemetry(body) => match parse_telemetry_line(body) {
            Some(frame) => match frame.load {
                Some(load) => format!(
                    "TLM fuel {:.2} psi, ox {:.2} psi, load {}",
                    frame.psi_fuel, frame.psi_ox, load
                ),
                None => format!("TLM fuel {:.2} psi, ox {:.2} psi", frame.psi_fuel, frame.psi_ox),
            },
            None => format!("TLM {}", body),
        },
        OperatorEvent::Message(text) => format!("MSG {}", text),
        OperatorEvent::Heartbeat {
            since_last_reception_ms,
        } => match since_last_reception_ms {
            Some(ms) => format!("HBT last packet {:.1} s ago", *ms as f32 / 1000.0),
            None => "HBT nothing received yet".to_string(),
        },
    }
}
