use log::{debug, error, info, warn};
use shared::{
    comms_hal::{telemetry_line, WiredLink, COMMAND_PREFIX},
    stand_hal::{
        IgnitionState, PressureChannel, StandCommand, StandConfig, StandDriver, TelemetryFrame,
        ValveId, ValvePosition, NUM_VALVES,
    },
    util::elapsed_ms,
    ControllerEntity,
};
use strum::IntoEnumIterator;

use crate::{
    command::decode_command,
    ignition_fsm::{self, IgnitionFsm},
    telemetry::TelemetryAccumulator,
};

pub struct Actuator<'a> {
    pub config: StandConfig,
    pub driver: &'a mut dyn StandDriver,
    pub wired: &'a mut dyn WiredLink,
    pub ignition: Option<ControllerEntity<IgnitionFsm, Actuator<'a>, IgnitionState>>,

    pub(crate) firing_started_at: Option<u32>,
    valves: [ValvePosition; NUM_VALVES],
    last_actuated_at: [Option<u32>; NUM_VALVES],
    tare_offsets_psi: [f64; 2],
    telemetry: TelemetryAccumulator,

    pub last_telemetry_frame: Option<TelemetryFrame>,
}

impl<'a> Actuator<'a> {
    pub fn new(
        config: StandConfig,
        driver: &'a mut dyn StandDriver,
        wired: &'a mut dyn WiredLink,
    ) -> Self {
        let now_ms = driver.timestamp_ms();
        driver.set_igniter_relay(false);

        let mut actuator = Self {
            telemetry: TelemetryAccumulator::new(config.telemetry_interval_ms, now_ms),
            config,
            driver,
            wired,
            ignition: None,
            firing_started_at: None,
            valves: [ValvePosition::Neutral; NUM_VALVES],
            last_actuated_at: [None; NUM_VALVES],
            tare_offsets_psi: [0.0; 2],
            last_telemetry_frame: None,
        };

        actuator.ignition = Some(ControllerEntity::new(
            &mut actuator,
            ignition_fsm::idle::Idle::new(),
        ));

        actuator
    }

    /// Averages `tare_samples` readings per channel with the stand at rest. Later
    /// samples are reported relative to that offset.
    pub fn tare_pressure_sensors(&mut self) {
        let samples = self.config.tare_samples;

        for channel in PressureChannel::iter() {
            let offset = if samples == 0 {
                0.0
            } else {
                let sum: f64 = (0..samples)
                    .map(|_| self.driver.read_pressure(channel) as f64)
                    .sum();

                sum / samples as f64
            };

            self.tare_offsets_psi[channel as usize] = offset;
        }

        info!(
            "Tared pressure sensors: fuel {:.3} psi, oxidizer {:.3} psi",
            self.tare_offsets_psi[0], self.tare_offsets_psi[1]
        );
    }

    /// One control loop iteration: at most one wired command, the ignition checks,
    /// telemetry, then servo release.
    pub fn update(&mut self) {
        let now_ms = self.driver.timestamp_ms();

        if let Some(line) = self.wired.read_line() {
            self.handle_line(&line, now_ms);
        }

        self.update_ignition(now_ms, &[]);
        self.update_telemetry(now_ms);
        self.release_idle_servos(now_ms);
    }

    fn handle_line(&mut self, line: &str, now_ms: u32) {
        let line = line.trim();

        if !line.starts_with(COMMAND_PREFIX) {
            debug!("Ignoring wired line '{}'", line);
            return;
        }

        match decode_command(line) {
            Ok(command) => self.apply_command(command, now_ms),
            Err(err) => error!("Rejected command '{}': {:?}", line, err),
        }
    }

    pub fn apply_command(&mut self, command: StandCommand, now_ms: u32) {
        match command {
            StandCommand::Ignite => self.ignition_start(now_ms),
            StandCommand::OpenAll => self.open_all(),
            StandCommand::CloseAll => self.close_all(),
            StandCommand::SetValve { valve, position } => self.set_valve(valve, position),
        }
    }

    pub fn set_valve(&mut self, valve: ValveId, position: ValvePosition) {
        let angle = self.config.calibration(valve).angle(position);

        self.driver.set_servo_angle(valve, angle);
        self.valves[valve.index()] = position;
        self.last_actuated_at[valve.index()] = Some(self.driver.timestamp_ms());

        info!("Valve V{} {:?} ({} deg)", valve.number(), position, angle);
    }

    pub fn open_all(&mut self) {
        for valve in ValveId::iter() {
            self.set_valve(valve, ValvePosition::Open);
        }
    }

    /// Closes every valve. Ignition state and the relay are left alone.
    pub fn close_all(&mut self) {
        for valve in ValveId::iter() {
            self.set_valve(valve, ValvePosition::Closed);
        }
    }

    pub fn ignition_start(&mut self, now_ms: u32) {
        if self.ignition_state() != IgnitionState::Idle {
            info!("Ignoring IGN while {:?}", self.ignition_state());
            return;
        }

        self.update_ignition(now_ms, &[StandCommand::Ignite]);
    }

    /// Aborts a settle or burn, running the shutdown side effects of the current state.
    pub fn ignition_stop(&mut self) {
        if self.ignition_state() == IgnitionState::Idle {
            return;
        }

        warn!("Ignition stopped while {:?}", self.ignition_state());

        if let Some(mut ignition) = self.ignition.take() {
            ignition.transition(self, ignition_fsm::idle::Idle::new());
            self.ignition = Some(ignition);
        }
    }

    fn update_ignition(&mut self, now_ms: u32, commands: &[StandCommand]) {
        if let Some(mut ignition) = self.ignition.take() {
            ignition.update(self, now_ms, commands);
            self.ignition = Some(ignition);
        }
    }

    fn update_telemetry(&mut self, now_ms: u32) {
        let fuel_psi = self.read_tared_pressure(PressureChannel::Fuel);
        let ox_psi = self.read_tared_pressure(PressureChannel::Oxidizer);
        self.telemetry.add_sample(fuel_psi, ox_psi);

        let driver = &mut self.driver;

        if let Some(frame) = self.telemetry.poll_report(now_ms, || driver.read_weight()) {
            match telemetry_line(&frame) {
                Some(line) => self.wired.write_line(&line),
                None => error!("Failed to serialize telemetry frame {:?}", frame),
            }

            self.last_telemetry_frame = Some(frame);
        }
    }

    fn read_tared_pressure(&mut self, channel: PressureChannel) -> f64 {
        self.driver.read_pressure(channel) as f64 - self.tare_offsets_psi[channel as usize]
    }

    fn release_idle_servos(&mut self, now_ms: u32) {
        let Some(release_ms) = self.config.servo_release_ms else {
            return;
        };

        for valve in ValveId::iter() {
            if let Some(actuated_at) = self.last_actuated_at[valve.index()] {
                if elapsed_ms(now_ms, actuated_at) >= release_ms {
                    self.driver.release_servo(valve);
                    self.last_actuated_at[valve.index()] = None;
                }
            }
        }
    }

    pub fn ignition_state(&self) -> IgnitionState {
        self.ignition
            .as_ref()
            .map(|fsm| fsm.hal_state())
            .unwrap_or(IgnitionState::Idle)
    }

    pub fn firing_started_at(&self) -> Option<u32> {
        self.firing_started_at
    }

    pub fn valve_position(&self, valve: ValveId) -> ValvePosition {
        self.valves[valve.index()]
    }

    pub fn tare_offset(&self, channel: PressureChannel) -> f64 {
        self.tare_offsets_psi[channel as usize]
    }
}
