use log::info;
use shared::{stand_hal::StandCommand, util::elapsed_ms, ControllerState};

use crate::Actuator;

use super::{firing::Firing, IgnitionFsm};

/// Igniter relay energized, propellant valves still shut.
pub struct Settling {
    entered_at: u32,
    settled: bool,
}

impl<'f> ControllerState<IgnitionFsm, Actuator<'f>> for Settling {
    fn update(
        &mut self,
        actuator: &mut Actuator<'f>,
        now_ms: u32,
        _commands: &[StandCommand],
    ) -> Option<IgnitionFsm> {
        if elapsed_ms(now_ms, self.entered_at) >= actuator.config.ignition.settle_ms {
            self.settled = true;
            return Some(Firing::new(now_ms));
        }

        None
    }

    fn enter_state(&mut self, actuator: &mut Actuator<'f>) {
        info!("Ignition: relay energized, settling");
        actuator.driver.set_igniter_relay(true);
    }

    fn exit_state(&mut self, actuator: &mut Actuator<'f>) {
        if !self.settled {
            info!("Ignition: stopped while settling, relay off");
            actuator.driver.set_igniter_relay(false);
        }
    }
}

impl Settling {
    pub fn new(now_ms: u32) -> IgnitionFsm {
        IgnitionFsm::Settling(Self {
            entered_at: now_ms,
            settled: false,
        })
    }
}
