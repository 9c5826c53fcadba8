use log::{info, warn};
use shared::{
    stand_hal::{StandCommand, ValveId, ValvePosition},
    util::elapsed_ms,
    ControllerState,
};

use crate::Actuator;

use super::{idle::Idle, IgnitionFsm};

pub struct Firing {
    started_at: u32,
}

impl<'f> ControllerState<IgnitionFsm, Actuator<'f>> for Firing {
    fn update(
        &mut self,
        actuator: &mut Actuator<'f>,
        now_ms: u32,
        _commands: &[StandCommand],
    ) -> Option<IgnitionFsm> {
        if self.firing_ended(actuator, now_ms) {
            warn!(
                "Ignition: fire cutoff after {} ms",
                elapsed_ms(now_ms, self.started_at)
            );
            return Some(Idle::new());
        }

        None
    }

    fn enter_state(&mut self, actuator: &mut Actuator<'f>) {
        info!("Ignition: firing, opening fuel and oxidizer");
        actuator.firing_started_at = Some(self.started_at);
        actuator.set_valve(ValveId::Fuel, ValvePosition::Open);
        actuator.set_valve(ValveId::Oxidizer, ValvePosition::Open);
    }

    fn exit_state(&mut self, actuator: &mut Actuator<'f>) {
        info!("Ignition: shutdown, closing fuel and oxidizer");
        actuator.set_valve(ValveId::Fuel, ValvePosition::Closed);
        actuator.set_valve(ValveId::Oxidizer, ValvePosition::Closed);
        actuator.driver.set_igniter_relay(false);
        actuator.firing_started_at = None;
    }
}

impl Firing {
    pub fn new(now_ms: u32) -> IgnitionFsm {
        IgnitionFsm::Firing(Self { started_at: now_ms })
    }

    fn firing_ended(&self, actuator: &Actuator, now_ms: u32) -> bool {
        elapsed_ms(now_ms, self.started_at) >= actuator.config.ignition.fire_duration_ms
    }
}
