use shared::{stand_hal::StandCommand, ControllerState};

use crate::Actuator;

use super::{settling::Settling, IgnitionFsm};

pub struct Idle;

impl<'f> ControllerState<IgnitionFsm, Actuator<'f>> for Idle {
    fn update(
        &mut self,
        _actuator: &mut Actuator<'f>,
        now_ms: u32,
        commands: &[StandCommand],
    ) -> Option<IgnitionFsm> {
        if commands.contains(&StandCommand::Ignite) {
            return Some(Settling::new(now_ms));
        }

        None
    }

    fn enter_state(&mut self, _actuator: &mut Actuator<'f>) {
        // Outputs are made safe by whichever state is exited
    }

    fn exit_state(&mut self, _actuator: &mut Actuator<'f>) {
        // Nothing
    }
}

impl Idle {
    pub fn new() -> IgnitionFsm {
        IgnitionFsm::Idle(Self)
    }
}
