use shared::{stand_hal::IgnitionState, ControllerFsm, ControllerState};

use crate::Actuator;

pub mod firing;
pub mod idle;
pub mod settling;

pub enum IgnitionFsm {
    Idle(idle::Idle),
    Settling(settling::Settling),
    Firing(firing::Firing),
}

impl<'a> ControllerFsm<IgnitionFsm, Actuator<'a>, IgnitionState> for IgnitionFsm {
    fn to_controller_state(&mut self) -> &mut dyn ControllerState<IgnitionFsm, Actuator<'a>> {
        match self {
            IgnitionFsm::Idle(state) => state,
            IgnitionFsm::Settling(state) => state,
            IgnitionFsm::Firing(state) => state,
        }
    }

    fn hal_state(&self) -> IgnitionState {
        match self {
            IgnitionFsm::Idle(_) => IgnitionState::Idle,
            IgnitionFsm::Settling(_) => IgnitionState::Settling,
            IgnitionFsm::Firing(_) => IgnitionState::Firing,
        }
    }
}
