#![cfg_attr(not(any(test, feature = "sil")), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod actuator;
pub mod command;
pub mod ignition_fsm;
pub mod telemetry;

pub use actuator::Actuator;
