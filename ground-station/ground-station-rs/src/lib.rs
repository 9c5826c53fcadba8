#![cfg_attr(not(any(test, feature = "sil")), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod ground_station;

pub use ground_station::{GroundStation, GroundStationConfig, OperatorEvent, SubmitError};
