#![cfg_attr(not(any(test, feature = "sil")), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod relay;

pub use relay::{RadioRelay, RelayConfig};
