#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod interface;
pub mod mailbox;
pub mod radio_link;
pub mod serdes;

pub use mailbox::Mailbox;
pub use radio_link::{LinkStats, RadioLink, RadioLinkError};
