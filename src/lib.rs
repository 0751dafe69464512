//! Makes a PlayStation-style analog gamepad show up as a Switch Pro
//! Controller.
//!
//! The library holds the whole bridge and talks to hardware only through
//! `embedded-hal` traits and the small traits in [`transport`] and
//! [`nvram`]. The RP2040 firmware in `main.rs` wires it to SPI, GPIO and
//! the USB device stack.

#![cfg_attr(not(test), no_std)]

pub mod bridge;
pub mod controller;
pub mod dispatch;
pub mod emulated;
pub mod error;
pub mod hid_desc;
pub mod history;
pub mod legacy;
pub mod nvram;
pub mod rumble;
pub mod scheduler;
pub mod translate;
pub mod transport;

pub use crate::bridge::*;
pub use crate::controller::*;
pub use crate::error::*;
pub use crate::hid_desc::*;
pub use crate::transport::*;
