//! Shared fakes for the integration tests.
//!
//! [`FakePad`] stands in for the legacy controller at the transaction level.
//! The bus-level fakes drive a real `LegacyTransport`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use pico_psx_procon::legacy::*;
use pico_psx_procon::nvram::{RamStore, USER_CALIBRATION_LEN};
use pico_psx_procon::scheduler::Packet;
use pico_psx_procon::{AckSignal, Bridge, BridgeError, BridgeOptions, LegacyLink, TransportError};
use pico_psx_procon::{PACKET_SIZE, REPORT_SIZE};


pub const CONFIG_ACK: [u8; 9] = [0xFF, 0xF3, 0x5A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

pub type Store = RamStore<USER_CALIBRATION_LEN>;


/// A legacy controller that follows the config commands it is sent.
#[derive(Debug)]
pub struct FakePad {
	pub analog: bool,
	pub in_config: bool,
	/// Active-low, like the wire.
	pub buttons: u16,
	pub left: (u8, u8),
	pub right: (u8, u8),
	/// Transactions still to fail.
	pub failures: usize,
	pub commands: Vec<Vec<u8>>,
	/// `(small, large)` motor bytes of each poll.
	pub motors: Vec<(u8, u8)>,
}

impl FakePad {
	pub fn analog() -> Self {
		Self {
			analog: true,
			in_config: false,
			buttons: 0xFFFF,
			left: (STICK_CENTER, STICK_CENTER),
			right: (STICK_CENTER, STICK_CENTER),
			failures: 0,
			commands: Vec::new(),
			motors: Vec::new(),
		}
	}

	pub fn digital() -> Self {
		Self { analog: false, ..Self::analog() }
	}

	pub fn press(&mut self, button: LegacyButton) -> &mut Self {
		self.buttons &= !(1 << button as u16);
		self
	}

	fn reply(&mut self, command: &[u8]) -> Vec<u8> {
		let argument = command.get(2).copied().unwrap_or(0);

		match command[0] {
			CMD_CONFIG if self.in_config || argument == 0x01 => {
				self.in_config = argument == 0x01;
				CONFIG_ACK.to_vec()
			}
			CMD_SET_MODE | CMD_MAP_MOTORS if self.in_config => {
				if command[0] == CMD_SET_MODE {
					self.analog = argument == 0x01;
				}
				CONFIG_ACK.to_vec()
			}
			_ if self.in_config => CONFIG_ACK.to_vec(),
			CMD_POLL => {
				self.motors.push((command[2], command[3]));

				if self.analog {
					LegacyReport::analog(self.buttons, self.left, self.right).as_bytes().to_vec()
				} else {
					let [low, high] = self.buttons.to_le_bytes();
					vec![0xFF, 0x41, 0x5A, low, high]
				}
			}
			// Config commands outside config mode are answered like polls.
			_ => vec![0xFF, 0x41, 0x5A, 0xFF, 0xFF],
		}
	}
}

impl LegacyLink for FakePad {
	fn transact(&mut self, command: &[u8], reply: &mut [u8]) -> Result<usize, TransportError> {
		self.commands.push(command.to_vec());

		if self.failures > 0 {
			self.failures -= 1;
			return Err(TransportError::AckTimeout { received: 3 });
		}

		let bytes = self.reply(command);
		for (slot, byte) in reply.iter_mut().zip(&bytes) {
			*slot = *byte;
		}
		Ok(bytes.len())
	}
}


pub fn bridge(pad: FakePad) -> Bridge<FakePad, Store> {
	Bridge::new(pad, Store::new(), &BridgeOptions::default())
}

/// Sends a host report the way the USB stack splits it.
pub fn send<L: LegacyLink>(bridge: &mut Bridge<L, Store>, report: &[u8]) -> Result<(), BridgeError> {
	for packet in report.chunks(PACKET_SIZE) {
		bridge.on_packet(packet)?;
	}
	if report.len() % PACKET_SIZE == 0 && report.len() < REPORT_SIZE {
		bridge.on_packet(&[])?;
	}
	Ok(())
}

/// Builds a sub-command report: sequence, no rumble, sub-command, arguments.
pub fn subcommand(sequence: u8, subcommand: u8, args: &[u8]) -> Vec<u8> {
	let mut report = vec![0u8; 49];
	report[0] = 0x01;
	report[1] = sequence;
	report[10] = subcommand;
	report[11..11 + args.len()].copy_from_slice(args);
	report
}

/// Collects the next outgoing report, if any.
pub fn receive<L: LegacyLink>(bridge: &mut Bridge<L, Store>) -> Option<Vec<u8>> {
	let mut report = Vec::new();

	loop {
		let packet: Packet = bridge.on_transmit_ready().unwrap()?;
		report.extend_from_slice(packet.as_bytes());

		if packet.is_last() || report.len() == REPORT_SIZE {
			return Some(report);
		}
	}
}


/// Replies from a queue of bytes, then idles high.
#[derive(Default)]
pub struct ScriptedSpi {
	pub replies: VecDeque<u8>,
	pub sent: Vec<u8>,
}

impl ScriptedSpi {
	pub fn queue(&mut self, bytes: &[u8]) {
		self.replies.extend(bytes);
	}
}

impl embedded_hal::spi::ErrorType for ScriptedSpi {
	type Error = Infallible;
}

impl SpiBus<u8> for ScriptedSpi {
	fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
		for word in words {
			*word = self.replies.pop_front().unwrap_or(0xFF);
		}
		Ok(())
	}

	fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
		self.sent.extend_from_slice(words);
		Ok(())
	}

	fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
		self.write(write)?;
		self.read(read)
	}

	fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
		self.sent.extend_from_slice(words);
		self.read(words)
	}

	fn flush(&mut self) -> Result<(), Infallible> {
		Ok(())
	}
}


#[derive(Default)]
pub struct RecordingPin {
	pub levels: Vec<bool>,
}

impl embedded_hal::digital::ErrorType for RecordingPin {
	type Error = Infallible;
}

impl OutputPin for RecordingPin {
	fn set_low(&mut self) -> Result<(), Infallible> {
		self.levels.push(false);
		Ok(())
	}

	fn set_high(&mut self) -> Result<(), Infallible> {
		self.levels.push(true);
		Ok(())
	}
}


pub struct NoDelay;

impl DelayNs for NoDelay {
	fn delay_ns(&mut self, _ns: u32) {}
}


/// An acknowledge line that always answers, or never does.
pub struct ScriptedAck {
	pub answering: bool,
}

impl AckSignal for ScriptedAck {
	fn clear(&mut self) {}

	fn is_set(&mut self) -> bool {
		self.answering
	}
}
