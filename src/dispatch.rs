//! Host report reassembly and command handling.
//!
//! Host reports arrive a packet at a time. Once a report is complete it is
//! recorded in the [`CommandHistory`] and handled by ID:
//!
//! | ID     | Meaning                              | Reply                    |
//! |--------|--------------------------------------|--------------------------|
//! | `0x80` | Regular command at byte 1            | `0x81`, sometimes none   |
//! | `0x01` | Rumble at 2..10, sub-command at 10   | `0x21`                   |
//! | `0x10` | Rumble at 2..10                      | None                     |
//! | `0x00` | Input report request                 | `0x30`                   |

use crate::error::{NvramError, Result};
use crate::hid_desc::*;
use crate::history::CommandHistory;
use crate::nvram::{NvStore, VirtualNvram, MAX_READ_LEN};
use crate::rumble::MotorLevels;
use crate::scheduler::ReportScheduler;


/// Regular command: controller info, including the MAC address.
pub const CMD_INFO: u8 = 0x01;
/// Regular command: handshake.
pub const CMD_HANDSHAKE: u8 = 0x02;
/// Regular command: switch to the high baud rate.
pub const CMD_BAUD_RATE: u8 = 0x03;
/// Regular command: resume input reports.
pub const CMD_RESUME_REPORTS: u8 = 0x04;
/// Regular command: suspend input reports.
pub const CMD_SUSPEND_REPORTS: u8 = 0x05;

pub const SUB_PAIRING: u8 = 0x01;
pub const SUB_DEVICE_INFO: u8 = 0x02;
pub const SUB_TRIGGER_ELAPSED: u8 = 0x04;
pub const SUB_NVRAM_READ: u8 = 0x10;
pub const SUB_NVRAM_WRITE: u8 = 0x11;
pub const SUB_MCU_CONFIG: u8 = 0x21;
pub const SUB_ENABLE_RUMBLE: u8 = 0x48;

/// Sub-commands acknowledged without doing anything: no-op, input mode,
/// power state, shipment mode, MCU state, player lights, Home light, IMU
/// enable and IMU sensitivity.
pub const ACCEPTED_SUBCOMMANDS: [u8; 9] = [0x00, 0x03, 0x06, 0x08, 0x22, 0x30, 0x38, 0x40, 0x41];

const ACK_OK: u8 = 0x80;

/// Controller type and MAC address, most significant byte first.
const CONTROLLER_INFO: [u8; 8] = [0x00, 0x03, 0x43, 0x23, 0x53, 0x22, 0xA3, 0xC7];

const DEVICE_INFO: [u8; 12] = [
	0x03, 0x48, // Firmware version
	0x03, // Pro Controller
	0x02,
	0xC7, 0xA3, 0x22, 0x53, 0x23, 0x43, // MAC address
	0x03,
	0x01, // Use colours from NVRAM
];

const MCU_CONFIG: [u8; 8] = [0x01, 0x00, 0xFF, 0x00, 0x08, 0x00, 0x1B, 0x01];

/// Offset of the rumble data in `0x01` and `0x10` reports.
const RUMBLE_OFFSET: usize = 2;
/// Offset of the sub-command in `0x01` reports.
const SUBCOMMAND_OFFSET: usize = 10;
/// Offset of the sub-command arguments.
const ARGS_OFFSET: usize = 11;


/// How the end of a host report is recognised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketFraming {
	/// A report ends on a packet shorter than [`PACKET_SIZE`], or at [`REPORT_SIZE`] bytes.
	#[default]
	ShortPacket,
	/// A report ends at a fixed length for its ID: 2 bytes for `0x00` and
	/// `0x80`, two packets for `0x01` and `0x10`, one packet otherwise.
	FixedLength,
}

impl PacketFraming {
	fn is_complete(self, report_id: u8, accumulated: usize, last_packet: usize) -> bool {
		match self {
			Self::ShortPacket => last_packet < PACKET_SIZE || accumulated >= REPORT_SIZE,
			Self::FixedLength => {
				let length = match report_id {
					INPUT_REQUEST_ID | REGULAR_REQUEST_ID => 2,
					SUBCOMMAND_REQUEST_ID | RUMBLE_REQUEST_ID => 2 * PACKET_SIZE,
					_ => 1,
				};
				accumulated >= length
			}
		}
	}
}


/// Reassembles host reports and acts on them.
pub struct CommandDispatcher {
	buffer: [u8; REPORT_SIZE],
	accumulated: usize,
	framing: PacketFraming,

	history: CommandHistory,
	reports_suspended: bool,
	rumble_enabled: bool,
}

impl CommandDispatcher {
	pub const fn new(framing: PacketFraming) -> Self {
		Self {
			buffer: [0; REPORT_SIZE],
			accumulated: 0,
			framing,
			history: CommandHistory::new(),
			reports_suspended: false,
			rumble_enabled: false,
		}
	}

	pub fn set_framing(&mut self, framing: PacketFraming) {
		self.framing = framing;
	}

	/// Returns `true` if the host asked for input reports to stop.
	pub fn reports_suspended(&self) -> bool {
		self.reports_suspended
	}

	pub fn rumble_enabled(&self) -> bool {
		self.rumble_enabled
	}

	pub fn history(&self) -> &CommandHistory {
		&self.history
	}

	/// Drops a partly received report. Called when the host clears a halt
	/// on the OUT endpoint.
	pub fn on_stall(&mut self) {
		#[cfg(feature = "defmt")]
		if self.accumulated != 0 {
			defmt::warn!("Dropping {} bytes of report {:#04x}", self.accumulated, self.buffer[0]);
		}

		self.accumulated = 0;
	}

	/// Takes one packet from the host, and handles the report once it is complete.
	///
	/// Returns new motor levels when the report changes them.
	pub fn on_packet<S: NvStore>(
		&mut self,
		packet: &[u8],
		scheduler: &mut ReportScheduler,
		nvram: &mut VirtualNvram<S>,
		now: u8,
	) -> Result<Option<MotorLevels>> {
		#[cfg(feature = "defmt")]
		defmt::trace!("OUT {=[u8]:x}", packet);

		// An empty packet only means something as the end of a report.
		if self.accumulated == 0 && packet.is_empty() {
			return Ok(None);
		}

		let end = self.accumulated + packet.len();
		let Some(slot) = self.buffer.get_mut(self.accumulated..end) else {
			#[cfg(feature = "defmt")]
			defmt::warn!("Report {:#04x} overran {} bytes", self.buffer[0], REPORT_SIZE);

			self.accumulated = 0;
			return Ok(None);
		};

		slot.copy_from_slice(packet);
		self.accumulated = end;

		if !self.framing.is_complete(self.buffer[0], end, packet.len()) {
			return Ok(None);
		}

		let mut report = self.buffer;
		report[end..].fill(0);
		self.accumulated = 0;

		self.dispatch(&report, scheduler, nvram, now)
	}

	fn dispatch<S: NvStore>(
		&mut self,
		report: &[u8; REPORT_SIZE],
		scheduler: &mut ReportScheduler,
		nvram: &mut VirtualNvram<S>,
		now: u8,
	) -> Result<Option<MotorLevels>> {
		let report_id = report[0];
		let second = report[1];
		let subcommand = if report_id == SUBCOMMAND_REQUEST_ID { report[SUBCOMMAND_OFFSET] } else { 0 };

		// Recorded first so that a halt while handling it still shows it.
		self.history.record(report_id, second, subcommand);

		match report_id {
			REGULAR_REQUEST_ID => {
				self.regular(second, scheduler)?;
				Ok(None)
			}
			SUBCOMMAND_REQUEST_ID => {
				let mut motors = self.rumble(report);
				self.subcommand(subcommand, report, scheduler, nvram, now)?;

				if subcommand == SUB_ENABLE_RUMBLE && !self.rumble_enabled {
					motors = Some(MotorLevels::default());
				}

				Ok(motors)
			}
			RUMBLE_REQUEST_ID => Ok(self.rumble(report)),
			INPUT_REQUEST_ID => {
				// A pending report already carries fresh input.
				if !scheduler.is_pending() {
					scheduler.prepare_input_report(now)?;
				}
				Ok(None)
			}
			_unknown => {
				#[cfg(feature = "defmt")]
				defmt::warn!("Unexpected report ID {:#04x}", _unknown);

				Ok(None)
			}
		}
	}

	fn regular(&mut self, command: u8, scheduler: &mut ReportScheduler) -> Result<()> {
		#[cfg(feature = "defmt")]
		defmt::debug!("Regular command {:#04x}", command);

		match command {
			CMD_INFO => scheduler.prepare_regular_reply(command, &CONTROLLER_INFO),
			CMD_HANDSHAKE | CMD_BAUD_RATE => scheduler.prepare_regular_reply(command, &[]),
			CMD_RESUME_REPORTS => {
				self.reports_suspended = false;
				Ok(())
			}
			CMD_SUSPEND_REPORTS => {
				self.reports_suspended = true;
				Ok(())
			}
			_ => {
				#[cfg(feature = "defmt")]
				defmt::warn!("Unexpected regular command {:#04x}", command);

				scheduler.prepare_regular_reply(command, &[])
			}
		}
	}

	fn subcommand<S: NvStore>(
		&mut self,
		subcommand: u8,
		report: &[u8; REPORT_SIZE],
		scheduler: &mut ReportScheduler,
		nvram: &mut VirtualNvram<S>,
		now: u8,
	) -> Result<()> {
		#[cfg(feature = "defmt")]
		defmt::debug!("Sub-command {:#04x}", subcommand);

		let args = &report[ARGS_OFFSET..];

		match subcommand {
			SUB_PAIRING => scheduler.prepare_subcommand_reply(now, 0x81, subcommand, &[]),
			SUB_DEVICE_INFO => scheduler.prepare_subcommand_reply(now, 0x82, subcommand, &DEVICE_INFO),
			SUB_TRIGGER_ELAPSED => scheduler.prepare_subcommand_reply(now, 0x83, subcommand, &[]),
			SUB_NVRAM_READ => self.nvram_read(args, scheduler, nvram, now),
			SUB_NVRAM_WRITE => {
				let status = match nvram_write(args, nvram) {
					Ok(()) => 0x00,
					Err(_error) => {
						#[cfg(feature = "defmt")]
						defmt::warn!("NVRAM write failed: {}", _error);

						0x01
					}
				};

				scheduler.prepare_subcommand_reply(now, ACK_OK, subcommand, &[status])
			}
			SUB_ENABLE_RUMBLE => {
				self.rumble_enabled = args[0] != 0;

				#[cfg(feature = "defmt")]
				defmt::info!("Rumble enabled: {}", self.rumble_enabled);

				scheduler.prepare_subcommand_reply(now, 0x82, subcommand, &[])
			}
			SUB_MCU_CONFIG => scheduler.prepare_subcommand_reply(now, 0xA0, subcommand, &MCU_CONFIG),
			_ => {
				#[cfg(feature = "defmt")]
				if !ACCEPTED_SUBCOMMANDS.contains(&subcommand) {
					defmt::warn!("Unexpected sub-command {:#04x}", subcommand);
				}

				// Always acknowledged, or the host stops talking.
				scheduler.prepare_subcommand_reply(now, ACK_OK, subcommand, &[])
			}
		}
	}

	/// Replies with the address, the length and the data. A failed read
	/// echoes the request with no data.
	fn nvram_read<S: NvStore>(
		&mut self,
		args: &[u8],
		scheduler: &mut ReportScheduler,
		nvram: &mut VirtualNvram<S>,
		now: u8,
	) -> Result<()> {
		let address = u32::from_le_bytes([args[0], args[1], args[2], args[3]]);
		let length = usize::from(args[4]);

		let mut payload = [0u8; 5 + MAX_READ_LEN];
		payload[..5].copy_from_slice(&args[..5]);

		let result = match payload.get_mut(5..5 + length) {
			Some(out) => nvram.read(address, out),
			None => Err(NvramError::NotFound { address, length }),
		};

		let reply_len = match result {
			Ok(()) => 5 + length,
			Err(_error) => {
				#[cfg(feature = "defmt")]
				defmt::warn!("NVRAM read failed: {}", _error);

				5
			}
		};

		scheduler.prepare_subcommand_reply(now, 0x90, SUB_NVRAM_READ, &payload[..reply_len])
	}

	/// Decodes the rumble data of a report, if rumble is on.
	fn rumble(&self, report: &[u8; REPORT_SIZE]) -> Option<MotorLevels> {
		if !self.rumble_enabled {
			return None;
		}

		let mut block = [0u8; 8];
		block.copy_from_slice(&report[RUMBLE_OFFSET..RUMBLE_OFFSET + 8]);
		Some(MotorLevels::from_rumble_block(&block))
	}
}

impl Default for CommandDispatcher {
	fn default() -> Self {
		Self::new(PacketFraming::default())
	}
}


/// Arguments: address (4 bytes, little-endian), length, data.
fn nvram_write<S: NvStore>(args: &[u8], nvram: &mut VirtualNvram<S>) -> core::result::Result<(), NvramError> {
	let address = u32::from_le_bytes([args[0], args[1], args[2], args[3]]);
	let length = usize::from(args[4]);

	let data = args
		.get(5..5 + length)
		.ok_or(NvramError::NotFound { address, length })?;

	nvram.write(address, data)
}
