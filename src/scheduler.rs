//! Double-buffered outgoing reports.
//!
//! One buffer is filled while the other drains to the host a packet at a
//! time. Input blocks are not captured when a report is built: the report
//! records where the block goes, and the block is captured right before
//! the packet that carries it is handed out.

use crate::emulated::INPUT_BLOCK_LEN;
use crate::error::{BridgeError, Result};
use crate::hid_desc::{INPUT_REPORT_ID, PACKET_SIZE, REGULAR_REPLY_ID, REPORT_SIZE, SUBCOMMAND_REPLY_ID};


#[derive(Clone, Copy, Debug)]
struct OutputReport {
	bytes: [u8; REPORT_SIZE],
	len: usize,
	/// Offset of the input block, 0 if there is none.
	input_position: usize,
}

impl OutputReport {
	const EMPTY: Self = Self {
		bytes: [0; REPORT_SIZE],
		len: 0,
		input_position: 0,
	};
}


/// Appends to the report being filled.
pub struct ReportWriter<'a> {
	report: &'a mut OutputReport,
}

impl ReportWriter<'_> {
	pub fn push(&mut self, byte: u8) -> Result<()> {
		self.extend(&[byte])
	}

	pub fn extend(&mut self, bytes: &[u8]) -> Result<()> {
		let start = self.report.len;
		let end = start + bytes.len();

		let slot = self
			.report
			.bytes
			.get_mut(start..end)
			.ok_or(BridgeError::ReportTooLarge { length: end })?;

		slot.copy_from_slice(bytes);
		self.report.len = end;
		Ok(())
	}

	/// Leaves room for an input block, captured when the report is sent.
	pub fn reserve_input(&mut self) -> Result<()> {
		let position = self.report.len;
		self.extend(&[0; INPUT_BLOCK_LEN])?;
		self.report.input_position = position;
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.report.len
	}

	pub fn is_empty(&self) -> bool {
		self.report.len == 0
	}
}


/// Up to one packet of an outgoing report. An empty packet ends a report
/// whose length is a multiple of the packet size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
	bytes: [u8; PACKET_SIZE],
	len: usize,
}

impl Packet {
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes[..self.len]
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns `true` if this packet ends its report.
	pub fn is_last(&self) -> bool {
		self.len < PACKET_SIZE
	}
}


#[derive(Clone, Copy, Debug)]
struct InFlight {
	index: usize,
	cursor: usize,
}


pub struct ReportScheduler {
	reports: [OutputReport; 2],
	/// The buffer the next report is built in.
	current: usize,
	/// The current buffer holds a finished report waiting to be sent.
	pending: bool,
	in_flight: Option<InFlight>,
	reports_sent: u32,
}

impl ReportScheduler {
	pub const fn new() -> Self {
		Self {
			reports: [OutputReport::EMPTY; 2],
			current: 0,
			pending: false,
			in_flight: None,
			reports_sent: 0,
		}
	}

	/// Returns `true` if a finished report is waiting to be sent.
	pub fn is_pending(&self) -> bool {
		self.pending
	}

	/// Returns `true` while a report is partway through transmission.
	pub fn is_transmitting(&self) -> bool {
		self.in_flight.is_some()
	}

	/// Number of reports sent in full.
	pub fn reports_sent(&self) -> u32 {
		self.reports_sent
	}

	/// Builds the next report in the current buffer.
	///
	/// Note: fails without touching either buffer if a report is already
	/// pending or the current buffer is still being sent.
	pub fn fill<F>(&mut self, build: F) -> Result<()>
	where
		F: FnOnce(&mut ReportWriter<'_>) -> Result<()>,
	{
		if self.pending {
			return Err(BridgeError::ReportClash);
		}

		if self.in_flight.is_some_and(|flight| flight.index == self.current) {
			return Err(BridgeError::BufferInFlight);
		}

		let report = &mut self.reports[self.current];
		report.len = 0;
		report.input_position = 0;

		if let Err(error) = build(&mut ReportWriter { report: &mut *report }) {
			report.len = 0;
			report.input_position = 0;
			return Err(error);
		}

		self.pending = true;
		Ok(())
	}

	/// A plain input report.
	pub fn prepare_input_report(&mut self, now: u8) -> Result<()> {
		self.fill(|writer| {
			writer.extend(&[INPUT_REPORT_ID, now])?;
			writer.reserve_input()
		})
	}

	/// A reply to a regular command: its ID, then the payload.
	pub fn prepare_regular_reply(&mut self, command: u8, payload: &[u8]) -> Result<()> {
		self.fill(|writer| {
			writer.extend(&[REGULAR_REPLY_ID, command])?;
			writer.extend(payload)
		})
	}

	/// A reply to a sub-command: an input block, the ack byte, the
	/// sub-command and the payload (a single zero when there is none).
	pub fn prepare_subcommand_reply(&mut self, now: u8, ack: u8, subcommand: u8, payload: &[u8]) -> Result<()> {
		self.fill(|writer| {
			writer.extend(&[SUBCOMMAND_REPLY_ID, now])?;
			writer.reserve_input()?;
			writer.extend(&[ack, subcommand])?;

			if payload.is_empty() {
				writer.push(0x00)
			} else {
				writer.extend(payload)
			}
		})
	}

	/// Hands out the next packet, when the transport is ready for one.
	///
	/// If nothing is being sent and nothing is pending, an input report is
	/// made first (unless `suspended`). `capture` fills the input block of
	/// the report being sent, right before the packet carrying it.
	pub fn next_packet<F>(&mut self, suspended: bool, now: u8, capture: F) -> Result<Option<Packet>>
	where
		F: FnOnce(&mut [u8; INPUT_BLOCK_LEN]),
	{
		let mut flight = match self.in_flight {
			Some(flight) => flight,
			None => {
				if !self.pending && !suspended {
					self.prepare_input_report(now)?;
				}

				if !self.pending {
					return Ok(None);
				}

				// Replies to commands that arrive now go to the other buffer.
				let flight = InFlight { index: self.current, cursor: 0 };
				self.current = (self.current + 1) % 2;
				self.pending = false;
				flight
			}
		};

		let report = &mut self.reports[flight.index];
		let size = report.len.saturating_sub(flight.cursor).min(PACKET_SIZE);
		let next = flight.cursor + size;

		let position = report.input_position;
		if position != 0 && (flight.cursor..next).contains(&position) {
			if let Some(slot) = report
				.bytes
				.get_mut(position..position + INPUT_BLOCK_LEN)
				.and_then(|slot| <&mut [u8; INPUT_BLOCK_LEN]>::try_from(slot).ok())
			{
				capture(slot);
			}
		}

		let mut packet = Packet { bytes: [0; PACKET_SIZE], len: size };
		packet.bytes[..size].copy_from_slice(&report.bytes[flight.cursor..next]);
		flight.cursor = next;

		if size < PACKET_SIZE || next == REPORT_SIZE {
			report.len = 0;
			report.input_position = 0;
			self.in_flight = None;
			self.reports_sent = self.reports_sent.wrapping_add(1);
		} else {
			self.in_flight = Some(flight);
		}

		#[cfg(feature = "defmt")]
		defmt::trace!("IN {=[u8]:x}", packet.as_bytes());

		Ok(Some(packet))
	}
}

impl Default for ReportScheduler {
	fn default() -> Self {
		Self::new()
	}
}
