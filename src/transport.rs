//! Byte-at-a-time request/acknowledge driver for the legacy controller.
//!
//! Every transaction pulls the select line low, sends [`TRANSACTION_HEADER`]
//! followed by the command and zero padding, and receives one byte per byte
//! sent. The controller pulses its acknowledge line after every byte except
//! the last one; the low nibble of the second received byte says how long
//! the transaction is.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::error::TransportError;
use crate::legacy::TRANSACTION_HEADER;


/// Settle time (in microseconds) after selecting and before deselecting.
pub const SETTLE_US: u32 = 20;
/// How long (in microseconds) to wait for an acknowledge pulse.
pub const ACK_TIMEOUT_US: u32 = 100;
/// Interval (in microseconds) between acknowledge line checks.
pub const ACK_POLL_US: u32 = 2;


/// A synchronous channel to the legacy controller.
pub trait LegacyLink {
	/// Runs one transaction, writing received bytes into `reply` (extra
	/// bytes are dropped) and returning how many bytes were exchanged.
	fn transact(&mut self, command: &[u8], reply: &mut [u8]) -> Result<usize, TransportError>;
}


/// The acknowledge edge, as seen from the polling side.
pub trait AckSignal {
	/// Forgets any acknowledge seen so far.
	fn clear(&mut self);
	/// Returns `true` if an acknowledge arrived since the last [`AckSignal::clear`].
	fn is_set(&mut self) -> bool;
}


/// Acknowledge flag raised from the edge interrupt and polled by the transport.
pub struct AckFlag {
	raised: AtomicBool,
}

impl AckFlag {
	pub const fn new() -> Self {
		Self { raised: AtomicBool::new(false) }
	}

	/// Called from the acknowledge edge interrupt.
	pub fn raise(&self) {
		self.raised.store(true, Ordering::Release);
	}

	/// Reads and clears the flag in one step.
	pub fn take(&self) -> bool {
		critical_section::with(|_| {
			let raised = self.raised.load(Ordering::Acquire);
			self.raised.store(false, Ordering::Release);
			raised
		})
	}
}

impl Default for AckFlag {
	fn default() -> Self {
		Self::new()
	}
}

impl AckSignal for &AckFlag {
	fn clear(&mut self) {
		self.raised.store(false, Ordering::Release);
	}

	fn is_set(&mut self) -> bool {
		self.raised.load(Ordering::Acquire)
	}
}


/// [`LegacyLink`] over an SPI bus, a select pin, a delay source and an
/// acknowledge signal.
pub struct LegacyTransport<SPI, CS, D, A> {
	spi: SPI,
	select: CS,
	delay: D,
	ack: A,
	reverse_bits: bool,
}

impl<SPI, CS, D, A> LegacyTransport<SPI, CS, D, A>
where
	SPI: SpiBus<u8>,
	CS: OutputPin,
	D: DelayNs,
	A: AckSignal,
{
	pub fn new(spi: SPI, select: CS, delay: D, ack: A) -> Self {
		Self {
			spi,
			select,
			delay,
			ack,
			reverse_bits: false,
		}
	}

	/// Sets whether bytes are bit-reversed on the wire.
	///
	/// The controller shifts data LSB first. Enable this on buses that can
	/// only shift MSB first.
	///
	/// Default is `false`.
	pub fn with_bit_reversal(mut self, reverse_bits: bool) -> Self {
		self.reverse_bits = reverse_bits;
		self
	}

	/// Gives back the peripherals.
	pub fn release(self) -> (SPI, CS, D, A) {
		(self.spi, self.select, self.delay, self.ack)
	}

	fn wire(&self, byte: u8) -> u8 {
		if self.reverse_bits { byte.reverse_bits() } else { byte }
	}

	fn exchange(&mut self, out: u8) -> Result<u8, TransportError> {
		let mut word = [self.wire(out)];
		self.spi
			.transfer_in_place(&mut word)
			.map_err(|_| TransportError::Bus)?;

		Ok(self.wire(word[0]))
	}

	/// Spins until the acknowledge arrives or [`ACK_TIMEOUT_US`] passes.
	fn wait_for_ack(&mut self) -> bool {
		let mut waited = 0;

		while !self.ack.is_set() {
			if waited > ACK_TIMEOUT_US {
				return false;
			}

			self.delay.delay_us(ACK_POLL_US);
			waited += ACK_POLL_US;
		}

		true
	}

	fn exchange_all(&mut self, command: &[u8], reply: &mut [u8]) -> Result<usize, TransportError> {
		let mut index = 0;
		// Only the header and mode bytes are known before byte 1 arrives.
		let mut expected = 2;

		loop {
			self.ack.clear();

			let out = match index {
				0 => TRANSACTION_HEADER,
				// Pad with zeroes once the command runs out.
				i => command.get(i - 1).copied().unwrap_or(0x00),
			};

			let received = self.exchange(out)?;

			if index == 1 {
				expected = usize::from(received & 0x0F) * 2 + 3;
			}

			if let Some(slot) = reply.get_mut(index) {
				*slot = received;
			}

			index += 1;

			// The last byte is never acknowledged.
			if index >= expected {
				return Ok(index);
			}

			if !self.wait_for_ack() {
				return Err(TransportError::AckTimeout { received: index });
			}
		}
	}
}

impl<SPI, CS, D, A> LegacyLink for LegacyTransport<SPI, CS, D, A>
where
	SPI: SpiBus<u8>,
	CS: OutputPin,
	D: DelayNs,
	A: AckSignal,
{
	fn transact(&mut self, command: &[u8], reply: &mut [u8]) -> Result<usize, TransportError> {
		self.select.set_low().map_err(|_| TransportError::Bus)?;

		// The controller needs a moment to notice the select line.
		self.delay.delay_us(SETTLE_US);

		let result = self.exchange_all(command, reply);

		// Even without an acknowledge for the last byte, it needs this before release.
		self.delay.delay_us(SETTLE_US);

		self.select.set_high().map_err(|_| TransportError::Bus)?;

		#[cfg(feature = "defmt")]
		if let Err(error) = result {
			defmt::trace!("Legacy transaction {=[u8]:x} failed: {}", command, error);
		}

		result
	}
}
