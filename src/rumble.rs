//! Rumble waveform decoding and legacy motor drive.
//!
//! Each encoded rumble state is four bytes. The top two bits of the last byte
//! (and, for one of them, the low two bits of the first byte) select one of
//! several layouts. The layouts are defined LSB first over the bit-reversed,
//! byte-reversed input, so [`decode`] un-reverses the whole word once and
//! every field is then read from its natural bit offset.


/// 4-bit amplitude codes to amplitude. Codes 12 and above are silent.
const AMPLITUDE_4BIT: [u8; 16] = [0, 255, 181, 130, 92, 67, 47, 32, 24, 16, 12, 9, 0, 0, 0, 0];

/// Value for the legacy small motor when it should spin.
pub const SMALL_MOTOR_ON: u8 = 0xFF;


/// The layout selected by an encoded rumble state's tag bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RumbleKind {
	SingleWave,
	DualWave,
	Silent,
	DualResonance3Pulse,
	DualResonance4Pulse,
	Unrecognized,
}

impl RumbleKind {
	pub fn of(raw: &[u8; 4]) -> Self {
		match raw[3] >> 6 {
			0b00 | 0b10 => Self::SingleWave,
			0b01 => match raw[0] & 0b11 {
				0b00 => Self::DualWave,
				0b01 => Self::Silent,
				0b10 => Self::DualResonance3Pulse,
				_ => Self::Unrecognized,
			},
			_ => Self::DualResonance4Pulse,
		}
	}
}


/// Decoded amplitudes of one encoded rumble state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RumbleState {
	pub low: u8,
	pub high: u8,
	pub pulses: [u8; 4],
}

impl RumbleState {
	/// The strongest of the low channel and all pulses.
	pub fn low_line(&self) -> u8 {
		self.pulses.iter().copied().fold(self.low, u8::max)
	}

	/// The strongest of the high channel and all pulses.
	pub fn high_line(&self) -> u8 {
		self.pulses.iter().copied().fold(self.high, u8::max)
	}
}


/// The natural-order view of an encoded rumble state.
#[derive(Clone, Copy)]
struct Fields(u32);

impl Fields {
	fn get(self, offset: u32, width: u32) -> u8 {
		((self.0 >> offset) & ((1 << width) - 1)) as u8
	}

	/// A switch bit is set when its field is off.
	fn on(self, offset: u32) -> bool {
		self.get(offset, 1) == 0
	}

	fn amp4(self, offset: u32) -> u8 {
		AMPLITUDE_4BIT[usize::from(self.get(offset, 4))]
	}

	/// 7-bit amplitudes follow a curve; doubling is close enough for the motors.
	fn amp7(self, offset: u32) -> u8 {
		self.get(offset, 7) << 1
	}
}


/// Decodes one encoded rumble state. Unrecognized layouts decode to silence.
pub fn decode(raw: &[u8; 4]) -> RumbleState {
	let fields = Fields(u32::from_le_bytes(*raw).reverse_bits());
	let mut state = RumbleState::default();

	match RumbleKind::of(raw) {
		RumbleKind::SingleWave => {
			let high_selected = fields.get(24, 1) == 1;
			let frequency = fields.get(25, 4);

			if fields.on(19) && high_selected && frequency != 0 {
				state.high = fields.amp4(20);
			}
			if fields.on(14) && !high_selected && frequency != 0 {
				state.low = fields.amp4(15);
			}
			if fields.on(9) {
				state.pulses[0] = fields.amp4(10);
			}
			state.pulses[1] = fields.amp7(2);
		}
		RumbleKind::DualWave => {
			state.low = fields.amp7(2);
			state.high = fields.amp7(16);
		}
		RumbleKind::DualResonance3Pulse => {
			if fields.on(24) {
				state.high = fields.amp4(25);
			}
			if fields.on(19) {
				state.low = fields.amp4(20);
			}
			if fields.on(14) {
				state.pulses[0] = fields.amp4(15);
			}
			if fields.on(9) {
				state.pulses[1] = fields.amp4(10);
			}
			state.pulses[2] = fields.amp7(2);
		}
		RumbleKind::DualResonance4Pulse => {
			// The first pulse doubles as a 400Hz high channel when the high channel is off.
			if fields.on(27) {
				state.high = fields.amp4(28);
				if fields.on(17) {
					state.pulses[0] = fields.amp4(18);
				}
			} else if fields.on(17) {
				state.high = fields.amp4(18);
			}
			if fields.on(22) {
				state.low = fields.amp4(23);
			}
			if fields.on(12) {
				state.pulses[1] = fields.amp4(13);
			}
			if fields.on(7) {
				state.pulses[2] = fields.amp4(8);
			}
			if fields.on(2) {
				state.pulses[3] = fields.amp4(3);
			}
		}
		RumbleKind::Silent | RumbleKind::Unrecognized => {}
	}

	state
}


/// Target amplitudes for the two legacy motors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorLevels {
	/// Drives the large, variable-speed motor.
	pub low: u8,
	/// Approximated on the small, on/off motor.
	pub high: u8,
}

impl MotorLevels {
	/// Decodes both encoded states of a rumble block (left then right) and
	/// keeps the strongest of each line.
	pub fn from_rumble_block(block: &[u8; 8]) -> Self {
		let mut levels = Self::default();

		for side in block.chunks_exact(4) {
			let mut raw = [0u8; 4];
			raw.copy_from_slice(side);
			let state = decode(&raw);

			levels.low = levels.low.max(state.low_line());
			levels.high = levels.high.max(state.high_line());
		}

		levels
	}
}


/// Turns [`MotorLevels`] into the two motor bytes of each poll.
#[derive(Clone, Copy, Debug, Default)]
pub struct MotorDrive {
	levels: MotorLevels,
	counter: u8,
}

impl MotorDrive {
	pub const fn new() -> Self {
		Self {
			levels: MotorLevels { low: 0, high: 0 },
			counter: 0,
		}
	}

	pub fn set_levels(&mut self, levels: MotorLevels) {
		self.levels = levels;
	}

	pub fn levels(&self) -> MotorLevels {
		self.levels
	}

	pub fn stop(&mut self) {
		self.levels = MotorLevels::default();
	}

	/// Returns `(small, large)` for the next poll.
	///
	/// The small motor is on for one poll out of every `ceil(15 / (high >> 4))`.
	pub fn next_poll(&mut self) -> (u8, u8) {
		let step = self.levels.high >> 4;
		let small = if step == 0 {
			0x00
		} else {
			let period = 15u8.div_ceil(step);
			if self.counter % period == 0 { SMALL_MOTOR_ON } else { 0x00 }
		};

		self.counter = self.counter.wrapping_add(1);

		(small, self.levels.low)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	/// Builds the wire bytes for a natural-order field word.
	fn encode(fields: u32) -> [u8; 4] {
		fields.reverse_bits().to_le_bytes()
	}

	#[test]
	fn tags_select_layouts() {
		assert_eq!(RumbleKind::of(&[0x00, 0, 0, 0x00]), RumbleKind::SingleWave);
		assert_eq!(RumbleKind::of(&[0x00, 0, 0, 0x80]), RumbleKind::SingleWave);
		assert_eq!(RumbleKind::of(&[0x00, 0, 0, 0x40]), RumbleKind::DualWave);
		assert_eq!(RumbleKind::of(&[0x01, 0, 0, 0x40]), RumbleKind::Silent);
		assert_eq!(RumbleKind::of(&[0x02, 0, 0, 0x40]), RumbleKind::DualResonance3Pulse);
		assert_eq!(RumbleKind::of(&[0x03, 0, 0, 0x40]), RumbleKind::Unrecognized);
		assert_eq!(RumbleKind::of(&[0x00, 0, 0, 0xC0]), RumbleKind::DualResonance4Pulse);
	}

	#[test]
	fn silent_and_unrecognized_decode_to_zero() {
		assert_eq!(decode(&[0x01, 0x12, 0x34, 0x40]), RumbleState::default());
		assert_eq!(decode(&[0x03, 0xFF, 0xFF, 0x7F]), RumbleState::default());
	}

	#[test]
	fn un_reversing_matches_field_order() {
		// Type bits sit at the top of the last wire byte.
		assert_eq!(encode(0b10), [0x00, 0x00, 0x00, 0x40]);
	}

	#[test]
	fn dual_wave_doubles_seven_bit_amplitudes() {
		// Type 0b10 (wire 01), low amplitude 0x40, high amplitude 0x7F.
		let fields = 0b10 | 0x40 << 2 | 0x7F << 16;
		let state = decode(&encode(fields));

		assert_eq!(state.low, 0x80);
		assert_eq!(state.high, 0xFE);
		assert_eq!(state.pulses, [0; 4]);
	}

	#[test]
	fn single_wave_honours_switch_bits() {
		// High selected with a frequency, high amplitude code 1, pulse 1 switched off.
		let fields = 1 << 24 | 0x3 << 25 | 0x1 << 20 | 1 << 9 | 0x2 << 10 | 0x10 << 2;
		let state = decode(&encode(fields));

		assert_eq!(state.high, 255);
		assert_eq!(state.low, 0);
		assert_eq!(state.pulses, [0, 0x20, 0, 0]);
	}

	#[test]
	fn four_pulse_keeps_pulses_apart() {
		let fields = 0b11 | 0x2 << 3 | 0x3 << 8 | 0x4 << 13 | 1 << 17 | 0x5 << 23 | 1 << 27;
		let state = decode(&encode(fields));

		assert_eq!(state.high, 0);
		assert_eq!(state.low, 67);
		assert_eq!(state.pulses, [0, 92, 130, 181]);
	}

	#[test]
	fn four_pulse_first_pulse_becomes_high_channel() {
		let fields = 0b11 | 1 << 2 | 1 << 7 | 1 << 12 | 0x1 << 18 | 1 << 22 | 1 << 27;
		let state = decode(&encode(fields));

		assert_eq!(state.high, 255);
		assert_eq!(state.pulses, [0; 4]);
	}

	#[test]
	fn lines_take_the_strongest_source() {
		let state = RumbleState { low: 10, high: 20, pulses: [0, 30, 5, 0] };
		assert_eq!(state.low_line(), 30);
		assert_eq!(state.high_line(), 30);
	}

	#[test]
	fn block_combines_both_sides() {
		let left = encode(0b10 | 0x20 << 2);
		let right = encode(0b10 | 0x30 << 16);
		let mut block = [0u8; 8];
		block[..4].copy_from_slice(&left);
		block[4..].copy_from_slice(&right);

		assert_eq!(MotorLevels::from_rumble_block(&block), MotorLevels { low: 0x40, high: 0x60 });
	}

	#[test]
	fn small_motor_duty_cycle() {
		let mut drive = MotorDrive::new();
		drive.set_levels(MotorLevels { low: 0x33, high: 0x50 });

		// 0x50 >> 4 = 5, so one poll in three.
		let polls: std::vec::Vec<(u8, u8)> = (0..6).map(|_| drive.next_poll()).collect();
		assert_eq!(
			polls,
			[(0xFF, 0x33), (0, 0x33), (0, 0x33), (0xFF, 0x33), (0, 0x33), (0, 0x33)],
		);

		drive.set_levels(MotorLevels { low: 0, high: 0x0F });
		assert_eq!(drive.next_poll(), (0, 0));

		drive.set_levels(MotorLevels { low: 0, high: 0xFF });
		for _ in 0..4 {
			assert_eq!(drive.next_poll(), (SMALL_MOTOR_ON, 0));
		}
	}
}
