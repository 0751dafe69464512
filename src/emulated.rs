//! The emulated controller's 11-byte input block.
//!
//! | Byte  | Contents                                                  |
//! |-------|-----------------------------------------------------------|
//! | 0     | Battery level (high nibble), connection info (low nibble) |
//! | 1     | Y, X, B, A, SR, SL, R, ZR (bit 0 first)                   |
//! | 2     | Minus, Plus, R-stick, L-stick, Home, Capture, -, Grip     |
//! | 3     | Down, Up, Right, Left, SR, SL, L, ZL (bit 0 first)        |
//! | 4..7  | Left stick, two 12-bit axes                               |
//! | 7..10 | Right stick, two 12-bit axes                              |
//! | 10    | Vibrator input report                                     |
//!
//! Buttons are active-high. Each stick packs X and Y nibble-interleaved:
//! byte 0 is the low 8 bits of X, byte 1 holds the high nibble of X in its
//! low half and the low nibble of Y in its high half, byte 2 is the high
//! 8 bits of Y.


/// The length (in bytes) of the input block.
pub const INPUT_BLOCK_LEN: usize = 11;
/// The resting value of a 12-bit stick axis.
pub const AXIS_CENTER: u16 = 0x800;
/// The largest 12-bit axis value.
pub const AXIS_MAX: u16 = 0xFFF;

/// Full battery, powered over USB.
const BATTERY_CONNECTION: u8 = 0x81;

const LEFT_STICK: usize = 4;
const RIGHT_STICK: usize = 7;


/// Buttons of the emulated controller, numbered `(byte - 1) * 8 + bit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmulatedButton {
	Y = 0,
	X = 1,
	B = 2,
	A = 3,
	RightSR = 4,
	RightSL = 5,
	R = 6,
	ZR = 7,

	Minus = 8,
	Plus = 9,
	RightStick = 10,
	LeftStick = 11,
	Home = 12,
	Capture = 13,
	ChargingGrip = 15,

	Down = 16,
	Up = 17,
	Right = 18,
	Left = 19,
	LeftSR = 20,
	LeftSL = 21,
	L = 22,
	ZL = 23,
}

impl EmulatedButton {
	fn location(self) -> (usize, u8) {
		let index = self as usize;
		(1 + index / 8, 1 << (index % 8))
	}
}


/// Packs two 12-bit axes into the three-byte stick layout.
pub fn pack_stick(x: u16, y: u16) -> [u8; 3] {
	[
		(x & 0xFF) as u8,
		((x >> 8) & 0x0F) as u8 | ((y & 0x0F) as u8) << 4,
		((y >> 4) & 0xFF) as u8,
	]
}

/// Reverse of [`pack_stick`].
pub fn unpack_stick(bytes: [u8; 3]) -> (u16, u16) {
	let x = u16::from(bytes[0]) | u16::from(bytes[1] & 0x0F) << 8;
	let y = u16::from(bytes[1] >> 4) | u16::from(bytes[2]) << 4;
	(x, y)
}


/// One input block in the emulated controller's encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmulatedReport {
	bytes: [u8; INPUT_BLOCK_LEN],
}

impl EmulatedReport {
	/// No buttons held, sticks centred.
	pub fn new() -> Self {
		let mut report = Self { bytes: [0; INPUT_BLOCK_LEN] };
		report.bytes[0] = BATTERY_CONNECTION;
		report.set_left_stick(AXIS_CENTER, AXIS_CENTER);
		report.set_right_stick(AXIS_CENTER, AXIS_CENTER);
		report
	}

	pub fn as_bytes(&self) -> &[u8; INPUT_BLOCK_LEN] {
		&self.bytes
	}

	pub fn is_pressed(&self, button: EmulatedButton) -> bool {
		let (byte, mask) = button.location();
		self.bytes[byte] & mask != 0
	}

	pub fn set_button(&mut self, button: EmulatedButton, pressed: bool) -> &mut Self {
		let (byte, mask) = button.location();

		if pressed {
			self.bytes[byte] |= mask;
		} else {
			self.bytes[byte] &= !mask;
		}

		self
	}

	pub fn left_stick(&self) -> (u16, u16) {
		self.stick(LEFT_STICK)
	}

	pub fn right_stick(&self) -> (u16, u16) {
		self.stick(RIGHT_STICK)
	}

	pub fn set_left_stick(&mut self, x: u16, y: u16) -> &mut Self {
		self.set_stick(LEFT_STICK, x, y)
	}

	pub fn set_right_stick(&mut self, x: u16, y: u16) -> &mut Self {
		self.set_stick(RIGHT_STICK, x, y)
	}

	fn stick(&self, offset: usize) -> (u16, u16) {
		unpack_stick([self.bytes[offset], self.bytes[offset + 1], self.bytes[offset + 2]])
	}

	fn set_stick(&mut self, offset: usize, x: u16, y: u16) -> &mut Self {
		self.bytes[offset..offset + 3].copy_from_slice(&pack_stick(x.min(AXIS_MAX), y.min(AXIS_MAX)));
		self
	}
}

impl Default for EmulatedReport {
	fn default() -> Self {
		Self::new()
	}
}
