//! The legacy analog controller's report layout and command set.
//!
//! A full analog reply is nine bytes:
//!
//! | Byte | Contents                                                       |
//! |------|----------------------------------------------------------------|
//! | 0    | Idle (`0xFF`)                                                  |
//! | 1    | Mode: high nibble = [`DeviceMode`], low nibble = length in words |
//! | 2    | `0x5A`                                                         |
//! | 3    | Select, L3, R3, Start, Up, Right, Down, Left (bit 0 first)     |
//! | 4    | L2, R2, L1, R1, Triangle, Circle, Cross, Square (bit 0 first)  |
//! | 5, 6 | Right stick X, Y                                               |
//! | 7, 8 | Left stick X, Y                                                |
//!
//! Buttons are active-low.


/// The length (in bytes) of a full analog report.
pub const LEGACY_REPORT_LEN: usize = 9;
/// The first byte of every transaction sent to the controller.
pub const TRANSACTION_HEADER: u8 = 0x01;
/// The resting value of an 8-bit stick axis.
pub const STICK_CENTER: u8 = 0x80;

/// Polls the controller state. The two trailing bytes drive the motors.
pub const CMD_POLL: u8 = 0x42;
/// Enters (`01`) or exits (`00`) config mode.
pub const CMD_CONFIG: u8 = 0x43;
/// Selects analog or digital mode. Only valid in config mode.
pub const CMD_SET_MODE: u8 = 0x44;
/// Maps poll bytes to the motors. Only valid in config mode.
pub const CMD_MAP_MOTORS: u8 = 0x4D;

pub const ENTER_CONFIG: &[u8] = &[CMD_CONFIG, 0x00, 0x01];
pub const SWITCH_TO_ANALOG: &[u8] = &[CMD_SET_MODE, 0x00, 0x01];
/// Poll byte 3 drives the small motor and byte 4 the large one.
pub const CONFIGURE_MOTORS: &[u8] = &[CMD_MAP_MOTORS, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
pub const EXIT_CONFIG: &[u8] = &[CMD_CONFIG, 0x00, 0x00];


/// The state the controller reports in the high nibble of byte 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceMode {
	/// Digital only. Seen after the user presses the analog button.
	Digital,
	/// Analog sticks enabled.
	Analog,
	/// Config mode; replies to config commands carry this.
	Config,
	Other(u8),
}

impl DeviceMode {
	pub fn from_nibble(nibble: u8) -> Self {
		match nibble & 0x0F {
			0x4 => DeviceMode::Digital,
			0x7 => DeviceMode::Analog,
			0xF => DeviceMode::Config,
			other => DeviceMode::Other(other),
		}
	}
}


/// Legacy controller buttons, numbered by their bit in bytes 3 and 4
/// (byte 3 bits are 0-7, byte 4 bits are 8-15).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LegacyButton {
	Select = 0,
	L3 = 1,
	R3 = 2,
	Start = 3,
	Up = 4,
	Right = 5,
	Down = 6,
	Left = 7,
	L2 = 8,
	R2 = 9,
	L1 = 10,
	R1 = 11,
	Triangle = 12,
	Circle = 13,
	Cross = 14,
	Square = 15,
}


/// One captured reply from the legacy controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LegacyReport {
	bytes: [u8; LEGACY_REPORT_LEN],
}

impl LegacyReport {
	/// An analog report with no buttons held and both sticks centred.
	pub const IDLE: Self = Self {
		bytes: [0xFF, 0x73, 0x5A, 0xFF, 0xFF, STICK_CENTER, STICK_CENTER, STICK_CENTER, STICK_CENTER],
	};

	pub const fn from_bytes(bytes: [u8; LEGACY_REPORT_LEN]) -> Self {
		Self { bytes }
	}

	pub fn as_bytes(&self) -> &[u8; LEGACY_REPORT_LEN] {
		&self.bytes
	}

	/// Raw buffer for a transaction to receive into.
	pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; LEGACY_REPORT_LEN] {
		&mut self.bytes
	}

	pub fn mode(&self) -> DeviceMode {
		DeviceMode::from_nibble(self.bytes[1] >> 4)
	}

	/// Both button bytes as one active-low word, byte 3 in the low half.
	pub fn buttons(&self) -> u16 {
		u16::from_le_bytes([self.bytes[3], self.bytes[4]])
	}

	/// Returns `true` if the button is held (its bit is low).
	pub fn is_pressed(&self, button: LegacyButton) -> bool {
		self.buttons() & (1 << button as u16) == 0
	}

	pub fn left_stick(&self) -> (u8, u8) {
		(self.bytes[7], self.bytes[8])
	}

	pub fn right_stick(&self) -> (u8, u8) {
		(self.bytes[5], self.bytes[6])
	}

	/// Builds an analog report from its fields. Mostly useful for tests.
	pub fn analog(buttons: u16, left: (u8, u8), right: (u8, u8)) -> Self {
		let [b0, b1] = buttons.to_le_bytes();
		Self {
			bytes: [0xFF, 0x73, 0x5A, b0, b1, right.0, right.1, left.0, left.1],
		}
	}
}

impl Default for LegacyReport {
	fn default() -> Self {
		Self::IDLE
	}
}


/// Ordered list of config commands that moves the controller into analog
/// mode, executed one command per poll.
#[derive(Clone, Copy, Debug)]
pub struct CommandQueue {
	commands: &'static [&'static [u8]],
	cursor: usize,
}

impl CommandQueue {
	const WITH_MOTORS: &'static [&'static [u8]] =
		&[ENTER_CONFIG, SWITCH_TO_ANALOG, CONFIGURE_MOTORS, EXIT_CONFIG];
	const WITHOUT_MOTORS: &'static [&'static [u8]] =
		&[ENTER_CONFIG, SWITCH_TO_ANALOG, EXIT_CONFIG];

	/// An empty queue.
	pub const fn new() -> Self {
		Self { commands: &[], cursor: 0 }
	}

	/// Loads the analog mode entry sequence, optionally including the motor mapping.
	pub fn load_analog_entry(&mut self, configure_motors: bool) {
		self.commands = if configure_motors { Self::WITH_MOTORS } else { Self::WITHOUT_MOTORS };
		self.cursor = 0;
	}

	pub fn is_active(&self) -> bool {
		self.cursor < self.commands.len()
	}

	/// The command to send on the next poll, if the queue is running.
	pub fn current(&self) -> Option<&'static [u8]> {
		self.commands.get(self.cursor).copied()
	}

	/// Moves to the next command. Clears the queue once the last one is done.
	pub fn advance(&mut self) {
		self.cursor += 1;
		if self.cursor >= self.commands.len() {
			self.clear();
		}
	}

	/// Starts the sequence again from its first command.
	pub fn restart(&mut self) {
		self.cursor = 0;
	}

	pub fn clear(&mut self) {
		self.commands = &[];
		self.cursor = 0;
	}

	pub fn cursor(&self) -> usize {
		self.cursor
	}
}

impl Default for CommandQueue {
	fn default() -> Self {
		Self::new()
	}
}
