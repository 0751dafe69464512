//! Legacy report to emulated input block translation.

use crate::emulated::{EmulatedButton, EmulatedReport, AXIS_CENTER};
use crate::legacy::{LegacyButton, LegacyReport, STICK_CENTER};


/// Default deadzone radius, a tenth of the axis range rounded up.
pub const DEFAULT_DEADZONE_RADIUS: u8 = 26;

/// Legacy button to emulated button, one entry per legacy button.
pub const BUTTON_MAP: [(LegacyButton, EmulatedButton); 16] = [
	(LegacyButton::Square, EmulatedButton::Y),
	(LegacyButton::Triangle, EmulatedButton::X),
	(LegacyButton::Cross, EmulatedButton::B),
	(LegacyButton::Circle, EmulatedButton::A),
	(LegacyButton::R1, EmulatedButton::R),
	(LegacyButton::R2, EmulatedButton::ZR),
	(LegacyButton::Select, EmulatedButton::Minus),
	(LegacyButton::Start, EmulatedButton::Plus),
	(LegacyButton::R3, EmulatedButton::RightStick),
	(LegacyButton::L3, EmulatedButton::LeftStick),
	(LegacyButton::Down, EmulatedButton::Down),
	(LegacyButton::Up, EmulatedButton::Up),
	(LegacyButton::Right, EmulatedButton::Right),
	(LegacyButton::Left, EmulatedButton::Left),
	(LegacyButton::L1, EmulatedButton::L),
	(LegacyButton::L2, EmulatedButton::ZL),
];


/// How 8-bit axes are widened to 12 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StickExpansion {
	/// `round(v * 4095 / 255)`, with the centre mapped to exactly `0x800`.
	#[default]
	Proportional,
	/// `v << 4 | v >> 4`. Slightly nonlinear, centre lands on `0x808`.
	NibbleDuplicate,
}


/// Snaps a stick to the centre if it lies within `radius` of it.
pub fn apply_deadzone(x: u8, y: u8, radius: u8) -> (u8, u8) {
	let dx = i32::from(x) - i32::from(STICK_CENTER);
	let dy = i32::from(y) - i32::from(STICK_CENTER);
	let radius = i32::from(radius);

	if dx * dx + dy * dy <= radius * radius {
		(STICK_CENTER, STICK_CENTER)
	} else {
		(x, y)
	}
}

/// Widens one 8-bit axis to 12 bits.
pub fn expand_axis(value: u8, expansion: StickExpansion) -> u16 {
	match expansion {
		StickExpansion::Proportional if value == STICK_CENTER => AXIS_CENTER,
		StickExpansion::Proportional => ((u32::from(value) * 4095 + 127) / 255) as u16,
		StickExpansion::NibbleDuplicate => u16::from(value) << 4 | u16::from(value >> 4),
	}
}


/// Stateless translator configured with the stick filtering to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Translator {
	deadzone_radius: u8,
	expansion: StickExpansion,
}

impl Translator {
	pub const fn new(deadzone_radius: u8, expansion: StickExpansion) -> Self {
		Self { deadzone_radius, expansion }
	}

	/// Builds a fresh input block from a legacy report.
	///
	/// Note: Home is never set here; it belongs to the analog button latch.
	pub fn translate(&self, report: &LegacyReport) -> EmulatedReport {
		let mut emulated = EmulatedReport::new();

		for (legacy, button) in BUTTON_MAP {
			emulated.set_button(button, report.is_pressed(legacy));
		}

		let (x, y) = self.stick(report.left_stick());
		emulated.set_left_stick(x, y);

		let (x, y) = self.stick(report.right_stick());
		emulated.set_right_stick(x, y);

		emulated
	}

	fn stick(&self, (x, y): (u8, u8)) -> (u16, u16) {
		// Legacy Y grows downwards.
		let (x, y) = apply_deadzone(x, 0xFF - y, self.deadzone_radius);
		(expand_axis(x, self.expansion), expand_axis(y, self.expansion))
	}
}

impl Default for Translator {
	fn default() -> Self {
		Self::new(DEFAULT_DEADZONE_RADIUS, StickExpansion::default())
	}
}
