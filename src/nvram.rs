//! The emulated controller's factory calibration memory.
//!
//! The host reads calibration constants from fixed addresses. Those live in
//! a static table here, except for the user calibration window, which is
//! readable and writable and goes to a [`NvStore`].

use core::ops::Range;

use crate::error::NvramError;


/// The largest read the host issues, and the most a sub-command reply can carry.
pub const MAX_READ_LEN: usize = 29;

/// User stick calibration followed by user six-axis calibration.
pub const USER_CALIBRATION: Range<u32> = 0x8010..0x8040;
/// The size of the user calibration window.
pub const USER_CALIBRATION_LEN: usize = (USER_CALIBRATION.end - USER_CALIBRATION.start) as usize;


/// One fixed range of the address space.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
	pub address: u32,
	pub bytes: &'static [u8],
}

impl Segment {
	/// The segment's bytes for `[address, address + length)`, if it holds all of them.
	fn slice(&self, address: u32, length: usize) -> Option<&'static [u8]> {
		let start = usize::try_from(address.checked_sub(self.address)?).ok()?;
		self.bytes.get(start..start.checked_add(length)?)
	}
}


/// No serial number (first byte `0x80` or more).
const SERIAL_NUMBER: [u8; 16] = [0xFF; 16];

/// Six-axis factory calibration.
const SIX_AXIS_FACTORY: [u8; 24] = [
	0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Accelerometer origin
	0x00, 0x40, 0x00, 0x40, 0x00, 0x40, // Accelerometer sensitivity, +-8G
	0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Gyro origin
	0x3B, 0x34, 0x3B, 0x34, 0x3B, 0x34, // Gyro sensitivity, +-2000dps
];

/// Stick factory calibration, then body/button/grip colours.
const STICK_FACTORY_AND_COLOURS: [u8; 32] = [
	0x77, 0x77, 0x77, 0xB8, 0x88, 0x86, 0x77, 0x77, 0x77, // Left stick
	0x00, 0x08, 0x80, 0x77, 0x7F, 0xF7, 0x77, 0x7F, 0xF7, // Right stick
	0x00,
	0xE0, 0xE0, 0xE0, // Body
	0x77, 0x77, 0x77, // Buttons
	0xFF, 0xFF, 0xFF, // Left grip
	0xFF, 0xFF, 0xFF, // Right grip
	0xFF,
];

const SENSOR_AND_STICK_PARAMETERS: [u8; 24] = [
	0x50, 0xFD, 0x00, 0x00, 0xC6, 0x0F, 0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54, 0x41,
	0x15, 0x54, 0xC7, 0x79, 0x9C, 0x33, 0x36, 0x63,
];

/// Same as the stick half of [`SENSOR_AND_STICK_PARAMETERS`].
const STICK_PARAMETERS: [u8; 18] = [
	0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54, 0x41, 0x15, 0x54, 0xC7, 0x79, 0x9C, 0x33,
	0x36, 0x63,
];

/// Every read-only segment, ordered by address.
pub const SEGMENTS: [Segment; 5] = [
	Segment { address: 0x6000, bytes: &SERIAL_NUMBER },
	Segment { address: 0x6020, bytes: &SIX_AXIS_FACTORY },
	Segment { address: 0x603D, bytes: &STICK_FACTORY_AND_COLOURS },
	Segment { address: 0x6080, bytes: &SENSOR_AND_STICK_PARAMETERS },
	Segment { address: 0x6098, bytes: &STICK_PARAMETERS },
];


/// Persistent bytes behind the user calibration window.
pub trait NvStore {
	fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), NvramError>;
	/// Writes must be durable when this returns.
	fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), NvramError>;
}


/// An [`NvStore`] in RAM, starting out erased (`0xFF`).
#[derive(Clone, Debug)]
pub struct RamStore<const N: usize> {
	bytes: [u8; N],
}

impl<const N: usize> RamStore<N> {
	pub const fn new() -> Self {
		Self { bytes: [0xFF; N] }
	}

	pub fn as_bytes(&self) -> &[u8; N] {
		&self.bytes
	}
}

impl<const N: usize> Default for RamStore<N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<const N: usize> NvStore for RamStore<N> {
	fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), NvramError> {
		let end = offset.checked_add(buf.len()).ok_or(NvramError::Storage)?;
		let bytes = self.bytes.get(offset..end).ok_or(NvramError::Storage)?;
		buf.copy_from_slice(bytes);
		Ok(())
	}

	fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), NvramError> {
		let end = offset.checked_add(data.len()).ok_or(NvramError::Storage)?;
		let bytes = self.bytes.get_mut(offset..end).ok_or(NvramError::Storage)?;
		bytes.copy_from_slice(data);
		Ok(())
	}
}


/// The emulated address space: static segments plus the store-backed window.
pub struct VirtualNvram<S> {
	store: S,
}

impl<S: NvStore> VirtualNvram<S> {
	pub fn new(store: S) -> Self {
		Self { store }
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	/// Fills `out` from `[address, address + out.len())`.
	///
	/// Note: the whole range must fall inside one segment or inside the user
	/// calibration window.
	pub fn read(&mut self, address: u32, out: &mut [u8]) -> Result<(), NvramError> {
		let not_found = NvramError::NotFound { address, length: out.len() };

		if out.len() > MAX_READ_LEN {
			return Err(not_found);
		}

		if let Some(offset) = user_offset(address, out.len()) {
			#[cfg(feature = "defmt")]
			defmt::debug!("NVRAM user read {=u32:#06x}+{}", address, out.len());

			return self.store.read(offset, out);
		}

		let bytes = SEGMENTS
			.iter()
			.find_map(|segment| segment.slice(address, out.len()))
			.ok_or(not_found)?;

		out.copy_from_slice(bytes);

		#[cfg(feature = "defmt")]
		defmt::debug!("NVRAM read {=u32:#06x}+{}", address, out.len());

		Ok(())
	}

	/// Persists `data` at `address`. Only the user calibration window is writable.
	pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), NvramError> {
		let offset = user_offset(address, data.len())
			.ok_or(NvramError::NotFound { address, length: data.len() })?;

		#[cfg(feature = "defmt")]
		defmt::debug!("NVRAM write {=u32:#06x} {=[u8]:x}", address, data);

		self.store.write(offset, data)
	}
}


/// The store offset for a range inside the user calibration window.
fn user_offset(address: u32, length: usize) -> Option<usize> {
	let end = u64::from(address) + u64::try_from(length).ok()?;

	if USER_CALIBRATION.contains(&address) && end <= u64::from(USER_CALIBRATION.end) {
		usize::try_from(address - USER_CALIBRATION.start).ok()
	} else {
		None
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn nvram() -> VirtualNvram<RamStore<USER_CALIBRATION_LEN>> {
		VirtualNvram::new(RamStore::new())
	}

	#[test]
	fn serial_number_is_blank() {
		let mut out = [0u8; 16];
		nvram().read(0x6000, &mut out).unwrap();
		assert_eq!(out, [0xFF; 16]);
	}

	#[test]
	fn reads_inside_a_segment() {
		let mut out = [0u8; 13];
		nvram().read(0x6050, &mut out).unwrap();
		assert_eq!(out[..3], [0xE0, 0xE0, 0xE0]);
		assert_eq!(out[3..6], [0x77, 0x77, 0x77]);

		let mut out = [0u8; 6];
		nvram().read(0x6086, &mut out).unwrap();
		assert_eq!(out, [0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3]);
	}

	#[test]
	fn partial_overlap_is_not_found() {
		let mut nvram = nvram();
		let mut out = [0u8; 4];

		assert_eq!(
			nvram.read(0x600E, &mut out),
			Err(NvramError::NotFound { address: 0x600E, length: 4 }),
		);
		assert!(nvram.read(0x7000, &mut out).is_err());
		assert!(nvram.read(0x803E, &mut out).is_err());
	}

	#[test]
	fn oversized_reads_are_rejected() {
		let mut out = [0u8; MAX_READ_LEN + 1];
		assert!(nvram().read(0x603D, &mut out).is_err());
	}

	#[test]
	fn erased_user_calibration_reads_ff() {
		let mut out = [0u8; 22];
		nvram().read(0x8010, &mut out).unwrap();
		assert_eq!(out, [0xFF; 22]);
	}

	#[test]
	fn writes_persist_in_the_window_only() {
		let mut nvram = nvram();

		nvram.write(0x8012, &[0xB2, 0xA1]).unwrap();
		assert_eq!(nvram.store().as_bytes()[..4], [0xFF, 0xFF, 0xB2, 0xA1]);

		let mut out = [0u8; 3];
		nvram.read(0x8011, &mut out).unwrap();
		assert_eq!(out, [0xFF, 0xB2, 0xA1]);

		assert_eq!(
			nvram.write(0x6000, &[0x00]),
			Err(NvramError::NotFound { address: 0x6000, length: 1 }),
		);
		assert!(nvram.write(0x803F, &[0, 0]).is_err());
	}

	#[test]
	fn ram_store_checks_bounds() {
		let mut store = RamStore::<4>::new();
		assert_eq!(store.write(3, &[0, 0]), Err(NvramError::Storage));
		assert_eq!(store.read(usize::MAX, &mut [0]), Err(NvramError::Storage));
	}
}
