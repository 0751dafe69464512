//! Property-based tests for translation, memory, rumble and the report
//! scheduler.

use pico_psx_procon::emulated::{EmulatedButton, AXIS_CENTER, AXIS_MAX, INPUT_BLOCK_LEN};
use pico_psx_procon::legacy::{LegacyReport, STICK_CENTER};
use pico_psx_procon::nvram::{RamStore, VirtualNvram, MAX_READ_LEN, USER_CALIBRATION, USER_CALIBRATION_LEN};
use pico_psx_procon::rumble::{decode, RumbleKind, RumbleState};
use pico_psx_procon::scheduler::ReportScheduler;
use pico_psx_procon::translate::{apply_deadzone, expand_axis, StickExpansion, Translator, BUTTON_MAP};
use pico_psx_procon::{BridgeError, NvramError, PACKET_SIZE, REPORT_SIZE};
use proptest::prelude::*;

const BLOCK: [u8; INPUT_BLOCK_LEN] = [0xA5; INPUT_BLOCK_LEN];


#[derive(Clone, Debug)]
enum Step {
	Regular(u8, Vec<u8>),
	Subcommand(u8, Vec<u8>),
	Input,
	Transmit { suspended: bool },
}

fn step() -> impl Strategy<Value = Step> {
	prop_oneof![
		(any::<u8>(), prop::collection::vec(any::<u8>(), 0..=62)).prop_map(|(c, p)| Step::Regular(c, p)),
		(any::<u8>(), prop::collection::vec(any::<u8>(), 0..=49)).prop_map(|(s, p)| Step::Subcommand(s, p)),
		Just(Step::Input),
		any::<bool>().prop_map(|suspended| Step::Transmit { suspended }),
		any::<bool>().prop_map(|suspended| Step::Transmit { suspended }),
		any::<bool>().prop_map(|suspended| Step::Transmit { suspended }),
	]
}

/// What the host should receive for a report, as it was when filled.
fn expected_input(now: u8) -> Vec<u8> {
	let mut bytes = vec![0x30, now];
	bytes.extend_from_slice(&BLOCK);
	bytes
}


proptest! {
	#![proptest_config(ProptestConfig::with_cases(500))]

	/// Every report reaches the host exactly as it was filled, whatever
	/// gets filled while it is being sent.
	#[test]
	fn prop_transmitted_reports_match_their_snapshot(steps in prop::collection::vec(step(), 1..80)) {
		let mut scheduler = ReportScheduler::new();
		let mut pending: Option<Vec<u8>> = None;
		let mut in_flight: Option<(Vec<u8>, usize)> = None;
		let now = 0x42;

		for step in steps {
			let (result, expected) = match step {
				Step::Regular(command, payload) => {
					let mut bytes = vec![0x81, command];
					bytes.extend_from_slice(&payload);
					(scheduler.prepare_regular_reply(command, &payload), bytes)
				}
				Step::Subcommand(subcommand, payload) => {
					let mut bytes = vec![0x21, now];
					bytes.extend_from_slice(&BLOCK);
					bytes.extend_from_slice(&[0x80, subcommand]);
					if payload.is_empty() {
						bytes.push(0x00);
					} else {
						bytes.extend_from_slice(&payload);
					}
					(scheduler.prepare_subcommand_reply(now, 0x80, subcommand, &payload), bytes)
				}
				Step::Input => (scheduler.prepare_input_report(now), expected_input(now)),
				Step::Transmit { suspended } => {
					if in_flight.is_none() {
						in_flight = match pending.take() {
							Some(bytes) => Some((bytes, 0)),
							None if !suspended => Some((expected_input(now), 0)),
							None => None,
						};
					}

					let packet = scheduler.next_packet(suspended, now, |slot| *slot = BLOCK).unwrap();

					let done = match (in_flight.as_mut(), packet) {
						(None, None) => false,
						(Some((bytes, cursor)), Some(packet)) => {
							let end = (*cursor + PACKET_SIZE).min(bytes.len());
							prop_assert_eq!(packet.as_bytes(), &bytes[*cursor..end]);
							*cursor = end;

							packet.len() < PACKET_SIZE || end == REPORT_SIZE
						}
						(expected, packet) => {
							prop_assert!(false, "expected {:?}, sent {:?}", expected, packet);
							false
						}
					};

					if done {
						in_flight = None;
					}

					prop_assert_eq!(scheduler.is_transmitting(), in_flight.is_some());
					continue;
				}
			};

			match result {
				Ok(()) => {
					prop_assert!(pending.is_none());
					pending = Some(expected);
				}
				Err(error) => {
					prop_assert_eq!(error, BridgeError::ReportClash);
					prop_assert!(pending.is_some());
				}
			}

			prop_assert_eq!(scheduler.is_pending(), pending.is_some());
		}
	}

	/// Inside the radius the stick snaps to the centre, outside it is untouched.
	#[test]
	fn prop_deadzone_snaps_or_passes(x in any::<u8>(), y in any::<u8>(), radius in 0u8..64) {
		let dx = i32::from(x) - 0x80;
		let dy = i32::from(y) - 0x80;
		let filtered = apply_deadzone(x, y, radius);

		if dx * dx + dy * dy <= i32::from(radius) * i32::from(radius) {
			prop_assert_eq!(filtered, (STICK_CENTER, STICK_CENTER));
		} else {
			prop_assert_eq!(filtered, (x, y));
		}

		prop_assert_eq!(apply_deadzone(filtered.0, filtered.1, radius), filtered);
	}

	/// Each legacy button drives exactly its own emulated button, inverted.
	#[test]
	fn prop_buttons_invert_polarity(buttons in any::<u16>()) {
		let report = LegacyReport::analog(buttons, (0x80, 0x80), (0x80, 0x80));
		let emulated = Translator::default().translate(&report);

		for (legacy, button) in BUTTON_MAP {
			let released = buttons & (1 << legacy as u16) != 0;
			prop_assert_eq!(emulated.is_pressed(button), !released);
		}

		for unmapped in [
			EmulatedButton::Home,
			EmulatedButton::Capture,
			EmulatedButton::RightSR,
			EmulatedButton::RightSL,
			EmulatedButton::LeftSR,
			EmulatedButton::LeftSL,
			EmulatedButton::ChargingGrip,
		] {
			prop_assert!(!emulated.is_pressed(unmapped));
		}
	}

	/// Widened axes never leave the 12-bit range and keep their order.
	#[test]
	fn prop_expansion_is_monotonic(a in any::<u8>(), b in any::<u8>()) {
		for expansion in [StickExpansion::Proportional, StickExpansion::NibbleDuplicate] {
			let (low, high) = (a.min(b), a.max(b));
			prop_assert!(expand_axis(low, expansion) <= expand_axis(high, expansion));
			prop_assert!(expand_axis(high, expansion) <= AXIS_MAX);
		}
		prop_assert_eq!(expand_axis(STICK_CENTER, StickExpansion::Proportional), AXIS_CENTER);
	}

	/// Whatever is written to user calibration reads back unchanged.
	#[test]
	fn prop_user_calibration_round_trip(
		offset in 0..USER_CALIBRATION_LEN,
		data in prop::collection::vec(any::<u8>(), 1..=MAX_READ_LEN),
	) {
		let length = data.len().min(USER_CALIBRATION_LEN - offset);
		let data = &data[..length];
		let address = USER_CALIBRATION.start + offset as u32;

		let mut nvram = VirtualNvram::new(RamStore::<USER_CALIBRATION_LEN>::new());
		nvram.write(address, data).unwrap();

		let mut out = vec![0u8; length];
		nvram.read(address, &mut out).unwrap();
		prop_assert_eq!(out.as_slice(), data);
	}

	/// Addresses between the factory block and user calibration hold nothing.
	#[test]
	fn prop_unmapped_addresses_are_not_found(address in 0x7000u32..0x8000, length in 1usize..=MAX_READ_LEN) {
		let mut nvram = VirtualNvram::new(RamStore::<USER_CALIBRATION_LEN>::new());
		let mut out = vec![0u8; length];

		prop_assert_eq!(nvram.read(address, &mut out), Err(NvramError::NotFound { address, length }));
		prop_assert_eq!(nvram.write(address, &out), Err(NvramError::NotFound { address, length }));
	}

	/// Decoding is a pure function of the four bytes.
	#[test]
	fn prop_rumble_decode_is_deterministic(raw in any::<[u8; 4]>()) {
		prop_assert_eq!(decode(&raw), decode(&raw));
	}

	/// The silent tag decodes to nothing, whatever the other bits say.
	#[test]
	fn prop_silent_rumble_is_zero(raw in any::<[u8; 4]>()) {
		let raw = [(raw[0] & !0b11) | 0b01, raw[1], raw[2], (raw[3] & 0x3F) | 0x40];
		prop_assert_eq!(RumbleKind::of(&raw), RumbleKind::Silent);
		prop_assert_eq!(decode(&raw), RumbleState::default());
	}
}


#[test]
fn all_zero_rumble_is_silent() {
	assert_eq!(decode(&[0; 4]), RumbleState::default());
}
