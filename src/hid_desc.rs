/// The vendor ID the host expects from the emulated controller.
pub const USB_VID: u16 = 0x057E;
/// The product ID the host expects from the emulated controller.
pub const USB_PID: u16 = 0x2009;
/// The largest report (in bytes) sent either way, report ID included.
pub const REPORT_SIZE: usize = 64;
/// The endpoint packet size (in bytes).
pub const PACKET_SIZE: usize = 8;
/// The interrupt endpoint polling interval (in milliseconds).
pub const USB_POLL_RATE_MS: u8 = 2;


/// Host request: send an input report now.
pub const INPUT_REQUEST_ID: u8 = 0x00;
/// Host request: sub-command, with rumble data.
pub const SUBCOMMAND_REQUEST_ID: u8 = 0x01;
/// Host request: rumble data only.
pub const RUMBLE_REQUEST_ID: u8 = 0x10;
/// Host request: regular (USB-level) command.
pub const REGULAR_REQUEST_ID: u8 = 0x80;

/// Plain input report.
pub const INPUT_REPORT_ID: u8 = 0x30;
/// Input report followed by a sub-command reply.
pub const SUBCOMMAND_REPLY_ID: u8 = 0x21;
/// Reply to a regular command.
pub const REGULAR_REPLY_ID: u8 = 0x81;


/// The report descriptor of the emulated controller.
///
/// Note: the host reads the vendor-defined reports by ID and ignores the
/// declared layout of report `0x30`.
#[rustfmt::skip]
pub const PROCON_REPORT_DESCRIPTOR: &[u8] = &[
	0x05, 0x01,                   // Usage Page (Generic Desktop)
	0x15, 0x00,                   // Logical Minimum (0)
	0x09, 0x04,                   // Usage (Joystick)
	0xA1, 0x01,                   // Collection (Application)
	0x85, 0x30,                   //   Report ID (0x30)
	0x05, 0x01,                   //   Usage Page (Generic Desktop)
	0x05, 0x09,                   //   Usage Page (Button)
	0x19, 0x01,                   //   Usage Minimum (1)
	0x29, 0x0A,                   //   Usage Maximum (10)
	0x15, 0x00,                   //   Logical Minimum (0)
	0x25, 0x01,                   //   Logical Maximum (1)
	0x75, 0x01,                   //   Report Size (1)
	0x95, 0x0A,                   //   Report Count (10)
	0x55, 0x00,                   //   Unit Exponent (0)
	0x65, 0x00,                   //   Unit (None)
	0x81, 0x02,                   //   Input (Data, Var, Abs)
	0x05, 0x09,                   //   Usage Page (Button)
	0x19, 0x0B,                   //   Usage Minimum (11)
	0x29, 0x0E,                   //   Usage Maximum (14)
	0x15, 0x00,                   //   Logical Minimum (0)
	0x25, 0x01,                   //   Logical Maximum (1)
	0x75, 0x01,                   //   Report Size (1)
	0x95, 0x04,                   //   Report Count (4)
	0x81, 0x02,                   //   Input (Data, Var, Abs)
	0x75, 0x01,                   //   Report Size (1)
	0x95, 0x02,                   //   Report Count (2)
	0x81, 0x03,                   //   Input (Const, Var, Abs)
	0x0B, 0x01, 0x00, 0x01, 0x00, //   Usage (Pointer)
	0xA1, 0x00,                   //   Collection (Physical)
	0x0B, 0x30, 0x00, 0x01, 0x00, //     Usage (X)
	0x0B, 0x31, 0x00, 0x01, 0x00, //     Usage (Y)
	0x0B, 0x32, 0x00, 0x01, 0x00, //     Usage (Z)
	0x0B, 0x35, 0x00, 0x01, 0x00, //     Usage (Rz)
	0x15, 0x00,                   //     Logical Minimum (0)
	0x27, 0xFF, 0xFF, 0x00, 0x00, //     Logical Maximum (65535)
	0x75, 0x10,                   //     Report Size (16)
	0x95, 0x04,                   //     Report Count (4)
	0x81, 0x02,                   //     Input (Data, Var, Abs)
	0xC0,                         //   End Collection
	0x0B, 0x39, 0x00, 0x01, 0x00, //   Usage (Hat Switch)
	0x15, 0x00,                   //   Logical Minimum (0)
	0x25, 0x07,                   //   Logical Maximum (7)
	0x35, 0x00,                   //   Physical Minimum (0)
	0x46, 0x3B, 0x01,             //   Physical Maximum (315)
	0x65, 0x14,                   //   Unit (Degrees)
	0x75, 0x04,                   //   Report Size (4)
	0x95, 0x01,                   //   Report Count (1)
	0x81, 0x02,                   //   Input (Data, Var, Abs)
	0x05, 0x09,                   //   Usage Page (Button)
	0x19, 0x0F,                   //   Usage Minimum (15)
	0x29, 0x12,                   //   Usage Maximum (18)
	0x15, 0x00,                   //   Logical Minimum (0)
	0x25, 0x01,                   //   Logical Maximum (1)
	0x75, 0x01,                   //   Report Size (1)
	0x95, 0x04,                   //   Report Count (4)
	0x81, 0x02,                   //   Input (Data, Var, Abs)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x34,                   //   Report Count (52)
	0x81, 0x03,                   //   Input (Const, Var, Abs)
	0x06, 0x00, 0xFF,             //   Usage Page (Vendor Defined 0xFF00)
	0x85, 0x21,                   //   Report ID (0x21)
	0x09, 0x01,                   //   Usage (0x01)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x3F,                   //   Report Count (63)
	0x81, 0x03,                   //   Input (Const, Var, Abs)
	0x85, 0x81,                   //   Report ID (0x81)
	0x09, 0x02,                   //   Usage (0x02)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x3F,                   //   Report Count (63)
	0x81, 0x03,                   //   Input (Const, Var, Abs)
	0x85, 0x01,                   //   Report ID (0x01)
	0x09, 0x03,                   //   Usage (0x03)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x3F,                   //   Report Count (63)
	0x91, 0x83,                   //   Output (Const, Var, Abs, Volatile)
	0x85, 0x10,                   //   Report ID (0x10)
	0x09, 0x04,                   //   Usage (0x04)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x3F,                   //   Report Count (63)
	0x91, 0x83,                   //   Output (Const, Var, Abs, Volatile)
	0x85, 0x80,                   //   Report ID (0x80)
	0x09, 0x05,                   //   Usage (0x05)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x3F,                   //   Report Count (63)
	0x91, 0x83,                   //   Output (Const, Var, Abs, Volatile)
	0x85, 0x82,                   //   Report ID (0x82)
	0x09, 0x06,                   //   Usage (0x06)
	0x75, 0x08,                   //   Report Size (8)
	0x95, 0x3F,                   //   Report Count (63)
	0x91, 0x83,                   //   Output (Const, Var, Abs, Volatile)
	0xC0,                         // End Collection
];


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn descriptor_is_complete() {
		assert_eq!(PROCON_REPORT_DESCRIPTOR.len(), 203);
		assert_eq!(PROCON_REPORT_DESCRIPTOR.last(), Some(&0xC0));
	}

	#[test]
	fn every_request_id_is_declared_as_output() {
		for id in [SUBCOMMAND_REQUEST_ID, RUMBLE_REQUEST_ID, REGULAR_REQUEST_ID] {
			let declared = PROCON_REPORT_DESCRIPTOR
				.windows(6)
				.any(|item| item[0] == 0x85 && item[1] == id);
			assert!(declared, "report {:#04x} missing", id);
		}
	}
}
