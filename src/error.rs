//! Error types for the bridge.
//!
//! Errors fall into three groups. Legacy link failures ([`TransportError`])
//! are recovered locally by the controller. Bad host requests ([`NvramError`]
//! and unknown commands) are answered with a best-effort reply. Everything
//! in [`BridgeError`] means the scheduler and the dispatcher no longer agree
//! on who owns a buffer; the firmware halts on it.

use core::fmt;

/// Result type for operations that can hit a fatal bridge error.
pub type Result<T> = core::result::Result<T, BridgeError>;


/// Unrecoverable internal invariant violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
	/// A reply was started while another outgoing report was still pending.
	ReportClash,
	/// The buffer selected for filling is the one being transmitted.
	BufferInFlight,
	/// A reply did not fit in one outgoing report.
	ReportTooLarge {
		/// The length the reply would have needed.
		length: usize,
	},
}

impl fmt::Display for BridgeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ReportClash => write!(f, "Report clash"),
			Self::BufferInFlight => write!(f, "Buffer still in flight"),
			Self::ReportTooLarge { length } => write!(f, "Report too big ({} bytes)", length),
		}
	}
}


/// Failures of one request/acknowledge transaction with the legacy controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
	/// The controller did not raise the acknowledge line in time.
	AckTimeout {
		/// Bytes exchanged before the missing acknowledge.
		received: usize,
	},
	/// The serial bus or the select line reported an error.
	Bus,
}

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::AckTimeout { received } => {
				write!(f, "Acknowledge timeout after {} bytes", received)
			}
			Self::Bus => write!(f, "Bus error"),
		}
	}
}


/// Virtual NVRAM access failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvramError {
	/// The range is not fully contained in one known segment.
	NotFound {
		address: u32,
		length: usize,
	},
	/// The persistent store rejected the access.
	Storage,
}

impl fmt::Display for NvramError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotFound { address, length } => {
				write!(f, "No segment for {:#06x}+{}", address, length)
			}
			Self::Storage => write!(f, "Storage error"),
		}
	}
}
