//! A small ring of recently received host reports, dumped on halt.


/// How many entries the ring keeps.
pub const HISTORY_LEN: usize = 32;

/// The report ID the host sends so often that runs of it are counted
/// instead of recorded one by one.
pub const COALESCED_REPORT_ID: u8 = 0x10;


/// One received report: its ID, its second byte, and its sub-command.
///
/// Note: for a run of [`COALESCED_REPORT_ID`], bytes 1 and 2 hold the run
/// length instead (big-endian).
pub type HistoryEntry = [u8; 3];


#[derive(Clone, Debug)]
pub struct CommandHistory {
	entries: [HistoryEntry; HISTORY_LEN],
	/// Index of the newest entry.
	cursor: usize,
}

impl CommandHistory {
	pub const fn new() -> Self {
		Self {
			entries: [[0; 3]; HISTORY_LEN],
			cursor: 0,
		}
	}

	/// Records a report.
	pub fn record(&mut self, report_id: u8, second: u8, subcommand: u8) {
		if report_id == COALESCED_REPORT_ID {
			if self.entries[self.cursor][0] != COALESCED_REPORT_ID {
				self.push([COALESCED_REPORT_ID, 0, 0]);
			}

			let entry = &mut self.entries[self.cursor];
			let count = u16::from_be_bytes([entry[1], entry[2]]).saturating_add(1);
			entry[1..].copy_from_slice(&count.to_be_bytes());
		} else {
			self.push([report_id, second, subcommand]);
		}
	}

	fn push(&mut self, entry: HistoryEntry) {
		self.cursor = (self.cursor + 1) % HISTORY_LEN;
		self.entries[self.cursor] = entry;
	}

	/// All entries, newest first. Slots never written read as zero.
	pub fn newest_first(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
		(0..HISTORY_LEN).map(move |age| &self.entries[(self.cursor + HISTORY_LEN - age) % HISTORY_LEN])
	}
}

impl Default for CommandHistory {
	fn default() -> Self {
		Self::new()
	}
}
