use crate::emulated::{EmulatedButton, EmulatedReport, INPUT_BLOCK_LEN};
use crate::legacy::*;
use crate::rumble::{MotorDrive, MotorLevels};
use crate::transport::LegacyLink;
use crate::translate::Translator;


/// How long (in milliseconds) an analog button press shows up as Home.
pub const HOME_LATCH_MS: u8 = 64;


/// The legacy controller as seen by the bridge: polled on demand, kept in
/// analog mode, and translated into input blocks.
pub struct LegacyController<L> {
	link: L,
	queue: CommandQueue,
	/// The last analog report received in full.
	previous: LegacyReport,
	translator: Translator,

	/// When the analog button was last seen, in milliseconds.
	home_pressed_at: Option<u8>,
	motors: MotorDrive,
	failed_polls: u32,

	options: ControllerOptions,
}

impl<L: LegacyLink> LegacyController<L> {
	pub fn new(link: L, translator: Translator) -> Self {
		Self {
			link,
			queue: CommandQueue::new(),
			previous: LegacyReport::IDLE,
			translator,
			home_pressed_at: None,
			motors: MotorDrive::new(),
			failed_polls: 0,
			options: ControllerOptions::default(),
		}
	}

	/// Retrieves the controller's current options. Options can be chained for easier modification.
	pub fn options(&mut self) -> &mut ControllerOptions {
		&mut self.options
	}

	pub fn set_translator(&mut self, translator: Translator) {
		self.translator = translator;
	}

	/// Sets the motor levels sent with the following polls.
	pub fn set_motor_levels(&mut self, levels: MotorLevels) {
		self.motors.set_levels(levels);
	}

	pub fn stop_motors(&mut self) {
		self.motors.stop();
	}

	pub fn motor_levels(&self) -> MotorLevels {
		self.motors.levels()
	}

	/// Number of transactions that failed since startup.
	pub fn failed_polls(&self) -> u32 {
		self.failed_polls
	}

	/// The report translations are currently based on.
	pub fn last_report(&self) -> &LegacyReport {
		&self.previous
	}

	/// Returns `true` while the analog mode entry sequence is running.
	pub fn is_entering_analog(&self) -> bool {
		self.queue.is_active()
	}

	pub fn link_mut(&mut self) -> &mut L {
		&mut self.link
	}

	/// Runs one transaction and returns a fresh input block.
	///
	/// The transaction is a poll, or the next command of the analog mode
	/// entry sequence while that runs. Whenever the reply is not a full
	/// analog report, the last good one is translated instead.
	pub fn poll(&mut self, now: u8) -> EmulatedReport {
		let mut reply = LegacyReport::IDLE;
		let executing_queue = self.queue.is_active();

		let received = match self.queue.current() {
			Some(command) => self.transact(command, &mut reply),
			None => {
				let (small, large) = if self.options.rumble {
					self.motors.next_poll()
				} else {
					(0x00, 0x00)
				};

				self.transact(&[CMD_POLL, 0x00, small, large], &mut reply)
			}
		};

		let mode = (received >= 2).then(|| reply.mode());

		if !executing_queue {
			if let Some(mode) = mode.filter(|mode| *mode != DeviceMode::Analog) {
				#[cfg(feature = "defmt")]
				defmt::info!("Legacy controller in {} mode, switching to analog", mode);

				self.queue.load_analog_entry(self.options.rumble);

				// Digital mode means the analog button was pressed. Its release is never reported.
				if mode == DeviceMode::Digital {
					self.home_pressed_at = Some(now);
				}
			}
		} else if mode == Some(DeviceMode::Config) {
			self.queue.advance();

			#[cfg(feature = "defmt")]
			if !self.queue.is_active() {
				defmt::info!("Legacy controller analog mode sequence done");
			}
		} else {
			// The controller often drops config commands. Start over.
			self.queue.restart();
		}

		if received == LEGACY_REPORT_LEN && reply.mode() == DeviceMode::Analog {
			self.previous = reply;
		}

		let mut emulated = self.translator.translate(&self.previous);

		if let Some(pressed_at) = self.home_pressed_at {
			if now.wrapping_sub(pressed_at) < self.options.home_latch_ms {
				emulated.set_button(EmulatedButton::Home, true);
			} else {
				self.home_pressed_at = None;
			}
		}

		emulated
	}

	/// [`LegacyController::poll`] straight into an outgoing report.
	pub fn capture(&mut self, slot: &mut [u8; INPUT_BLOCK_LEN], now: u8) {
		*slot = *self.poll(now).as_bytes();
	}

	/// Runs a transaction, treating any failure as an empty reply.
	fn transact(&mut self, command: &[u8], reply: &mut LegacyReport) -> usize {
		match self.link.transact(command, reply.as_mut_bytes()) {
			Ok(received) => received,
			Err(_error) => {
				self.failed_polls = self.failed_polls.wrapping_add(1);

				#[cfg(feature = "defmt")]
				defmt::warn!("Legacy transaction failed: {}", _error);

				0
			}
		}
	}
}


/// Provides various configurations as to how the legacy controller is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerOptions {
	home_latch_ms: u8,
	rumble: bool,
}

impl ControllerOptions {
	/// Sets how long (in milliseconds) an analog button press is reported as Home.
	///
	/// Default is [`HOME_LATCH_MS`].
	pub fn with_home_latch_ms(&mut self, home_latch_ms: u8) -> &mut Self {
		self.home_latch_ms = home_latch_ms;
		self
	}

	/// Sets whether the motors are mapped and driven.
	///
	/// Default is `true`.
	pub fn with_rumble(&mut self, rumble: bool) -> &mut Self {
		self.rumble = rumble;
		self
	}

	pub fn home_latch_ms(&self) -> u8 {
		self.home_latch_ms
	}

	pub fn rumble(&self) -> bool {
		self.rumble
	}
}

impl Default for ControllerOptions {
	fn default() -> Self {
		Self {
			home_latch_ms: HOME_LATCH_MS,
			rumble: true,
		}
	}
}
