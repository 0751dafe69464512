use crate::controller::{LegacyController, HOME_LATCH_MS};
use crate::dispatch::{CommandDispatcher, PacketFraming};
use crate::error::Result;
use crate::history::CommandHistory;
use crate::nvram::{NvStore, VirtualNvram};
use crate::scheduler::{Packet, ReportScheduler};
use crate::transport::LegacyLink;
use crate::translate::{StickExpansion, Translator, DEFAULT_DEADZONE_RADIUS};


/// The whole bridge, owned by the firmware's main loop.
///
/// The USB side feeds it packets from the host with [`Bridge::on_packet`]
/// and asks it for packets to send with [`Bridge::on_transmit_ready`]. The
/// legacy controller is polled from inside the latter, right before its
/// input reaches the host.
pub struct Bridge<L, S> {
	controller: LegacyController<L>,
	dispatcher: CommandDispatcher,
	scheduler: ReportScheduler,
	nvram: VirtualNvram<S>,

	/// Low byte of the millisecond clock.
	clock: u8,
}

impl<L: LegacyLink, S: NvStore> Bridge<L, S> {
	pub fn new(link: L, store: S, options: &BridgeOptions) -> Self {
		let mut controller = LegacyController::new(link, options.translator());
		controller
			.options()
			.with_home_latch_ms(options.home_latch_ms)
			.with_rumble(options.rumble);

		Self {
			controller,
			dispatcher: CommandDispatcher::new(options.framing),
			scheduler: ReportScheduler::new(),
			nvram: VirtualNvram::new(store),
			clock: 0,
		}
	}

	/// Updates the clock from the firmware's millisecond timer.
	pub fn set_millis(&mut self, millis: u32) {
		self.clock = millis as u8;
	}

	pub fn clock(&self) -> u8 {
		self.clock
	}

	/// Takes one packet received from the host.
	///
	/// An error means the outgoing reports can no longer be trusted and the
	/// firmware must stop.
	pub fn on_packet(&mut self, packet: &[u8]) -> Result<()> {
		let levels = self
			.dispatcher
			.on_packet(packet, &mut self.scheduler, &mut self.nvram, self.clock)?;

		if let Some(levels) = levels {
			#[cfg(feature = "defmt")]
			defmt::trace!("Motor levels {}", levels);

			self.controller.set_motor_levels(levels);
		}

		Ok(())
	}

	/// The host cleared a halt on the OUT endpoint.
	pub fn on_endpoint_stall(&mut self) {
		self.dispatcher.on_stall();
	}

	/// Returns the next packet for the host, if there is one.
	pub fn on_transmit_ready(&mut self) -> Result<Option<Packet>> {
		let clock = self.clock;
		let controller = &mut self.controller;

		self.scheduler
			.next_packet(self.dispatcher.reports_suspended(), clock, |slot| controller.capture(slot, clock))
	}

	pub fn history(&self) -> &CommandHistory {
		self.dispatcher.history()
	}

	pub fn reports_sent(&self) -> u32 {
		self.scheduler.reports_sent()
	}

	pub fn failed_polls(&self) -> u32 {
		self.controller.failed_polls()
	}

	pub fn reports_suspended(&self) -> bool {
		self.dispatcher.reports_suspended()
	}

	pub fn controller(&self) -> &LegacyController<L> {
		&self.controller
	}

	pub fn controller_mut(&mut self) -> &mut LegacyController<L> {
		&mut self.controller
	}

	pub fn nvram(&self) -> &VirtualNvram<S> {
		&self.nvram
	}
}


/// Provides various configurations as to how the bridge behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeOptions {
	deadzone_radius: u8,
	stick_expansion: StickExpansion,
	framing: PacketFraming,
	home_latch_ms: u8,
	rumble: bool,
}

impl BridgeOptions {
	/// Sets the radius around the stick centre that reads as centred.
	///
	/// Default is [`DEFAULT_DEADZONE_RADIUS`].
	pub fn with_deadzone_radius(&mut self, deadzone_radius: u8) -> &mut Self {
		self.deadzone_radius = deadzone_radius;
		self
	}

	/// Sets how 8-bit stick axes are widened to 12 bits.
	///
	/// Default is `StickExpansion::Proportional`.
	pub fn with_stick_expansion(&mut self, stick_expansion: StickExpansion) -> &mut Self {
		self.stick_expansion = stick_expansion;
		self
	}

	/// Sets how the end of a host report is recognised.
	///
	/// Default is `PacketFraming::ShortPacket`.
	pub fn with_framing(&mut self, framing: PacketFraming) -> &mut Self {
		self.framing = framing;
		self
	}

	/// Sets how long (in milliseconds) the analog button is reported as Home.
	///
	/// Default is [`HOME_LATCH_MS`].
	pub fn with_home_latch_ms(&mut self, home_latch_ms: u8) -> &mut Self {
		self.home_latch_ms = home_latch_ms;
		self
	}

	/// Sets whether the legacy controller's motors are driven.
	///
	/// Note: the host still has to enable rumble before anything spins.
	///
	/// Default is `true`.
	pub fn with_rumble(&mut self, rumble: bool) -> &mut Self {
		self.rumble = rumble;
		self
	}

	pub fn deadzone_radius(&self) -> u8 {
		self.deadzone_radius
	}

	pub fn stick_expansion(&self) -> StickExpansion {
		self.stick_expansion
	}

	pub fn framing(&self) -> PacketFraming {
		self.framing
	}

	pub fn home_latch_ms(&self) -> u8 {
		self.home_latch_ms
	}

	pub fn rumble(&self) -> bool {
		self.rumble
	}

	fn translator(&self) -> Translator {
		Translator::new(self.deadzone_radius, self.stick_expansion)
	}
}

impl Default for BridgeOptions {
	fn default() -> Self {
		Self {
			deadzone_radius: DEFAULT_DEADZONE_RADIUS,
			stick_expansion: StickExpansion::default(),
			framing: PacketFraming::default(),
			home_latch_ms: HOME_LATCH_MS,
			rumble: true,
		}
	}
}
