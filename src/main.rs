#![no_std]
#![no_main]

// Ensures that the program is halted on panic.
extern crate panic_halt;

// Routes log output over RTT.
#[cfg(feature = "defmt")]
use defmt_rtt as _;

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::{OutputPin, StatefulOutputPin};

use pico_psx_procon::error::{BridgeError, Result};
use pico_psx_procon::nvram::{NvStore, RamStore, USER_CALIBRATION_LEN};
use pico_psx_procon::*;

// The "rp_pico" crate is a Board Support Package for the RP2040 Hardware Abstraction Layer.
// Whenever the "bsp" alias is used, it is directly referencing the rp_pico crate.
use rp_pico as bsp;

// The macro for the start-up function.
use bsp::entry;

// Shorter alias for the Peripheral Access Crate.
use bsp::hal::pac;

// Shorter alias for the Hardware Abstraction Layer.
use bsp::hal;

use hal::fugit::RateExtU32;
use hal::gpio::{bank0::Gpio20, FunctionSioInput, FunctionSpi, Interrupt, Pin, PullUp};
use hal::pac::interrupt;
use hal::Clock;

// USB Device support.
use usb_device::{class_prelude::*, prelude::*};
use usbd_hid::hid_class::HIDClass;


/// The legacy controller's clock rate. It misbehaves much above this.
const LEGACY_BAUD_RATE_KHZ: u32 = 250;

type AckPin = Pin<Gpio20, FunctionSioInput, PullUp>;

/// Raised on every acknowledge pulse from the legacy controller.
static ACK: AckFlag = AckFlag::new();

/// The acknowledge pin, shared with its interrupt to clear it.
static ACK_PIN: Mutex<RefCell<Option<AckPin>>> = Mutex::new(RefCell::new(None));


#[entry]
fn main() -> ! {
	// Get access to the RP2040 peripherals.
	let mut pac = pac::Peripherals::take().unwrap();

	// Set up the watchdog driver - needed by the clock setup code.
	let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

	// Configure the clocks.
	let clocks = hal::clocks::init_clocks_and_plls(
		bsp::XOSC_CRYSTAL_FREQ,
		pac.XOSC,
		pac.CLOCKS,
		pac.PLL_SYS,
		pac.PLL_USB,
		&mut pac.RESETS,
		&mut watchdog,
	)
		.ok()
		.unwrap();

	let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

	// Set up the pins.
	let sio = hal::Sio::new(pac.SIO);
	let pins = bsp::Pins::new(
		pac.IO_BANK0,
		pac.PADS_BANK0,
		sio.gpio_bank0,
		&mut pac.RESETS,
	);

	let mut led = pins.led.into_push_pull_output();

	// The legacy controller's data line is open collector.
	let miso = pins.gpio16.into_pull_type::<PullUp>().into_function::<FunctionSpi>();
	let sclk = pins.gpio18.into_function::<FunctionSpi>();
	let mosi = pins.gpio19.into_function::<FunctionSpi>();
	let mut select = pins.gpio17.into_push_pull_output();
	select.set_high().unwrap();

	let spi = hal::spi::Spi::<_, _, _, 8>::new(pac.SPI0, (mosi, miso, sclk)).init(
		&mut pac.RESETS,
		clocks.peripheral_clock.freq(),
		LEGACY_BAUD_RATE_KHZ.kHz(),
		embedded_hal::spi::MODE_3,
	);

	let ack = pins.gpio20.into_pull_up_input();
	ack.set_interrupt_enabled(Interrupt::EdgeHigh, true);
	critical_section::with(|cs| ACK_PIN.borrow(cs).replace(Some(ack)));

	unsafe {
		// Enable the acknowledge interrupt
		pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
	}

	// The SPI block only shifts MSB first.
	let transport = LegacyTransport::new(spi, select, timer, &ACK).with_bit_reversal(true);

	// TODO: Back the user calibration with a flash sector so it survives power cycles.
	let store = RamStore::<USER_CALIBRATION_LEN>::new();

	let mut bridge = Bridge::new(transport, store, &BridgeOptions::default());

	// Set up the USB driver.
	let usb_bus = UsbBusAllocator::new(hal::usb::UsbBus::new(
		pac.USBCTRL_REGS,
		pac.USBCTRL_DPRAM,
		clocks.usb_clock,
		true,
		&mut pac.RESETS,
	));

	let mut hid = HIDClass::new_ep_in_out(&usb_bus, PROCON_REPORT_DESCRIPTOR, USB_POLL_RATE_MS);

	let mut usb_dev = UsbDeviceBuilder::new(&usb_bus, UsbVidPid(USB_VID, USB_PID))
		.strings(&[StringDescriptors::default()
			.manufacturer("Nintendo Co., Ltd.")
			.product("Pro Controller")
			.serial_number("000000000001")
		])
		.unwrap()
		.device_class(0x00)
		.build();

	let mut inbound = [0u8; REPORT_SIZE];
	let mut outbound = [0u8; REPORT_SIZE];
	let mut staged = 0;
	let mut was_configured = false;
	let mut last_heartbeat = 0;

	#[cfg(feature = "defmt")]
	defmt::info!("Bridge ready");

	loop {
		let millis = (timer.get_counter().ticks() / 1_000) as u32;
		bridge.set_millis(millis);

		usb_dev.poll(&mut [&mut hid]);

		let configured = usb_dev.state() == UsbDeviceState::Configured;
		if was_configured && !configured {
			// A bus reset drops whatever the host was sending.
			bridge.on_endpoint_stall();
			staged = 0;
		}
		was_configured = configured;

		if !configured {
			continue;
		}

		if let Ok(length) = hid.pull_raw_output(&mut inbound) {
			if let Err(error) = feed(&mut bridge, &inbound[..length]) {
				halt(&bridge, error);
			}
		}

		if staged == 0 {
			match stage(&mut bridge, &mut outbound) {
				Ok(length) => staged = length,
				Err(error) => halt(&bridge, error),
			}
		}

		if staged != 0 && hid.push_raw_input(&outbound[..staged]).is_ok() {
			staged = 0;
		}

		if millis.wrapping_sub(last_heartbeat) >= 1_000 {
			last_heartbeat = millis;
			led.toggle().unwrap();
		}
	}
}


/// Hands a report from the host to the bridge a packet at a time.
fn feed<L: LegacyLink, S: NvStore>(bridge: &mut Bridge<L, S>, report: &[u8]) -> Result<()> {
	for packet in report.chunks(PACKET_SIZE) {
		bridge.on_packet(packet)?;
	}

	// On the wire, such reports end with an empty packet.
	if report.len() % PACKET_SIZE == 0 && report.len() < REPORT_SIZE {
		bridge.on_packet(&[])?;
	}

	Ok(())
}


/// Collects the bridge's next report into `report`. Returns its length, 0 if there is none.
fn stage<L: LegacyLink, S: NvStore>(bridge: &mut Bridge<L, S>, report: &mut [u8; REPORT_SIZE]) -> Result<usize> {
	let mut length = 0;

	while let Some(packet) = bridge.on_transmit_ready()? {
		report[length..length + packet.len()].copy_from_slice(packet.as_bytes());
		length += packet.len();

		if packet.is_last() || length == REPORT_SIZE {
			break;
		}
	}

	Ok(length)
}


/// Stops everything, leaving the last reports received for a debugger.
fn halt<L: LegacyLink, S: NvStore>(bridge: &Bridge<L, S>, _error: BridgeError) -> ! {
	#[cfg(feature = "defmt")]
	{
		defmt::error!("Halting: {}", _error);
		for entry in bridge.history().newest_first() {
			defmt::error!("  {:02x}", entry);
		}
	}

	#[cfg(not(feature = "defmt"))]
	let _ = bridge;

	loop {
		cortex_m::asm::wfi();
	}
}


#[interrupt]
fn IO_IRQ_BANK0() {
	critical_section::with(|cs| {
		if let Some(ack) = ACK_PIN.borrow(cs).borrow_mut().as_mut() {
			if ack.interrupt_status(Interrupt::EdgeHigh) {
				ACK.raise();
				ack.clear_interrupt(Interrupt::EdgeHigh);
			}
		}
	});
}
