// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.
//!
//! [`init`] brings up only what the supply check needs (clocks, timer,
//! ADC). Flash and USB are started later by the entry sequence through the
//! `Board` implementation in `boot.rs`.

use embedded_hal_0_2::adc::OneShot;
use rp2040_hal as hal;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use ymboot_common::protocol::APP_FLASH_OFFSET;
use ymboot_common::NorFlashStore;

use crate::flash::RpFlash;

pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
/// VSYS through the on-board 1/3 divider.
pub type VsysPin = hal::adc::AdcPin<
    hal::gpio::Pin<hal::gpio::bank0::Gpio29, hal::gpio::FunctionSioInput, hal::gpio::PullNone>,
>;

/// Static storage for UsbBusAllocator (required by usb-device for 'static lifetime).
static mut USB_BUS: Option<UsbBusAllocator<UsbBus>> = None;

/// Move the allocator into static storage. Called once per boot.
pub fn store_usb_bus(bus: UsbBusAllocator<UsbBus>) -> &'static UsbBusAllocator<UsbBus> {
    unsafe { (*core::ptr::addr_of_mut!(USB_BUS)).insert(bus) }
}

pub struct Peripherals {
    pub led_pin: LedPin,
    pub timer: hal::Timer,
    pub adc: hal::Adc,
    pub vsys: VsysPin,
    pub flash: NorFlashStore<RpFlash>,
    pub usb: Option<UsbPeripherals>,
}

pub struct UsbPeripherals {
    pub regs: hal::pac::USBCTRL_REGS,
    pub dpram: hal::pac::USBCTRL_DPRAM,
    pub clock: hal::clocks::UsbClock,
    pub resets: hal::pac::RESETS,
}

impl Peripherals {
    /// One blocking conversion of the VSYS channel.
    pub fn read_vsys(&mut self) -> u16 {
        let sample: Result<u16, _> = nb::block!(self.adc.read(&mut self.vsys));
        sample.unwrap_or(0)
    }
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        defmt::panic!("clock init failed");
    };

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let adc = hal::Adc::new(pac.ADC, &mut pac.RESETS);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let Ok(vsys) = hal::adc::AdcPin::new(pins.gpio29.into_floating_input()) else {
        defmt::panic!("GPIO29 cannot be used as ADC input");
    };

    Peripherals {
        led_pin: pins.gpio25.into_push_pull_output(),
        timer,
        adc,
        vsys,
        flash: NorFlashStore::new(RpFlash::new(APP_FLASH_OFFSET)),
        usb: Some(UsbPeripherals {
            regs: pac.USBCTRL_REGS,
            dpram: pac.USBCTRL_DPRAM,
            clock: clocks.usb_clock,
            resets: pac.RESETS,
        }),
    }
}
