// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Board glue for the entry sequence and the hand-off to the application.
//!
//! The application runs in place from flash: its vector table sits at the
//! start of the image, VTOR is pointed there and the core jumps to its
//! reset handler with its initial stack pointer.

use embedded_hal::digital::OutputPin;
use rp2040_hal as hal;
use usb_device::class_prelude::UsbBusAllocator;
use ymboot_common::protocol::{FLASH_BASE, FLASH_SIZE};
use ymboot_common::{Board, NorFlashStore};

use crate::flash::{self, RpFlash};
use crate::peripherals::{self, Peripherals};
use crate::usb_transport::UsbTransport;

const RAM_START: u32 = 0x2000_0000;
/// SRAM0-3 striped plus SRAM4/5.
const RAM_END: u32 = 0x2004_2000;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// Stack in SRAM, Thumb reset handler inside the image.
    fn is_valid_for(&self, image_start: u32) -> bool {
        let sp_ok = (RAM_START..=RAM_END).contains(&self.initial_sp);
        let reset = self.reset_vector & !1;
        let reset_ok = (self.reset_vector & 1) == 1
            && (image_start..FLASH_BASE + FLASH_SIZE).contains(&reset);
        sp_ok && reset_ok
    }
}

/// Quiesce interrupts and the peripherals the bootloader used, so the
/// application starts from a clean slate.
unsafe fn prepare_for_handoff() {
    cortex_m::interrupt::disable();

    // Clear and disable everything in the NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    // Hold USB and ADC in reset: the host sees a disconnect before the
    // application enumerates again.
    const RESETS_RESET: *mut u32 = 0x4000_C000 as *mut u32;
    const ADC_RESET_BIT: u32 = 1 << 0;
    const USBCTRL_RESET_BIT: u32 = 1 << 24;
    let reset = RESETS_RESET.read_volatile();
    RESETS_RESET.write_volatile(reset | ADC_RESET_BIT | USBCTRL_RESET_BIT);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn relocate_vector_table(addr: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(addr);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}

impl Board for Peripherals {
    type Link = UsbTransport;
    type Flash = NorFlashStore<RpFlash>;
    type Delay = hal::Timer;

    fn supply_sample(&mut self) -> u16 {
        self.read_vsys()
    }

    fn init_hardware(&mut self) {
        flash::init();
        self.led_pin.set_high().ok();
    }

    fn init_transport(&mut self) -> UsbTransport {
        let Some(mut usb) = self.usb.take() else {
            defmt::panic!("USB peripherals already taken");
        };

        let usb_bus = UsbBusAllocator::new(hal::usb::UsbBus::new(
            usb.regs,
            usb.dpram,
            usb.clock,
            true,
            &mut usb.resets,
        ));

        defmt::println!("USB CDC initialized");
        UsbTransport::new(peripherals::store_usb_bus(usb_bus), self.timer)
    }

    fn flash_and_delay(&mut self) -> (&mut Self::Flash, &mut Self::Delay) {
        (&mut self.flash, &mut self.timer)
    }

    fn jump_to_application(&mut self, entry: u32) {
        let vt = unsafe { VectorTable::read_from(entry) };
        if !vt.is_valid_for(entry) {
            defmt::println!(
                "No application at 0x{:08x} (sp=0x{:08x}, reset=0x{:08x})",
                entry,
                vt.initial_sp,
                vt.reset_vector
            );
            return;
        }

        self.led_pin.set_low().ok();
        unsafe {
            prepare_for_handoff();
            relocate_vector_table(entry);
            jump_to_firmware(vt.initial_sp, vt.reset_vector);
        }
    }

    fn system_reset(&mut self) -> ! {
        cortex_m::peripheral::SCB::sys_reset()
    }
}
