// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB CDC byte link with microsecond-timer deadlines.

use rp2040_hal as hal;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;
use ymboot_common::Transport;

/// Upper bound on pushing one reply out to the host.
const SEND_TIMEOUT_MS: u32 = 100;

pub struct UsbTransport {
    serial: SerialPort<'static, UsbBus>,
    usb_dev: UsbDevice<'static, UsbBus>,
    timer: hal::Timer,
}

impl UsbTransport {
    pub fn new(usb_bus: &'static UsbBusAllocator<UsbBus>, timer: hal::Timer) -> Self {
        let serial = SerialPort::new(usb_bus);
        let Ok(builder) = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x2E8A, 0x000A)).strings(&[
            StringDescriptors::default()
                .manufacturer("ADNT")
                .product("ymboot")
                .serial_number("0001"),
        ]) else {
            defmt::panic!("USB string descriptors rejected");
        };
        let usb_dev = builder.device_class(usbd_serial::USB_CLASS_CDC).build();

        Self {
            serial,
            usb_dev,
            timer,
        }
    }

    /// Poll USB device. Must be called frequently.
    pub fn poll(&mut self) -> bool {
        self.usb_dev.poll(&mut [&mut self.serial])
    }

    fn now_us(&self) -> u64 {
        self.timer.get_counter().ticks()
    }

    fn deadline(&self, timeout_ms: u32) -> u64 {
        self.now_us() + timeout_ms as u64 * 1000
    }
}

impl Transport for UsbTransport {
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> usize {
        let deadline = self.deadline(timeout_ms);
        let mut filled = 0;

        while filled < buf.len() {
            self.poll();
            if let Ok(n) = self.serial.read(&mut buf[filled..]) {
                filled += n;
            }
            if filled < buf.len() && self.now_us() >= deadline {
                break;
            }
        }

        filled
    }

    fn send(&mut self, buf: &[u8]) {
        let deadline = self.deadline(SEND_TIMEOUT_MS);
        let mut offset = 0;

        while offset < buf.len() {
            match self.serial.write(&buf[offset..]) {
                Ok(n) => offset += n,
                Err(UsbError::WouldBlock) => {
                    self.poll();
                }
                Err(_) => break,
            }
            if self.now_us() >= deadline {
                defmt::warn!("send timed out, {=usize} bytes dropped", buf.len() - offset);
                return;
            }
        }

        // Replies must leave before a jump or a reset.
        while matches!(self.serial.flush(), Err(UsbError::WouldBlock)) {
            if self.now_us() >= deadline {
                break;
            }
            self.poll();
        }
    }
}
