// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abstraction over the register I/O backend (Hardware Abstraction Layer
//! (HAL)) and the monotonic time source.
//!
//! Main exports:
//! - [`Backend`]
//! - [`MmioBackend`]
//! - [`Timer`]

use crate::spec::registers::offsets;
use core::ptr::{read_volatile, write_volatile};
use core::time::Duration;

/// Memory-mapped I/O (MMIO) base address of a register block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Hash)]
pub struct MmioAddress(pub(crate) *mut u32);

impl MmioAddress {
    /// Adds the byte offset onto the address.
    const fn add_offset(self, offset: usize) -> Self {
        // SAFETY: We ensure on a higher level that the base address is valid
        // and that this will not wrap.
        let address = unsafe { self.0.byte_add(offset) };
        Self(address)
    }
}

fn assert_offset(offset: usize) {
    assert!(
        offset < offsets::MAX && offset % 4 == 0,
        "the offset should be a register within the block: {offset:#x}, expected: < {:#x}",
        offsets::MAX
    );
}

/// Abstraction over the register I/O of a USART/UART peripheral.
///
/// All registers are 32 bits wide. This acts as Hardware Abstraction Layer
/// (HAL).
pub trait Backend {
    /// Reads one register.
    ///
    /// This needs a mutable reference as reads can have side effects on the
    /// device, e.g., reading RDR clears `RXNE`.
    ///
    /// # Arguments
    ///
    /// - `offset`: Byte offset regarding the base address.
    ///
    /// # Safety
    ///
    /// Callers must ensure that the provided address is valid and safe to read.
    unsafe fn read_register(&mut self, offset: usize) -> u32;

    /// Writes one register.
    ///
    /// Writes can have side effects on the device, depending on the register.
    ///
    /// # Arguments
    ///
    /// - `offset`: Byte offset regarding the base address.
    ///
    /// # Safety
    ///
    /// Callers must ensure that the provided address is valid and safe to write.
    unsafe fn write_register(&mut self, offset: usize, value: u32);
}

/// MMIO-mapped USART/UART.
#[derive(Debug)]
pub struct MmioBackend(pub(crate) MmioAddress /* base address, non-null */);

impl Backend for MmioBackend {
    unsafe fn read_register(&mut self, offset: usize) -> u32 {
        assert_offset(offset);
        let address = self.0.add_offset(offset);

        // SAFETY: The caller ensured that the MMIO address is safe to use.
        unsafe { read_volatile(address.0) }
    }

    unsafe fn write_register(&mut self, offset: usize, value: u32) {
        assert_offset(offset);
        let address = self.0.add_offset(offset);
        // SAFETY: The caller ensured that the MMIO address is safe to use.
        unsafe { write_volatile(address.0, value) }
    }
}

/// Monotonic time source used to bound blocking operations.
///
/// The returned value is the time elapsed since an arbitrary but fixed
/// point, e.g., the system tick counter converted to a [`Duration`]. It must
/// never decrease.
pub trait Timer {
    /// Returns the current time.
    fn now(&self) -> Duration;
}

impl<T: Timer + ?Sized> Timer for &T {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
