// SPDX-License-Identifier: MIT OR Apache-2.0

//! # stm32mp1_uart
//!
//! Low-level polling driver for the USART/UART peripherals of the
//! [STM32MP1][rm] SoC family. Easy integration into Rust while providing
//! fine-grained control where needed (e.g, for boot loaders and kernel
//! drivers).
//!
//! See [`Uart`] to get started.
//!
//! ## Features
//!
//! - ✅ Blocking transmit and receive bounded by a monotonic deadline
//! - ✅ `no_std`-compatible and allocation-free by design
//! - ✅ One [`InterruptToken`] per interrupt for enable, disable and query,
//!   regardless of the control register holding the enable bit
//! - ✅ Two-axis state model ([`GlobalState`], [`ReceiveState`]) that rejects
//!   overlapping operations instead of queueing them
//! - ✅ Baud-rate divisor calculation for all prescalers and both
//!   oversampling modes
//! - ✅ Fully typed registers, derived directly from the
//!   [reference manual][rm]
//!
//! ## Focus, Scope & Limitations
//!
//! Pin multiplexing and the clock tree are out of scope: the integrator
//! routes the pins and passes the kernel clock frequency via
//! [`Config::frequency`]. Interrupt-driven and DMA transfers are not
//! implemented; the interrupt API only manages enable bits and flags for an
//! external interrupt handler.
//!
//! [rm]: https://www.st.com/resource/en/reference_manual/rm0436-stm32mp157-advanced-armbased-32bit-mpus-stmicroelectronics.pdf

#![no_std]
#![deny(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::must_use_candidate,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks
)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::all)]

#[cfg(test)]
extern crate std;

pub use crate::backend::{Backend, MmioBackend, Timer};
pub use crate::config::{AdvancedFeatures, BaudRate, Config, FifoConfig, Instance};
pub use crate::console::{CONSOLE_TIMEOUT, UartConsole, UartConsoleError};
pub use crate::error::*;
pub use crate::interrupt::{ControlRegister, EnableBit, InterruptToken, InvalidTokenError};
pub use crate::state::{ErrorCode, GlobalState, ReceiveState};

use crate::backend::MmioAddress;
use crate::spec::registers::{CR1, CR2, CR3, HwFlowControl, ICR, ISR, RQR, offsets};
use crate::spec::{DEFAULT_TIMEOUT, Oversampling};
use crate::state::{Direction, PeripheralState};
use core::time::Duration;
use log::{debug, trace, warn};

pub mod spec;

mod backend;
mod config;
mod console;
mod error;
mod interrupt;
mod state;

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// A data word moved by [`Uart::transmit`] and [`Uart::receive`].
///
/// Use `u8` for frames with up to 8 data bits and `u16` for 9 data bits
/// (9-bit frames without parity).
pub trait Word: Copy + private::Sealed {
    /// Whether the type can hold 9 data bits.
    const WIDE: bool;

    /// Returns the value for TDR.
    fn to_tdr(self) -> u32;

    /// Creates the word from the already masked RDR value.
    fn from_rdr(value: u16) -> Self;
}

impl Word for u8 {
    const WIDE: bool = false;

    fn to_tdr(self) -> u32 {
        u32::from(self)
    }

    fn from_rdr(value: u16) -> Self {
        value as Self
    }
}

impl Word for u16 {
    const WIDE: bool = true;

    fn to_tdr(self) -> u32 {
        u32::from(self & 0x1ff)
    }

    fn from_rdr(value: u16) -> Self {
        value
    }
}

/// Abstraction over one USART/UART instance of the STM32MP1 with access to
/// low-level details but also high usability for higher-level layers.
///
/// All reads and writes involving device register from/to that device operate
/// on the underlying hardware.
///
/// The handle owns the [`GlobalState`] and the [`ReceiveState`] of the
/// peripheral. Operations that would overlap with one in flight return a
/// `Busy` error and never touch the hardware.
///
/// # Example
///
/// ```rust,no_run
/// use core::time::Duration;
/// use stm32mp1_uart::{Config, Instance, Timer, Uart};
///
/// struct Ticks;
///
/// impl Timer for Ticks {
///     fn now(&self) -> Duration {
///         // Read the system tick counter here.
///         Duration::ZERO
///     }
/// }
///
/// let base = Instance::Uart4.base_address() as *mut u32;
/// let mut uart = unsafe { Uart::new_mmio(base, Instance::Uart4, Config::default(), Ticks) }
///     .expect("should be valid address");
/// uart.init().expect("should init device successfully");
/// uart.transmit(b"hello world!\r\n".as_slice(), Duration::from_millis(100))
///     .expect("should transmit data");
/// ```
///
/// # Sending and Receiving Data
///
/// - [`Uart::transmit`]: send all data words before a deadline
/// - [`Uart::receive`]: fill a buffer before a deadline
///
/// Both report the number of words moved if they stop early.
#[derive(Debug)]
pub struct Uart<B: Backend, T: Timer> {
    backend: B,
    timer: T,
    instance: Instance,
    // The currently active config.
    config: Config,
    state: PeripheralState,
    error_code: ErrorCode,
}

impl<T: Timer> Uart<MmioBackend, T> {
    /// Creates a new [`Uart`] backed by MMIO.
    ///
    /// The device is not touched until [`Self::init`].
    ///
    /// # Safety
    ///
    /// Callers must ensure that the address is valid and safe to use, and
    /// that it points to the register block of `instance`.
    pub unsafe fn new_mmio(
        base_address: *mut u32,
        instance: Instance,
        config: Config,
        timer: T,
    ) -> Result<Self, InvalidAddressError> {
        if base_address.is_null() {
            return Err(InvalidAddressError(MmioAddress(base_address)));
        }
        if (base_address as usize).checked_add(offsets::MAX).is_none() {
            return Err(InvalidAddressError(MmioAddress(base_address)));
        }

        let backend = MmioBackend(MmioAddress(base_address));

        // SAFETY: The caller ensured that the address is valid.
        Ok(unsafe { Self::new(backend, instance, config, timer) })
    }
}

impl<B: Backend, T: Timer> Uart<B, T> {
    /// Creates a new [`Uart`] on top of an arbitrary [`Backend`].
    ///
    /// The device is not touched until [`Self::init`].
    ///
    /// # Safety
    ///
    /// Callers must ensure that `backend` accesses the register block of
    /// `instance` and that it is valid and safe to use.
    #[must_use]
    pub const unsafe fn new(backend: B, instance: Instance, config: Config, timer: T) -> Self {
        Self {
            backend,
            timer,
            instance,
            config,
            state: PeripheralState::new(),
            error_code: ErrorCode::empty(),
        }
    }

    /* ----- Init, Setup ---------------------------------------------------- */

    /// Initializes the device according to the current [`Config`] so that
    /// afterwards, the device can properly receive and send data.
    ///
    /// The configuration is validated first; an invalid configuration
    /// leaves the hardware and the state untouched. The peripheral is
    /// disabled while the registers are programmed and then waits up to
    /// [`DEFAULT_TIMEOUT`] for the transmitter and receiver to acknowledge
    /// their enable.
    ///
    /// The serial config must match the expectations of the wire and the
    /// other side. Otherwise, garbage will be received.
    pub fn init(&mut self) -> Result<(), InitError> {
        let previous = self.state.global();
        if !self.state.begin_configuration() {
            return Err(InitError::Busy);
        }
        let divisor = match self.validated_divisor() {
            Ok(divisor) => divisor,
            Err(e) => {
                self.state.abort_configuration(previous);
                return Err(InitError::Configuration(e));
            }
        };

        // Most bits can only be written while the peripheral is disabled.
        let cr1 = self.cr1();
        self.write(offsets::CR1, cr1.difference(CR1::UE).bits());

        let config = &self.config;
        let mut cr1 = CR1::empty()
            .set_word_length(config.word_length)
            .set_parity(config.parity)
            .set_transfer_mode(config.mode);
        if config.oversampling == Oversampling::By8 {
            cr1 |= CR1::OVER8;
        }
        if config.fifo.is_some() {
            cr1 |= CR1::FIFOEN;
        }

        let advanced = &config.advanced;
        let mut cr2 = CR2::empty().set_stop_bits(config.stop_bits);
        cr2.set(CR2::TXINV, advanced.tx_invert);
        cr2.set(CR2::RXINV, advanced.rx_invert);
        cr2.set(CR2::DATAINV, advanced.data_invert);
        cr2.set(CR2::SWAP, advanced.swap);
        cr2.set(CR2::MSBFIRST, advanced.msb_first);
        if let Some(mode) = advanced.auto_baud_rate {
            cr2 = cr2.set_auto_baud_rate_mode(mode) | CR2::ABREN;
        }

        let mut cr3 = CR3::empty().set_hw_flow_control(config.flow_control);
        cr3.set(CR3::ONEBIT, config.one_bit_sample);
        cr3.set(CR3::OVRDIS, advanced.overrun_disable);
        if let Some(fifo) = config.fifo {
            cr3 = cr3
                .set_tx_fifo_threshold(fifo.tx_threshold)
                .set_rx_fifo_threshold(fifo.rx_threshold);
        }
        let presc = config.prescaler.to_raw_bits();
        let mode = config.mode;

        self.write(offsets::CR1, cr1.bits());
        self.write(offsets::CR2, cr2.bits());
        self.write(offsets::CR3, cr3.bits());
        self.write(offsets::BRR, u32::from(divisor));
        self.write(offsets::PRESC, presc);
        self.write(offsets::CR1, (cr1 | CR1::UE).bits());

        let mut ack = ISR::empty();
        if mode.has_tx() {
            ack |= ISR::TEACK;
        }
        if mode.has_rx() {
            ack |= ISR::REACK;
        }
        let deadline = self.timer.now().saturating_add(DEFAULT_TIMEOUT);
        while !self.isr().contains(ack) {
            if self.timer.now() >= deadline {
                warn!("{:?}: no enable acknowledge ({ack:?})", self.instance);
                self.state.configuration_failed(GlobalState::Timeout);
                return Err(InitError::Timeout);
            }
        }

        self.error_code = ErrorCode::empty();
        self.state.configured();
        debug!(
            "{:?}: initialized, {} baud, brr={divisor:#x}",
            self.instance,
            self.config.baud_rate.to_integer()
        );
        Ok(())
    }

    fn validated_divisor(&self) -> Result<u16, ConfigError> {
        self.config.validate(self.instance)?;
        self.config.divisor().map_err(ConfigError::InvalidBaudRate)
    }

    /// Replaces the [`Config`] and initializes the device with it.
    ///
    /// An invalid configuration is rejected before anything is changed and
    /// the previous configuration stays active.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), InitError> {
        if self.state.is_busy() {
            return Err(InitError::Busy);
        }
        config.validate(self.instance)?;
        self.config = config;
        self.init()
    }

    /// Disables the device and resets its control registers.
    ///
    /// Both state axes return to [`GlobalState::Reset`] and
    /// [`ReceiveState::Reset`]; [`Self::init`] must be called before the
    /// next transfer.
    pub fn deinit(&mut self) -> Result<(), InitError> {
        if self.state.is_busy() {
            return Err(InitError::Busy);
        }
        self.write(offsets::CR1, 0);
        self.write(offsets::CR2, 0);
        self.write(offsets::CR3, 0);
        self.error_code = ErrorCode::empty();
        self.state.reset();
        debug!("{:?}: deinitialized", self.instance);
        Ok(())
    }

    /* ----- User I/O ------------------------------------------------------- */

    /// Sends all data words to the remote and waits for the transmission to
    /// complete, unless `timeout` passes first.
    ///
    /// An empty `data` succeeds without touching the device.
    ///
    /// # Errors
    ///
    /// - [`TransferError::Busy`] if the transmitter is busy or the device is
    ///   not initialized. Nothing is touched then.
    /// - [`TransferError::Configuration`] if `W` can not carry the
    ///   configured frame.
    /// - [`TransferError::Hardware`] if receive errors latched in the
    ///   meantime. They are cleared and kept in [`Self::error_code`].
    /// - [`TransferError::Timeout`] if the deadline passed. A `completed`
    ///   equal to `data.len()` means that every word was written to TDR but
    ///   the last frame did not leave the shift register in time.
    pub fn transmit<W: Word>(
        &mut self,
        data: &[W],
        timeout: Duration,
    ) -> Result<(), TransferError> {
        self.check_transfer::<W>(Direction::Tx)?;
        if data.is_empty() {
            return Ok(());
        }
        let deadline = self.begin_transfer(Direction::Tx, timeout);

        for (completed, &word) in data.iter().enumerate() {
            self.wait_for(ISR::TXE, deadline, Direction::Tx, completed)?;
            self.write(offsets::TDR, word.to_tdr());
        }
        self.wait_for(ISR::TC, deadline, Direction::Tx, data.len())?;

        self.state.finish_transfer(Direction::Tx, GlobalState::Ready);
        Ok(())
    }

    /// Fills `buffer` with data words from the remote, unless `timeout`
    /// passes first.
    ///
    /// The parity bit is masked out of every word. An empty `buffer`
    /// succeeds without touching the device.
    ///
    /// # Errors
    ///
    /// - [`TransferError::Busy`] if the receiver is busy or the device is
    ///   not initialized. Nothing is touched then.
    /// - [`TransferError::Configuration`] if `W` can not carry the
    ///   configured frame.
    /// - [`TransferError::Hardware`] if receive errors latched. They are
    ///   cleared and kept in [`Self::error_code`].
    /// - [`TransferError::Timeout`] if the deadline passed.
    pub fn receive<W: Word>(
        &mut self,
        buffer: &mut [W],
        timeout: Duration,
    ) -> Result<(), TransferError> {
        self.check_transfer::<W>(Direction::Rx)?;
        if buffer.is_empty() {
            return Ok(());
        }
        let deadline = self.begin_transfer(Direction::Rx, timeout);
        let mask = self.config.word_length.data_mask(self.config.parity);

        for (completed, slot) in buffer.iter_mut().enumerate() {
            self.wait_for(ISR::RXNE, deadline, Direction::Rx, completed)?;
            let data = self.read(offsets::RDR) as u16 & mask;
            *slot = W::from_rdr(data);
        }

        self.state.finish_transfer(Direction::Rx, GlobalState::Ready);
        Ok(())
    }

    fn check_transfer<W: Word>(&self, direction: Direction) -> Result<(), TransferError> {
        if !self.state.can_begin_transfer(direction) {
            return Err(TransferError::Busy);
        }
        if self.config.needs_wide_words() && !W::WIDE {
            return Err(ConfigError::WordSizeMismatch.into());
        }
        Ok(())
    }

    /// Enters the busy state and returns the deadline.
    fn begin_transfer(&mut self, direction: Direction, timeout: Duration) -> Duration {
        let started = self.state.begin_transfer(direction);
        debug_assert!(started);
        self.error_code = ErrorCode::empty();
        self.timer.now().saturating_add(timeout)
    }

    /// Polls until `flag` is set.
    ///
    /// Leaves the busy state on error.
    fn wait_for(
        &mut self,
        flag: ISR,
        deadline: Duration,
        direction: Direction,
        completed: usize,
    ) -> Result<(), TransferError> {
        loop {
            let isr = self.isr();
            if isr.intersects(ISR::ERRORS) {
                self.clear_flags(ICR::for_errors(isr));
                let errors = ErrorCode::from_isr(isr);
                self.error_code |= errors;
                warn!(
                    "{:?}: {direction:?} stopped by {errors:?} after {completed} words",
                    self.instance
                );
                self.state.finish_transfer(direction, GlobalState::Error);
                return Err(TransferError::Hardware { errors, completed });
            }
            if isr.contains(flag) {
                return Ok(());
            }
            if self.timer.now() >= deadline {
                warn!(
                    "{:?}: {direction:?} timed out after {completed} words",
                    self.instance
                );
                self.state.finish_transfer(direction, GlobalState::Timeout);
                return Err(TransferError::Timeout { completed });
            }
        }
    }

    /* ----- Interrupts & Flags --------------------------------------------- */

    /// Sets the enable bit of the interrupt.
    pub fn enable_interrupt(&mut self, token: InterruptToken) -> Result<(), ConfigError> {
        self.check_token(token)?;
        let offset = token.control_register().offset();
        let value = self.read(offset) | token.enable_mask();
        self.write(offset, value);
        trace!("{:?}: enabled {token:?}", self.instance);
        Ok(())
    }

    /// Clears the enable bit of the interrupt.
    pub fn disable_interrupt(&mut self, token: InterruptToken) -> Result<(), ConfigError> {
        self.check_token(token)?;
        let offset = token.control_register().offset();
        let value = self.read(offset) & !token.enable_mask();
        self.write(offset, value);
        trace!("{:?}: disabled {token:?}", self.instance);
        Ok(())
    }

    /// Whether the flag of the interrupt is set in [`ISR`].
    ///
    /// This is independent of the enable bit.
    ///
    /// [`InterruptToken::ERR`] only reports [`ISR::PE`]. Framing, noise and
    /// overrun errors must be read from [`ISR::ERRORS`] via [`Self::isr`].
    pub fn is_interrupt_pending(&mut self, token: InterruptToken) -> Result<bool, ConfigError> {
        self.check_token(token)?;
        Ok(self.isr().intersects(token.status_mask()))
    }

    /// Whether the enable bit of the interrupt is set.
    pub fn is_interrupt_source_enabled(
        &mut self,
        token: InterruptToken,
    ) -> Result<bool, ConfigError> {
        self.check_token(token)?;
        let value = self.read(token.control_register().offset());
        Ok(value & token.enable_mask() != 0)
    }

    fn check_token(&self, token: InterruptToken) -> Result<(), ConfigError> {
        if self.instance.supports(token) {
            Ok(())
        } else {
            Err(ConfigError::UnsupportedInterrupt)
        }
    }

    /// Clears flags in [`ISR`] by writing `flags` to [`ICR`].
    ///
    /// Not every flag owns a clear bit, see [`ISR::clear_method`].
    pub fn clear_flags(&mut self, flags: ICR) {
        self.write(offsets::ICR, flags.bits());
    }

    /// Whether all of `flags` are set in [`ISR`].
    pub fn is_flag_set(&mut self, flags: ISR) -> bool {
        self.isr().contains(flags)
    }

    /* ----- Peripheral Control --------------------------------------------- */

    /// Issues the requests in `request`, e.g., [`RQR::SBKRQ`] to send a
    /// break.
    pub fn send_request(&mut self, request: RQR) {
        self.write(offsets::RQR, request.bits());
    }

    /// Discards the content of the receive and transmit data registers (or
    /// FIFOs).
    pub fn flush_data_registers(&mut self) {
        self.send_request(RQR::RXFRQ | RQR::TXFRQ);
    }

    /// Switches to sampling each bit once. Disables noise detection.
    pub fn enable_one_bit_sample(&mut self) {
        self.modify_cr3(|cr3| cr3 | CR3::ONEBIT);
        self.config.one_bit_sample = true;
    }

    /// Switches to sampling each bit three times.
    pub fn disable_one_bit_sample(&mut self) {
        self.modify_cr3(|cr3| cr3.difference(CR3::ONEBIT));
        self.config.one_bit_sample = false;
    }

    /// Enables the peripheral (`UE`).
    pub fn enable(&mut self) {
        self.modify_cr1(|cr1| cr1 | CR1::UE);
    }

    /// Disables the peripheral (`UE`). Ongoing frames are aborted.
    pub fn disable(&mut self) {
        self.modify_cr1(|cr1| cr1.difference(CR1::UE));
    }

    /// Enables the transmitter (`TE`).
    pub fn enable_tx(&mut self) {
        self.modify_cr1(|cr1| cr1 | CR1::TE);
    }

    /// Disables the transmitter (`TE`).
    pub fn disable_tx(&mut self) {
        self.modify_cr1(|cr1| cr1.difference(CR1::TE));
    }

    /// Changes the hardware flow control.
    ///
    /// This requires the peripheral to be disabled, see [`Self::disable`].
    pub fn set_hw_flow_control(
        &mut self,
        flow_control: HwFlowControl,
    ) -> Result<(), ConfigError> {
        if flow_control != HwFlowControl::None
            && !self.instance.has_flow_control()
        {
            return Err(ConfigError::UnsupportedFlowControl);
        }
        if self.cr1().contains(CR1::UE) {
            return Err(ConfigError::PeripheralEnabled);
        }
        self.modify_cr3(|cr3| cr3.set_hw_flow_control(flow_control));
        self.config.flow_control = flow_control;
        Ok(())
    }

    fn modify_cr1(&mut self, f: impl FnOnce(CR1) -> CR1) {
        let value = f(self.cr1());
        self.write(offsets::CR1, value.bits());
    }

    fn modify_cr3(&mut self, f: impl FnOnce(CR3) -> CR3) {
        let value = f(self.cr3());
        self.write(offsets::CR3, value.bits());
    }

    /* ----- State Getters -------------------------------------------------- */

    /// Returns the state of the handle and the transmitter.
    #[must_use]
    pub const fn global_state(&self) -> GlobalState {
        self.state.global()
    }

    /// Returns the state of the receiver.
    #[must_use]
    pub const fn receive_state(&self) -> ReceiveState {
        self.state.receive()
    }

    /// Returns the errors observed by the most recent transfer.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    /// Returns the currently active [`Config`].
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the instance this handle drives.
    #[must_use]
    pub const fn instance(&self) -> Instance {
        self.instance
    }

    /* ----- Typed Register Getters ----------------------------------------- */

    /// Fetches the current value from [`CR1`].
    pub fn cr1(&mut self) -> CR1 {
        CR1::from_bits_retain(self.read(offsets::CR1))
    }

    /// Fetches the current value from [`CR2`].
    pub fn cr2(&mut self) -> CR2 {
        CR2::from_bits_retain(self.read(offsets::CR2))
    }

    /// Fetches the current value from [`CR3`].
    pub fn cr3(&mut self) -> CR3 {
        CR3::from_bits_retain(self.read(offsets::CR3))
    }

    /// Fetches the current value from [`ISR`].
    pub fn isr(&mut self) -> ISR {
        ISR::from_bits_retain(self.read(offsets::ISR))
    }

    /// Fetches the current value from the BRR register.
    pub fn brr(&mut self) -> u16 {
        self.read(offsets::BRR) as u16
    }

    fn read(&mut self, offset: usize) -> u32 {
        // SAFETY: The backend addresses a valid register block (constructor
        // contract) and `offset` is one of `offsets`.
        unsafe { self.backend.read_register(offset) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: The backend addresses a valid register block (constructor
        // contract) and `offset` is one of `offsets`.
        unsafe { self.backend.write_register(offset, value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, MockTimer};
    use crate::spec::DivisorError;
    use crate::spec::registers::{
        AutoBaudRateMode, Parity, RxFifoThreshold, StopBits, TxFifoThreshold, WordLength,
    };
    use crate::spec::{Oversampling, Prescaler};
    use std::vec;

    fn new_uart(instance: Instance, config: Config) -> Uart<MockBackend, MockTimer> {
        // SAFETY: The mock has no hardware behind it.
        unsafe {
            Uart::new(
                MockBackend::new(),
                instance,
                config,
                MockTimer::new(Duration::from_millis(1)),
            )
        }
    }

    fn ready_uart(config: Config) -> Uart<MockBackend, MockTimer> {
        let mut uart = new_uart(Instance::Usart2, config);
        uart.init().unwrap();
        uart
    }

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[test]
    fn test_init_programs_registers() {
        let mut uart = ready_uart(Config::default());
        assert_eq!(uart.global_state(), GlobalState::Ready);
        assert_eq!(uart.receive_state(), ReceiveState::Ready);
        assert_eq!(uart.cr1(), CR1::UE | CR1::TE | CR1::RE);
        assert_eq!(uart.cr2(), CR2::empty());
        assert_eq!(uart.cr3(), CR3::empty());
        // 64 MHz / 115200
        assert_eq!(uart.brr(), 556);
        assert_eq!(uart.backend.register(offsets::PRESC), 0);
    }

    #[test]
    fn test_init_programs_all_fields() {
        let config = Config {
            frequency: 16_000_000,
            oversampling: Oversampling::By8,
            one_bit_sample: true,
            fifo: Some(FifoConfig {
                tx_threshold: TxFifoThreshold::Half,
                rx_threshold: RxFifoThreshold::Full,
            }),
            word_length: WordLength::NineBits,
            stop_bits: StopBits::Two,
            parity: Parity::Even,
            advanced: AdvancedFeatures {
                swap: true,
                msb_first: true,
                auto_baud_rate: Some(AutoBaudRateMode::FallingEdge),
                ..AdvancedFeatures::default()
            },
            ..Config::default()
        };
        let mut uart = ready_uart(config);

        let cr1 = uart.cr1();
        assert!(cr1.contains(CR1::OVER8 | CR1::FIFOEN | CR1::UE));
        assert_eq!(cr1.word_length(), Some(WordLength::NineBits));
        assert_eq!(cr1.parity(), Parity::Even);

        let cr2 = uart.cr2();
        assert_eq!(cr2.stop_bits(), StopBits::Two);
        assert!(cr2.contains(CR2::SWAP | CR2::MSBFIRST | CR2::ABREN));
        assert!(!cr2.contains(CR2::TXINV));
        assert_eq!(cr2.auto_baud_rate_mode(), AutoBaudRateMode::FallingEdge);

        let cr3 = uart.cr3();
        assert!(cr3.contains(CR3::ONEBIT));
        assert_eq!(cr3.tx_fifo_threshold(), Some(TxFifoThreshold::Half));
        assert_eq!(cr3.rx_fifo_threshold(), Some(RxFifoThreshold::Full));

        // USARTDIV 0x116 packed for oversampling by 8
        assert_eq!(uart.brr(), 0x113);
    }

    #[test]
    fn test_init_prescaler() {
        let config = Config {
            prescaler: Prescaler::Div4,
            ..Config::default()
        };
        let mut uart = ready_uart(config);
        assert_eq!(uart.brr(), 139);
        assert_eq!(uart.backend.register(offsets::PRESC), 0b10);
    }

    #[test]
    fn test_init_rejects_invalid_config_without_access() {
        let config = Config {
            baud_rate: BaudRate::Custom(0),
            ..Config::default()
        };
        let mut uart = new_uart(Instance::Usart1, config);
        assert_eq!(
            uart.init(),
            Err(InitError::Configuration(ConfigError::InvalidBaudRate(
                DivisorError::ZeroBaudRate
            )))
        );
        assert_eq!(uart.backend.accesses, 0);
        assert_eq!(uart.global_state(), GlobalState::Reset);
        assert_eq!(uart.receive_state(), ReceiveState::Reset);

        let config = Config {
            flow_control: HwFlowControl::RtsCts,
            ..Config::default()
        };
        let mut uart = new_uart(Instance::Uart4, config);
        assert_eq!(
            uart.init(),
            Err(InitError::Configuration(ConfigError::UnsupportedFlowControl))
        );
        assert_eq!(uart.backend.accesses, 0);
    }

    #[test]
    fn test_init_timeout() {
        // SAFETY: The mock has no hardware behind it.
        let mut uart = unsafe {
            Uart::new(
                MockBackend {
                    no_ack: true,
                    ..MockBackend::new()
                },
                Instance::Usart3,
                Config::default(),
                MockTimer::new(Duration::from_secs(3600)),
            )
        };
        assert_eq!(uart.init(), Err(InitError::Timeout));
        assert_eq!(uart.global_state(), GlobalState::Timeout);
        assert_eq!(uart.receive_state(), ReceiveState::Ready);
    }

    #[test]
    fn test_transfer_before_init_is_busy() {
        let mut uart = new_uart(Instance::Usart1, Config::default());
        assert_eq!(uart.transmit(b"a".as_slice(), TIMEOUT), Err(TransferError::Busy));
        let mut buffer = [0_u8; 1];
        assert_eq!(uart.receive(&mut buffer, TIMEOUT), Err(TransferError::Busy));
        assert_eq!(uart.backend.accesses, 0);
    }

    #[test]
    fn test_busy_axis_rejects_without_access() {
        let mut uart = ready_uart(Config::default());
        assert!(uart.state.begin_transfer(Direction::Tx));
        let accesses = uart.backend.accesses;

        assert_eq!(uart.transmit(b"a".as_slice(), TIMEOUT), Err(TransferError::Busy));
        let mut buffer = [0_u8; 1];
        assert_eq!(uart.receive(&mut buffer, TIMEOUT), Err(TransferError::Busy));
        assert_eq!(uart.init(), Err(InitError::Busy));
        assert_eq!(uart.deinit(), Err(InitError::Busy));
        assert_eq!(uart.reconfigure(Config::default()), Err(InitError::Busy));
        assert_eq!(uart.backend.accesses, accesses);
        assert_eq!(uart.global_state(), GlobalState::BusyTx);

        uart.state.finish_transfer(Direction::Tx, GlobalState::Ready);
        assert!(uart.state.begin_transfer(Direction::Rx));
        assert_eq!(uart.receive(&mut buffer, TIMEOUT), Err(TransferError::Busy));
        assert_eq!(uart.backend.accesses, accesses);
    }

    #[test]
    fn test_transmit() {
        let mut uart = ready_uart(Config::default());
        uart.transmit(b"hello".as_slice(), TIMEOUT).unwrap();
        assert_eq!(uart.backend.transmitted, vec![0x68, 0x65, 0x6c, 0x6c, 0x6f]);
        assert_eq!(uart.global_state(), GlobalState::Ready);
        assert_eq!(uart.error_code(), ErrorCode::empty());
    }

    #[test]
    fn test_empty_transfers_touch_nothing() {
        let mut uart = ready_uart(Config::default());
        let accesses = uart.backend.accesses;
        uart.transmit::<u8>(&[], TIMEOUT).unwrap();
        uart.receive::<u8>(&mut [], TIMEOUT).unwrap();
        assert_eq!(uart.backend.accesses, accesses);
        assert_eq!(uart.global_state(), GlobalState::Ready);
    }

    #[test]
    fn test_transmit_timeout_without_progress() {
        let mut uart = ready_uart(Config::default());
        uart.backend.tx_stall_after = Some(0);
        assert_eq!(
            uart.transmit(b"abc".as_slice(), TIMEOUT),
            Err(TransferError::Timeout { completed: 0 })
        );
        assert_eq!(uart.global_state(), GlobalState::Timeout);
        assert!(uart.backend.transmitted.is_empty());
    }

    #[test]
    fn test_transmit_timeout_after_progress() {
        let mut uart = ready_uart(Config::default());
        uart.backend.tx_stall_after = Some(2);
        let err = uart.transmit(b"abcd".as_slice(), TIMEOUT).unwrap_err();
        assert_eq!(err, TransferError::Timeout { completed: 2 });
        assert_eq!(err.completed(), 2);
        assert_eq!(uart.backend.transmitted, vec![0x61, 0x62]);

        // All words were written but the transmission never completed.
        let mut uart = ready_uart(Config::default());
        uart.backend.tx_stall_after = Some(3);
        assert_eq!(
            uart.transmit(b"abc".as_slice(), TIMEOUT),
            Err(TransferError::Timeout { completed: 3 })
        );
    }

    #[test]
    fn test_transmit_timeout_while_draining() {
        let mut uart = ready_uart(Config::default());
        uart.backend.tx_stall_after = Some(2);
        let err = uart.transmit(b"ab".as_slice(), TIMEOUT).unwrap_err();
        assert_eq!(err, TransferError::Timeout { completed: 2 });
        assert_eq!(uart.backend.transmitted, vec![0x61, 0x62]);
        assert_eq!(uart.global_state(), GlobalState::Timeout);
    }

    #[test]
    fn test_recovery_after_timeout() {
        let mut uart = ready_uart(Config::default());
        uart.backend.tx_stall_after = Some(0);
        assert!(uart.transmit(b"a".as_slice(), TIMEOUT).is_err());
        assert_eq!(uart.global_state(), GlobalState::Timeout);

        uart.backend.tx_stall_after = None;
        uart.transmit(b"a".as_slice(), TIMEOUT).unwrap();
        assert_eq!(uart.global_state(), GlobalState::Ready);

        let mut buffer = [0_u8; 1];
        assert!(uart.receive(&mut buffer, TIMEOUT).is_err());
        assert_eq!(uart.global_state(), GlobalState::Timeout);
        uart.backend.rx_queue.push_back(0x7a);
        uart.receive(&mut buffer, TIMEOUT).unwrap();
        assert_eq!(buffer, [0x7a]);
        assert_eq!(uart.global_state(), GlobalState::Ready);
        assert_eq!(uart.receive_state(), ReceiveState::Ready);
    }

    #[test]
    fn test_receive_masks_data() {
        let mut uart = ready_uart(Config::default());
        uart.backend.rx_queue.extend([0x41, 0x1c2]);
        let mut buffer = [0_u8; 2];
        uart.receive(&mut buffer, TIMEOUT).unwrap();
        assert_eq!(buffer, [0x41, 0xc2]);

        let config = Config {
            parity: Parity::Odd,
            ..Config::default()
        };
        let mut uart = ready_uart(config);
        uart.backend.rx_queue.extend([0xc1]);
        let mut buffer = [0_u8; 1];
        uart.receive(&mut buffer, TIMEOUT).unwrap();
        assert_eq!(buffer, [0x41]);
    }

    #[test]
    fn test_receive_timeout() {
        let mut uart = ready_uart(Config::default());
        uart.backend.rx_queue.extend([1, 2]);
        let mut buffer = [0_u8; 4];
        assert_eq!(
            uart.receive(&mut buffer, TIMEOUT),
            Err(TransferError::Timeout { completed: 2 })
        );
        assert_eq!(buffer, [1, 2, 0, 0]);
        assert_eq!(uart.global_state(), GlobalState::Timeout);
        assert_eq!(uart.receive_state(), ReceiveState::Ready);
    }

    #[test]
    fn test_receive_hardware_error() {
        let mut uart = ready_uart(Config::default());
        uart.backend.rx_queue.extend([1, 2, 3]);
        uart.backend.errors_after_rx = Some((1, ISR::ORE | ISR::FE));
        let mut buffer = [0_u8; 3];
        assert_eq!(
            uart.receive(&mut buffer, TIMEOUT),
            Err(TransferError::Hardware {
                errors: ErrorCode::OVERRUN | ErrorCode::FRAME,
                completed: 1
            })
        );
        assert_eq!(uart.backend.latched, ISR::empty());
        assert_eq!(uart.error_code(), ErrorCode::OVERRUN | ErrorCode::FRAME);
        assert_eq!(uart.global_state(), GlobalState::Error);
        assert_eq!(uart.receive_state(), ReceiveState::Ready);

        // The next transfer starts with a clean error code.
        uart.backend.errors_after_rx = None;
        let mut buffer = [0_u8; 2];
        uart.receive(&mut buffer, TIMEOUT).unwrap();
        assert_eq!(buffer, [2, 3]);
        assert_eq!(uart.error_code(), ErrorCode::empty());
        assert_eq!(uart.global_state(), GlobalState::Ready);
    }

    #[test]
    fn test_transmit_hardware_error() {
        let mut uart = ready_uart(Config::default());
        uart.backend.latched = ISR::NE;
        assert_eq!(
            uart.transmit(b"ab".as_slice(), TIMEOUT),
            Err(TransferError::Hardware {
                errors: ErrorCode::NOISE,
                completed: 0
            })
        );
        assert_eq!(uart.global_state(), GlobalState::Error);
        assert!(uart.backend.transmitted.is_empty());
        uart.transmit(b"ab".as_slice(), TIMEOUT).unwrap();
        assert_eq!(uart.global_state(), GlobalState::Ready);
    }

    #[test]
    fn test_nine_bit_words() {
        let config = Config {
            word_length: WordLength::NineBits,
            ..Config::default()
        };
        let mut uart = ready_uart(config);
        let accesses = uart.backend.accesses;
        let mut narrow = [0_u8; 1];
        assert_eq!(
            uart.receive(&mut narrow, TIMEOUT),
            Err(TransferError::Configuration(ConfigError::WordSizeMismatch))
        );
        assert_eq!(
            uart.transmit(&[0_u8], TIMEOUT),
            Err(TransferError::Configuration(ConfigError::WordSizeMismatch))
        );
        assert_eq!(uart.backend.accesses, accesses);
        assert_eq!(uart.global_state(), GlobalState::Ready);

        uart.backend.rx_queue.extend([0x1ff]);
        let mut wide = [0_u16; 1];
        uart.receive(&mut wide, TIMEOUT).unwrap();
        assert_eq!(wide, [0x1ff]);

        uart.transmit(&[0x1a5_u16, 0xffff], TIMEOUT).unwrap();
        assert_eq!(uart.backend.transmitted, vec![0x1a5, 0x1ff]);
    }

    #[test]
    fn test_interrupt_tokens() {
        let mut uart = ready_uart(Config::default());

        uart.enable_interrupt(InterruptToken::RXNE).unwrap();
        uart.enable_interrupt(InterruptToken::LBD).unwrap();
        uart.enable_interrupt(InterruptToken::ERR).unwrap();
        assert!(uart.cr1().contains(CR1::RXNEIE));
        assert!(uart.cr2().contains(CR2::LBDIE));
        assert!(uart.cr3().contains(CR3::EIE));
        assert_eq!(uart.is_interrupt_source_enabled(InterruptToken::RXNE), Ok(true));
        assert_eq!(uart.is_interrupt_source_enabled(InterruptToken::TC), Ok(false));

        uart.disable_interrupt(InterruptToken::RXNE).unwrap();
        assert_eq!(uart.is_interrupt_source_enabled(InterruptToken::RXNE), Ok(false));
        // Neighbouring bits are untouched.
        assert!(uart.cr1().contains(CR1::UE | CR1::TE | CR1::RE));

        assert_eq!(uart.is_interrupt_pending(InterruptToken::TXE), Ok(true));
        assert_eq!(uart.is_interrupt_pending(InterruptToken::RXNE), Ok(false));
        uart.backend.rx_queue.push_back(0);
        assert_eq!(uart.is_interrupt_pending(InterruptToken::RXNE), Ok(true));
    }

    #[test]
    fn test_error_interrupt_pending() {
        let mut uart = ready_uart(Config::default());
        uart.backend.latched = ISR::ORE;
        assert_eq!(uart.is_interrupt_pending(InterruptToken::ERR), Ok(false));
        assert!(uart.isr().intersects(ISR::ERRORS));

        uart.backend.latched = ISR::PE;
        assert_eq!(uart.is_interrupt_pending(InterruptToken::ERR), Ok(true));
    }

    #[test]
    fn test_unsupported_interrupt_touches_nothing() {
        let mut uart = new_uart(Instance::Uart5, Config::default());
        let token = InterruptToken::CTS;
        let err = Err(ConfigError::UnsupportedInterrupt);
        assert_eq!(uart.enable_interrupt(token), err);
        assert_eq!(uart.disable_interrupt(token), err);
        assert_eq!(uart.is_interrupt_pending(token), Err(ConfigError::UnsupportedInterrupt));
        assert_eq!(
            uart.is_interrupt_source_enabled(token),
            Err(ConfigError::UnsupportedInterrupt)
        );
        assert_eq!(uart.backend.accesses, 0);
    }

    #[test]
    fn test_flags() {
        let mut uart = ready_uart(Config::default());
        uart.backend.latched = ISR::PE | ISR::ORE;
        assert!(uart.is_flag_set(ISR::PE));
        assert!(uart.is_flag_set(ISR::PE | ISR::ORE));
        uart.clear_flags(ICR::PECF);
        assert!(!uart.is_flag_set(ISR::PE));
        assert!(uart.is_flag_set(ISR::ORE));
    }

    #[test]
    fn test_requests() {
        let mut uart = ready_uart(Config::default());
        uart.backend.rx_queue.extend([1, 2, 3]);
        uart.flush_data_registers();
        assert!(uart.backend.rx_queue.is_empty());
        assert_eq!(
            uart.backend.register(offsets::RQR),
            (RQR::RXFRQ | RQR::TXFRQ).bits()
        );
        uart.send_request(RQR::SBKRQ);
        assert_eq!(uart.backend.register(offsets::RQR), RQR::SBKRQ.bits());
    }

    #[test]
    fn test_peripheral_control() {
        let mut uart = ready_uart(Config::default());

        uart.disable_tx();
        assert!(!uart.cr1().contains(CR1::TE));
        uart.enable_tx();
        assert!(uart.cr1().contains(CR1::TE));

        uart.enable_one_bit_sample();
        assert!(uart.cr3().contains(CR3::ONEBIT));
        assert!(uart.config().one_bit_sample);
        uart.disable_one_bit_sample();
        assert!(!uart.cr3().contains(CR3::ONEBIT));

        assert_eq!(
            uart.set_hw_flow_control(HwFlowControl::RtsCts),
            Err(ConfigError::PeripheralEnabled)
        );
        uart.disable();
        assert!(!uart.cr1().contains(CR1::UE));
        uart.set_hw_flow_control(HwFlowControl::RtsCts).unwrap();
        assert_eq!(uart.cr3().hw_flow_control(), HwFlowControl::RtsCts);
        assert_eq!(uart.config().flow_control, HwFlowControl::RtsCts);
        uart.enable();
        assert!(uart.cr1().contains(CR1::UE));

        let mut uart = new_uart(Instance::Uart4, Config::default());
        assert_eq!(
            uart.set_hw_flow_control(HwFlowControl::Cts),
            Err(ConfigError::UnsupportedFlowControl)
        );
        assert_eq!(uart.set_hw_flow_control(HwFlowControl::None), Ok(()));
    }

    #[test]
    fn test_deinit() {
        let mut uart = ready_uart(Config::default());
        uart.deinit().unwrap();
        assert_eq!(uart.cr1(), CR1::empty());
        assert_eq!(uart.global_state(), GlobalState::Reset);
        assert_eq!(uart.receive_state(), ReceiveState::Reset);
        assert_eq!(uart.transmit(b"a".as_slice(), TIMEOUT), Err(TransferError::Busy));

        uart.init().unwrap();
        assert_eq!(uart.global_state(), GlobalState::Ready);
    }

    #[test]
    fn test_reconfigure() {
        let mut uart = ready_uart(Config::default());
        let config = Config {
            baud_rate: BaudRate::Baud9600,
            ..Config::default()
        };
        uart.reconfigure(config).unwrap();
        assert_eq!(uart.brr(), 6667);
        assert_eq!(uart.config().baud_rate, BaudRate::Baud9600);

        let accesses = uart.backend.accesses;
        let config = Config {
            baud_rate: BaudRate::Custom(12_500_001),
            ..Config::default()
        };
        assert_eq!(
            uart.reconfigure(config),
            Err(InitError::Configuration(ConfigError::InvalidBaudRate(
                DivisorError::BaudRateTooHigh(12_500_001)
            )))
        );
        assert_eq!(uart.backend.accesses, accesses);
        assert_eq!(uart.config().baud_rate, BaudRate::Baud9600);
        assert_eq!(uart.global_state(), GlobalState::Ready);
    }

    #[test]
    fn test_new_mmio_rejects_invalid_address() {
        let timer = MockTimer::new(Duration::ZERO);
        // SAFETY: The address is rejected before use.
        let result = unsafe {
            Uart::new_mmio(core::ptr::null_mut(), Instance::Usart1, Config::default(), &timer)
        };
        assert!(result.is_err());

        // SAFETY: The address is rejected before use.
        let result = unsafe {
            Uart::new_mmio(
                (usize::MAX - 4) as *mut u32,
                Instance::Usart1,
                Config::default(),
                &timer,
            )
        };
        assert!(result.is_err());
    }
}
