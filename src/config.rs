// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for [`Uart`].
//!
//! [`Uart`]: crate::Uart

use crate::error::ConfigError;
use crate::interrupt::InterruptToken;
use crate::spec::registers::{
    AutoBaudRateMode, HwFlowControl, Parity, RxFifoThreshold, StopBits, TransferMode,
    TxFifoThreshold, WordLength,
};
use crate::spec::{DivisorError, Oversampling, Prescaler, calc_divisor};

/// The speed of data transmission, measured in symbols per second (or bits, in
/// the case of simple UARTs).
///
/// This type is a convenient and non-ABI compatible abstraction. Use
/// [`calc_divisor`] to get the value for [`BRR`].
///
/// [`BRR`]: crate::spec::registers::offsets::BRR
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BaudRate {
    // List of typical baud rates.
    Baud921600,
    Baud460800,
    Baud230400,
    #[default]
    Baud115200,
    Baud57600,
    Baud38400,
    Baud19200,
    Baud9600,
    Baud4800,
    Baud2400,
    Baud1200,
    Custom(u32),
}

impl BaudRate {
    /// Returns the value as corresponding integer.
    #[must_use]
    pub const fn to_integer(self) -> u32 {
        match self {
            Self::Baud921600 => 921_600,
            Self::Baud460800 => 460_800,
            Self::Baud230400 => 230_400,
            Self::Baud115200 => 115_200,
            Self::Baud57600 => 57600,
            Self::Baud38400 => 38400,
            Self::Baud19200 => 19200,
            Self::Baud9600 => 9600,
            Self::Baud4800 => 4800,
            Self::Baud2400 => 2400,
            Self::Baud1200 => 1200,
            Self::Custom(val) => val,
        }
    }

    /// Creates the type from an integer representation of the baud rate.
    ///
    /// Typical rates map onto their named variant.
    #[must_use]
    pub const fn from_integer(value: u32) -> Self {
        match value {
            921_600 => Self::Baud921600,
            460_800 => Self::Baud460800,
            230_400 => Self::Baud230400,
            115_200 => Self::Baud115200,
            57600 => Self::Baud57600,
            38400 => Self::Baud38400,
            19200 => Self::Baud19200,
            9600 => Self::Baud9600,
            4800 => Self::Baud4800,
            2400 => Self::Baud2400,
            1200 => Self::Baud1200,
            baud_rate => Self::Custom(baud_rate),
        }
    }
}

/// Thresholds for FIFO mode.
///
/// The thresholds only matter for the FIFO threshold interrupts
/// ([`InterruptToken::TXFT`], [`InterruptToken::RXFT`]).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FifoConfig {
    /// Level of the TXFIFO that raises [`InterruptToken::TXFT`].
    pub tx_threshold: TxFifoThreshold,
    /// Level of the RXFIFO that raises [`InterruptToken::RXFT`].
    pub rx_threshold: RxFifoThreshold,
}

/// Pin- and bit-level features that are rarely needed.
///
/// All of them are disabled by default.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AdvancedFeatures {
    /// Inverts the level of the TX pin.
    pub tx_invert: bool,
    /// Inverts the level of the RX pin.
    pub rx_invert: bool,
    /// Inverts the data bits (1 = L, 0 = H).
    pub data_invert: bool,
    /// Swaps the TX and RX pins.
    pub swap: bool,
    /// Disables overrun detection; new data overwrites unread data.
    pub overrun_disable: bool,
    /// Enables auto baud-rate detection with the given mode.
    pub auto_baud_rate: Option<AutoBaudRateMode>,
    /// Transmits and receives the most significant bit first.
    pub msb_first: bool,
}

/// Configuration for [`Uart`].
///
/// Please note that sender and receiver **must agree** on the transmission
/// settings, otherwise you receive garbage.
///
/// [`Uart`]: crate::Uart
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    // Device Config
    /// Frequency of the kernel clock feeding the peripheral in Hz.
    ///
    /// This must be taken from the clock tree by the integrator.
    pub frequency: u32,
    /// The division factor applied to the kernel clock.
    pub prescaler: Prescaler,
    /// Sampling rate of the receiver.
    pub oversampling: Oversampling,
    /// Samples each bit once instead of three times. Disables noise
    /// detection.
    pub one_bit_sample: bool,
    /// Whether to use the FIFOs and with which thresholds.
    pub fifo: Option<FifoConfig>,

    // Transmission Config
    /// The baud rate to use.
    pub baud_rate: BaudRate,
    /// The length of each transmitted frame, parity bit included.
    pub word_length: WordLength,
    /// Number of stop bits.
    pub stop_bits: StopBits,
    /// Whether parity bits should be used.
    pub parity: Parity,
    /// Which directions to enable.
    pub mode: TransferMode,
    /// Which hardware flow control lines to use.
    pub flow_control: HwFlowControl,

    // Other config
    /// Rarely used features.
    pub advanced: AdvancedFeatures,
}

impl Default for Config {
    fn default() -> Self {
        // Default is 8-N-1 connection.
        Self {
            frequency: 64_000_000,
            prescaler: Prescaler::Div1,
            oversampling: Oversampling::By16,
            one_bit_sample: false,
            fifo: None,

            baud_rate: BaudRate::Baud115200,
            word_length: WordLength::EightBits,
            stop_bits: StopBits::One,
            parity: Parity::None,
            mode: TransferMode::TxRx,
            flow_control: HwFlowControl::None,

            advanced: AdvancedFeatures::default(),
        }
    }
}

impl Config {
    /// Calculates the value for the BRR register.
    pub const fn divisor(&self) -> Result<u16, DivisorError> {
        calc_divisor(
            self.frequency,
            self.baud_rate.to_integer(),
            self.prescaler,
            self.oversampling,
        )
    }

    /// Checks that the configuration can be applied to `instance`.
    ///
    /// This does not touch any hardware.
    pub const fn validate(&self, instance: Instance) -> Result<(), ConfigError> {
        if let Err(e) = self.divisor() {
            return Err(ConfigError::InvalidBaudRate(e));
        }
        if !matches!(self.flow_control, HwFlowControl::None) && !instance.has_flow_control() {
            return Err(ConfigError::UnsupportedFlowControl);
        }
        Ok(())
    }

    /// Whether received data words need more than 8 bits.
    #[must_use]
    pub const fn needs_wide_words(&self) -> bool {
        self.word_length.data_mask(self.parity) > 0xff
    }
}

/// The USART/UART instances of the STM32MP1.
///
/// The instances differ in the lines they implement: UART4 and UART5 have
/// no CTS/RTS.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Instance {
    /// USART1.
    Usart1,
    /// USART2.
    Usart2,
    /// USART3.
    Usart3,
    /// UART4.
    Uart4,
    /// UART5.
    Uart5,
    /// USART6.
    Usart6,
    /// UART7.
    Uart7,
    /// UART8.
    Uart8,
}

impl Instance {
    /// Every instance.
    pub const ALL: [Self; 8] = [
        Self::Usart1,
        Self::Usart2,
        Self::Usart3,
        Self::Uart4,
        Self::Uart5,
        Self::Usart6,
        Self::Uart7,
        Self::Uart8,
    ];

    /// Returns the physical base address of the register block on the
    /// STM32MP15x.
    #[must_use]
    pub const fn base_address(self) -> usize {
        match self {
            Self::Usart1 => 0x5c00_0000,
            Self::Usart2 => 0x4000_e000,
            Self::Usart3 => 0x4000_f000,
            Self::Uart4 => 0x4001_0000,
            Self::Uart5 => 0x4001_1000,
            Self::Usart6 => 0x4400_3000,
            Self::Uart7 => 0x4001_8000,
            Self::Uart8 => 0x4001_9000,
        }
    }

    /// Whether the instance implements the CTS and RTS lines.
    #[must_use]
    pub const fn has_flow_control(self) -> bool {
        !matches!(self, Self::Uart4 | Self::Uart5)
    }

    /// Whether the instance implements the interrupt.
    #[must_use]
    pub fn supports(self, token: InterruptToken) -> bool {
        token != InterruptToken::CTS || self.has_flow_control()
    }
}
