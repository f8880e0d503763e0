// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Constants, Register Offsets, Register Bits, and Divisor Math.
//!
//! Models the raw low-level details of the STM32MP1 USART/UART as of the
//! [reference manual], and avoids too opinionated abstractions.
//!
//! [reference manual]: https://www.st.com/resource/en/reference_manual/rm0436-stm32mp157-advanced-armbased-32bit-mpus-stmicroelectronics.pdf

use core::time::Duration;

pub use crate::spec::errors::*;

/// Highest accepted baud rate.
///
/// Derived from the maximum kernel clock of the family (100 MHz) divided by
/// the smallest oversampling (8).
pub const MAX_BAUD_RATE: u32 = 12_500_000;

/// Smallest USARTDIV the baud-rate generator accepts.
pub const BRR_MIN: u32 = 0x10;

/// Largest USARTDIV the baud-rate generator accepts.
pub const BRR_MAX: u32 = 0xFFFF;

/// Depth of the transmit and receive FIFO (each).
pub const FIFO_SIZE: usize = 16;

/// Timeout used for polling operations the driver issues on its own, such as
/// waiting for the enable acknowledge during initialization.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(0x1FF_FFFF);

/// Division factors selected by the PRESC register, indexed by its raw value.
pub const PRESCALER_DIVIDERS: [u16; 12] = [1, 2, 4, 6, 8, 10, 12, 16, 32, 64, 128, 256];

mod errors {
    use core::error::Error;
    use core::fmt::{self, Display, Formatter};

    /// Error that is returned when [`calc_divisor`] cannot derive a value
    /// for the BRR register.
    ///
    /// [`calc_divisor`]: crate::spec::calc_divisor
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum DivisorError {
        /// A baud rate of zero was requested.
        ZeroBaudRate,
        /// The requested baud rate exceeds [`MAX_BAUD_RATE`].
        ///
        /// [`MAX_BAUD_RATE`]: crate::spec::MAX_BAUD_RATE
        BaudRateTooHigh(u32),
        /// The kernel clock frequency is zero.
        ZeroFrequency,
        /// The resulting USARTDIV lies outside of
        /// [`BRR_MIN`]..=[`BRR_MAX`].
        ///
        /// [`BRR_MIN`]: crate::spec::BRR_MIN
        /// [`BRR_MAX`]: crate::spec::BRR_MAX
        OutOfRange {
            /// The computed USARTDIV.
            usartdiv: u64,
        },
    }

    impl Display for DivisorError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self {
                Self::ZeroBaudRate => write!(f, "baud rate must not be zero"),
                Self::BaudRateTooHigh(baud_rate) => write!(
                    f,
                    "baud rate {baud_rate} exceeds the maximum of {}",
                    crate::spec::MAX_BAUD_RATE
                ),
                Self::ZeroFrequency => write!(f, "kernel clock frequency must not be zero"),
                Self::OutOfRange { usartdiv } => write!(
                    f,
                    "divisor {usartdiv:#x} is outside of the programmable range {:#x}..={:#x}",
                    crate::spec::BRR_MIN,
                    crate::spec::BRR_MAX
                ),
            }
        }
    }

    impl Error for DivisorError {}
}

/// Oversampling method of the receiver, stored in [`CR1::OVER8`].
///
/// [`CR1::OVER8`]: registers::CR1::OVER8
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Oversampling {
    /// Oversampling by 16. Better tolerance to clock deviation.
    #[default]
    By16,
    /// Oversampling by 8. Allows up to half the kernel clock as baud rate
    /// base.
    By8,
}

/// Kernel clock prescaler, stored in the PRESC register.
///
/// This type is a convenient and non-ABI compatible abstraction. ABI
/// compatibility is given via [`Prescaler::from_raw_bits`] and
/// [`Prescaler::to_raw_bits`].
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Prescaler {
    #[default]
    Div1,
    Div2,
    Div4,
    Div6,
    Div8,
    Div10,
    Div12,
    Div16,
    Div32,
    Div64,
    Div128,
    Div256,
}

impl Prescaler {
    /// All prescaler settings in register order.
    pub const ALL: [Self; 12] = [
        Self::Div1,
        Self::Div2,
        Self::Div4,
        Self::Div6,
        Self::Div8,
        Self::Div10,
        Self::Div12,
        Self::Div16,
        Self::Div32,
        Self::Div64,
        Self::Div128,
        Self::Div256,
    ];

    /// Returns the division factor applied to the kernel clock.
    #[must_use]
    pub const fn divider(self) -> u16 {
        PRESCALER_DIVIDERS[self.to_raw_bits() as usize]
    }

    /// Translates the raw PRESC value into the corresponding prescaler.
    ///
    /// Values above `0b1011` are reserved and yield `None`.
    #[must_use]
    pub const fn from_raw_bits(bits: u32) -> Option<Self> {
        let bits = bits & 0xf;
        if bits as usize >= Self::ALL.len() {
            return None;
        }
        Some(Self::ALL[bits as usize])
    }

    /// Translates the value into the raw PRESC encoding.
    #[must_use]
    pub const fn to_raw_bits(self) -> u32 {
        self as u32
    }
}

/// USARTDIV for oversampling by 16, rounded to the nearest integer.
///
/// The caller must ensure `baud_rate != 0`.
#[must_use]
pub const fn div_sampling16(frequency: u32, baud_rate: u32, prescaler: Prescaler) -> u64 {
    let scaled_freq = (frequency / prescaler.divider() as u32) as u64;
    let baud_rate = baud_rate as u64;
    (scaled_freq + baud_rate / 2) / baud_rate
}

/// USARTDIV for oversampling by 8, rounded to the nearest integer.
///
/// This is the value before [`brr_from_sampling8`] is applied. The caller
/// must ensure `baud_rate != 0`.
#[must_use]
pub const fn div_sampling8(frequency: u32, baud_rate: u32, prescaler: Prescaler) -> u64 {
    let scaled_freq = (frequency / prescaler.divider() as u32) as u64;
    let baud_rate = baud_rate as u64;
    (scaled_freq * 2 + baud_rate / 2) / baud_rate
}

/// Packs a USARTDIV computed for oversampling by 8 into the BRR layout.
///
/// `BRR[15:4] = USARTDIV[15:4]`, `BRR[3]` is kept cleared and
/// `BRR[2:0] = USARTDIV[3:0] >> 1`.
#[must_use]
pub const fn brr_from_sampling8(usartdiv: u16) -> u16 {
    (usartdiv & 0xfff0) | ((usartdiv & 0x000f) >> 1)
}

/// Reverses [`brr_from_sampling8`]. The bit dropped by the packing is lost.
#[must_use]
pub const fn sampling8_from_brr(brr: u16) -> u16 {
    (brr & 0xfff0) | ((brr & 0x0007) << 1)
}

/// Calculates the BRR value for the given kernel clock frequency, baud rate,
/// prescaler and oversampling.
///
/// # Arguments
/// - `frequency`: The UART kernel clock frequency in Hz, as reported by the
///   clock tree.
/// - `baud_rate`: The requested baud rate. Must be in `1..=MAX_BAUD_RATE`,
///   see [`MAX_BAUD_RATE`].
/// - `prescaler`: The division factor applied to `frequency` first.
/// - `oversampling`: The receiver oversampling.
pub const fn calc_divisor(
    frequency: u32,
    baud_rate: u32,
    prescaler: Prescaler,
    oversampling: Oversampling,
) -> Result<u16, DivisorError> {
    if baud_rate == 0 {
        return Err(DivisorError::ZeroBaudRate);
    }
    if baud_rate > MAX_BAUD_RATE {
        return Err(DivisorError::BaudRateTooHigh(baud_rate));
    }
    if frequency == 0 {
        return Err(DivisorError::ZeroFrequency);
    }

    let usartdiv = match oversampling {
        Oversampling::By16 => div_sampling16(frequency, baud_rate, prescaler),
        Oversampling::By8 => div_sampling8(frequency, baud_rate, prescaler),
    };
    if usartdiv < BRR_MIN as u64 || usartdiv > BRR_MAX as u64 {
        return Err(DivisorError::OutOfRange { usartdiv });
    }

    let usartdiv = usartdiv as u16;
    match oversampling {
        Oversampling::By16 => Ok(usartdiv),
        Oversampling::By8 => Ok(brr_from_sampling8(usartdiv)),
    }
}

/// Similar to [`calc_divisor`] but with a known BRR value to calculate the
/// effective baud rate, rounded to the nearest integer.
///
/// Useful after auto baud-rate detection, when the hardware has written BRR
/// itself. Returns `None` if the BRR value encodes a zero divisor.
#[must_use]
pub const fn calc_baud_rate(
    frequency: u32,
    brr: u16,
    prescaler: Prescaler,
    oversampling: Oversampling,
) -> Option<u32> {
    let scaled_freq = (frequency / prescaler.divider() as u32) as u64;
    let (numerator, usartdiv) = match oversampling {
        Oversampling::By16 => (scaled_freq, brr as u64),
        Oversampling::By8 => (scaled_freq * 2, sampling8_from_brr(brr) as u64),
    };
    if usartdiv == 0 {
        return None;
    }
    Some(((numerator + usartdiv / 2) / usartdiv) as u32)
}

/// Exposes low-level information about the on-chip register layout and provides
/// types that model individual registers.
///
/// The getters and setters in this module operate exclusively on raw bit
/// representations within the local computing context. They are limited to
/// extracting or updating the corresponding fields and do not perform direct
/// hardware access.
pub mod registers {
    use bitflags::bitflags;

    /// Provides the register byte offsets from the base address.
    pub mod offsets {
        /// Size of the register block in bytes.
        ///
        /// Every valid offset is smaller than this value.
        pub const MAX: usize = 0x30;

        /// Control Register 1 (CR1).
        pub const CR1: usize = 0x00;

        /// Control Register 2 (CR2).
        pub const CR2: usize = 0x04;

        /// Control Register 3 (CR3).
        pub const CR3: usize = 0x08;

        /// Baud Rate Register (BRR).
        pub const BRR: usize = 0x0c;

        /// Guard Time and Prescaler Register (GTPR), smartcard/IrDA only.
        pub const GTPR: usize = 0x10;

        /// Receiver Timeout Register (RTOR).
        pub const RTOR: usize = 0x14;

        /// Request Register (RQR). Write-only.
        pub const RQR: usize = 0x18;

        /// Interrupt and Status Register (ISR). Read-only.
        pub const ISR: usize = 0x1c;

        /// Interrupt flag Clear Register (ICR). Write-only.
        pub const ICR: usize = 0x20;

        /// Receive Data Register (RDR).
        pub const RDR: usize = 0x24;

        /// Transmit Data Register (TDR).
        pub const TDR: usize = 0x28;

        /// Prescaler Register (PRESC).
        pub const PRESC: usize = 0x2c;
    }

    bitflags! {
        /// Typing of Control Register 1 (CR1).
        ///
        /// Holds the enable bits of the peripheral, transmitter and
        /// receiver, most interrupt enables and the frame format.
        ///
        /// This is a **read/write** register.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct CR1: u32 {
            /// USART enable (UE).
            const UE = 1 << 0;
            /// USART enabled in low-power mode (UESM).
            const UESM = 1 << 1;
            /// Receiver enable (RE).
            const RE = 1 << 2;
            /// Transmitter enable (TE).
            const TE = 1 << 3;
            /// IDLE interrupt enable.
            const IDLEIE = 1 << 4;
            /// RXNE/RXFNE interrupt enable.
            const RXNEIE = 1 << 5;
            /// Transmission complete interrupt enable.
            const TCIE = 1 << 6;
            /// TXE/TXFNF interrupt enable.
            const TXEIE = 1 << 7;
            /// Parity error interrupt enable.
            const PEIE = 1 << 8;
            /// Parity selection: set for odd parity.
            const PS = 1 << 9;
            /// Parity control enable.
            const PCE = 1 << 10;
            /// Receiver wake-up method: set for address mark.
            const WAKE = 1 << 11;
            /// Low bit of [`WordLength`].
            const M0 = 1 << 12;
            /// Mute mode enable.
            const MME = 1 << 13;
            /// Character match interrupt enable.
            const CMIE = 1 << 14;
            /// Oversampling by 8 when set, by 16 otherwise.
            const OVER8 = 1 << 15;
            /// Driver enable de-assertion time (5 bits).
            const DEDT = 0x1f << 16;
            /// Driver enable assertion time (5 bits).
            const DEAT = 0x1f << 21;
            /// Receiver timeout interrupt enable.
            const RTOIE = 1 << 26;
            /// End of block interrupt enable.
            const EOBIE = 1 << 27;
            /// High bit of [`WordLength`].
            const M1 = 1 << 28;
            /// FIFO mode enable.
            const FIFOEN = 1 << 29;
            /// TXFIFO empty interrupt enable.
            const TXFEIE = 1 << 30;
            /// RXFIFO full interrupt enable.
            const RXFFIE = 1 << 31;
        }
    }

    impl CR1 {
        /// Returns the [`WordLength`], or `None` for the reserved encoding.
        #[must_use]
        pub const fn word_length(self) -> Option<WordLength> {
            let m0 = (self.bits() >> 12) & 1;
            let m1 = (self.bits() >> 28) & 1;
            WordLength::from_raw_bits((m1 << 1) | m0)
        }

        /// Sets the [`WordLength`].
        #[must_use]
        pub const fn set_word_length(self, value: WordLength) -> Self {
            let raw = value.to_raw_bits();
            let bits = self.difference(Self::M0.union(Self::M1)).bits();
            Self::from_bits_retain(bits | ((raw & 1) << 12) | (((raw >> 1) & 1) << 28))
        }

        /// Returns the [`Parity`].
        #[must_use]
        pub const fn parity(self) -> Parity {
            Parity::from_raw_bits((self.bits() >> 9) & 0b11)
        }

        /// Sets the [`Parity`].
        #[must_use]
        pub const fn set_parity(self, value: Parity) -> Self {
            let bits = self.difference(Self::PS.union(Self::PCE)).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 9))
        }

        /// Returns the [`TransferMode`], or `None` if neither transmitter nor
        /// receiver is enabled.
        #[must_use]
        pub const fn transfer_mode(self) -> Option<TransferMode> {
            TransferMode::from_raw_bits((self.bits() >> 2) & 0b11)
        }

        /// Sets the [`TransferMode`].
        #[must_use]
        pub const fn set_transfer_mode(self, value: TransferMode) -> Self {
            let bits = self.difference(Self::RE.union(Self::TE)).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 2))
        }
    }

    bitflags! {
        /// Typing of Control Register 2 (CR2).
        ///
        /// Holds stop bits, LIN, pin inversion, auto baud-rate and the
        /// character match address.
        ///
        /// This is a **read/write** register.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct CR2: u32 {
            /// 7-bit address detection when set, 4-bit otherwise.
            const ADDM7 = 1 << 4;
            /// LIN break detection length: set for 11 bits.
            const LBDL = 1 << 5;
            /// LIN break detection interrupt enable.
            const LBDIE = 1 << 6;
            /// Low bit of [`StopBits`].
            const STOP0 = 1 << 12;
            /// High bit of [`StopBits`].
            const STOP1 = 1 << 13;
            /// LIN mode enable.
            const LINEN = 1 << 14;
            /// Swap TX/RX pins.
            const SWAP = 1 << 15;
            /// RX pin active level inversion.
            const RXINV = 1 << 16;
            /// TX pin active level inversion.
            const TXINV = 1 << 17;
            /// Binary data inversion.
            const DATAINV = 1 << 18;
            /// Most significant bit first.
            const MSBFIRST = 1 << 19;
            /// Auto baud-rate detection enable.
            const ABREN = 1 << 20;
            /// Low bit of [`AutoBaudRateMode`].
            const ABRMODE0 = 1 << 21;
            /// High bit of [`AutoBaudRateMode`].
            const ABRMODE1 = 1 << 22;
            /// Receiver timeout enable.
            const RTOEN = 1 << 23;
            /// Character match address (8 bits).
            const ADD = 0xff << 24;
        }
    }

    impl CR2 {
        /// Returns the [`StopBits`].
        #[must_use]
        pub const fn stop_bits(self) -> StopBits {
            StopBits::from_raw_bits((self.bits() >> 12) & 0b11)
        }

        /// Sets the [`StopBits`].
        #[must_use]
        pub const fn set_stop_bits(self, value: StopBits) -> Self {
            let bits = self.difference(Self::STOP0.union(Self::STOP1)).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 12))
        }

        /// Returns the [`AutoBaudRateMode`].
        #[must_use]
        pub const fn auto_baud_rate_mode(self) -> AutoBaudRateMode {
            AutoBaudRateMode::from_raw_bits((self.bits() >> 21) & 0b11)
        }

        /// Sets the [`AutoBaudRateMode`].
        #[must_use]
        pub const fn set_auto_baud_rate_mode(self, value: AutoBaudRateMode) -> Self {
            let bits = self.difference(Self::ABRMODE0.union(Self::ABRMODE1)).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 21))
        }

        /// Returns the character match address.
        #[must_use]
        pub const fn address(self) -> u8 {
            (self.bits() >> 24) as u8
        }

        /// Sets the character match address.
        #[must_use]
        pub const fn set_address(self, address: u8) -> Self {
            let bits = self.difference(Self::ADD).bits();
            Self::from_bits_retain(bits | ((address as u32) << 24))
        }
    }

    bitflags! {
        /// Typing of Control Register 3 (CR3).
        ///
        /// Holds the error interrupt enable, flow control, sampling method
        /// and the FIFO thresholds.
        ///
        /// This is a **read/write** register.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct CR3: u32 {
            /// Error interrupt enable (frame, noise, overrun).
            const EIE = 1 << 0;
            /// IrDA mode enable.
            const IREN = 1 << 1;
            /// IrDA low-power.
            const IRLP = 1 << 2;
            /// Half-duplex selection.
            const HDSEL = 1 << 3;
            /// Smartcard NACK enable.
            const NACK = 1 << 4;
            /// Smartcard mode enable.
            const SCEN = 1 << 5;
            /// DMA enable receiver.
            const DMAR = 1 << 6;
            /// DMA enable transmitter.
            const DMAT = 1 << 7;
            /// RTS enable.
            const RTSE = 1 << 8;
            /// CTS enable.
            const CTSE = 1 << 9;
            /// CTS interrupt enable.
            const CTSIE = 1 << 10;
            /// One sample bit method enable.
            const ONEBIT = 1 << 11;
            /// Overrun disable.
            const OVRDIS = 1 << 12;
            /// DMA disable on reception error.
            const DDRE = 1 << 13;
            /// Driver enable mode.
            const DEM = 1 << 14;
            /// Driver enable polarity: set for active low.
            const DEP = 1 << 15;
            /// Smartcard auto-retry count (3 bits).
            const SCARCNT = 0b111 << 17;
            /// Low bit of the wake-up from low-power interrupt selection.
            const WUS0 = 1 << 20;
            /// High bit of the wake-up from low-power interrupt selection.
            const WUS1 = 1 << 21;
            /// Wake-up from low-power mode interrupt enable.
            const WUFIE = 1 << 22;
            /// TXFIFO threshold interrupt enable.
            const TXFTIE = 1 << 23;
            /// Transmission complete before guard time interrupt enable.
            const TCBGTIE = 1 << 24;
            /// Receive FIFO threshold configuration (3 bits).
            const RXFTCFG = 0b111 << 25;
            /// RXFIFO threshold interrupt enable.
            const RXFTIE = 1 << 28;
            /// Transmit FIFO threshold configuration (3 bits).
            const TXFTCFG = 0b111 << 29;
        }
    }

    impl CR3 {
        /// Returns the [`HwFlowControl`].
        #[must_use]
        pub const fn hw_flow_control(self) -> HwFlowControl {
            HwFlowControl::from_raw_bits((self.bits() >> 8) & 0b11)
        }

        /// Sets the [`HwFlowControl`].
        #[must_use]
        pub const fn set_hw_flow_control(self, value: HwFlowControl) -> Self {
            let bits = self.difference(Self::RTSE.union(Self::CTSE)).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 8))
        }

        /// Returns the [`RxFifoThreshold`], or `None` for a reserved encoding.
        #[must_use]
        pub const fn rx_fifo_threshold(self) -> Option<RxFifoThreshold> {
            RxFifoThreshold::from_raw_bits((self.bits() >> 25) & 0b111)
        }

        /// Sets the [`RxFifoThreshold`].
        #[must_use]
        pub const fn set_rx_fifo_threshold(self, value: RxFifoThreshold) -> Self {
            let bits = self.difference(Self::RXFTCFG).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 25))
        }

        /// Returns the [`TxFifoThreshold`], or `None` for a reserved encoding.
        #[must_use]
        pub const fn tx_fifo_threshold(self) -> Option<TxFifoThreshold> {
            TxFifoThreshold::from_raw_bits((self.bits() >> 29) & 0b111)
        }

        /// Sets the [`TxFifoThreshold`].
        #[must_use]
        pub const fn set_tx_fifo_threshold(self, value: TxFifoThreshold) -> Self {
            let bits = self.difference(Self::TXFTCFG).bits();
            Self::from_bits_retain(bits | (value.to_raw_bits() << 29))
        }
    }

    bitflags! {
        /// Typing of the Interrupt and Status Register (ISR).
        ///
        /// Holds latched condition flags. How each flag is cleared differs
        /// per flag, see [`ISR::clear_method`].
        ///
        /// This is a **read-only** register.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct ISR: u32 {
            /// Parity error.
            const PE = 1 << 0;
            /// Framing error.
            const FE = 1 << 1;
            /// Noise detection flag.
            const NE = 1 << 2;
            /// Overrun error.
            const ORE = 1 << 3;
            /// Idle line detected.
            const IDLE = 1 << 4;
            /// Read data register (or RXFIFO) not empty.
            const RXNE = 1 << 5;
            /// Transmission complete.
            const TC = 1 << 6;
            /// Transmit data register empty (or TXFIFO not full).
            const TXE = 1 << 7;
            /// LIN break detection flag.
            const LBDF = 1 << 8;
            /// CTS interrupt flag.
            const CTSIF = 1 << 9;
            /// Inverted level of the nCTS input pin.
            const CTS = 1 << 10;
            /// Receiver timeout.
            const RTOF = 1 << 11;
            /// End of block flag.
            const EOBF = 1 << 12;
            /// SPI slave underrun error flag.
            const UDR = 1 << 13;
            /// Auto baud-rate error.
            const ABRE = 1 << 14;
            /// Auto baud-rate flag.
            const ABRF = 1 << 15;
            /// Busy flag: communication ongoing on the RX line.
            const BUSY = 1 << 16;
            /// Character match flag.
            const CMF = 1 << 17;
            /// Send break flag.
            const SBKF = 1 << 18;
            /// Receiver wake-up from mute mode.
            const RWU = 1 << 19;
            /// Wake-up from low-power mode flag.
            const WUF = 1 << 20;
            /// Transmit enable acknowledge flag.
            const TEACK = 1 << 21;
            /// Receive enable acknowledge flag.
            const REACK = 1 << 22;
            /// TXFIFO empty.
            const TXFE = 1 << 23;
            /// RXFIFO full.
            const RXFF = 1 << 24;
            /// Transmission complete before guard time.
            const TCBGT = 1 << 25;
            /// RXFIFO threshold flag.
            const RXFT = 1 << 26;
            /// TXFIFO threshold flag.
            const TXFT = 1 << 27;
        }
    }

    impl ISR {
        /// The receive error flags that abort a blocking transfer.
        pub const ERRORS: Self = Self::PE.union(Self::FE).union(Self::NE).union(Self::ORE);

        /// Alias of [`ISR::TXE`] when the FIFO is enabled.
        pub const TXFNF: Self = Self::TXE;

        /// Alias of [`ISR::RXNE`] when the FIFO is enabled.
        pub const RXFNE: Self = Self::RXNE;

        /// Returns how a single flag is cleared.
        ///
        /// Returns `None` if `self` is not exactly one known flag.
        #[must_use]
        pub const fn clear_method(self) -> Option<ClearMethod> {
            if self.bits().count_ones() != 1 || !Self::all().contains(self) {
                return None;
            }
            let method = match self.bits().trailing_zeros() {
                0 => ClearMethod::Icr(ICR::PECF),
                1 => ClearMethod::Icr(ICR::FECF),
                2 => ClearMethod::Icr(ICR::NECF),
                3 => ClearMethod::Icr(ICR::ORECF),
                4 => ClearMethod::Icr(ICR::IDLECF),
                5 => ClearMethod::ReadRdr,
                6 => ClearMethod::Icr(ICR::TCCF),
                7 => ClearMethod::WriteTdr,
                8 => ClearMethod::Icr(ICR::LBDCF),
                9 => ClearMethod::Icr(ICR::CTSCF),
                10 => ClearMethod::Hardware,
                11 => ClearMethod::Icr(ICR::RTOCF),
                12 => ClearMethod::Icr(ICR::EOBCF),
                13 => ClearMethod::Icr(ICR::UDRCF),
                14 | 15 => ClearMethod::Request(RQR::ABRRQ),
                16 => ClearMethod::Hardware,
                17 => ClearMethod::Icr(ICR::CMCF),
                18 | 19 => ClearMethod::Hardware,
                20 => ClearMethod::Icr(ICR::WUCF),
                21 | 22 => ClearMethod::Hardware,
                23 => ClearMethod::Icr(ICR::TXFECF),
                24 => ClearMethod::ReadRdr,
                25 => ClearMethod::Icr(ICR::TCBGTCF),
                26 => ClearMethod::ReadRdr,
                27 => ClearMethod::WriteTdr,
                _ => return None,
            };
            Some(method)
        }
    }

    /// How a flag in [`ISR`] returns to zero.
    ///
    /// The mapping is not uniform: only a subset of the flags own a bit in
    /// [`ICR`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ClearMethod {
        /// Write the given mask to [`offsets::ICR`].
        Icr(ICR),
        /// Read [`offsets::RDR`] until the condition is gone.
        ReadRdr,
        /// Write [`offsets::TDR`].
        WriteTdr,
        /// Issue the given request in [`offsets::RQR`].
        Request(RQR),
        /// Reflects a line level or internal state and cannot be cleared by
        /// software.
        Hardware,
    }

    bitflags! {
        /// Typing of the Interrupt flag Clear Register (ICR).
        ///
        /// Writing a 1 clears the corresponding flag in [`ISR`].
        ///
        /// This is a **write-only** register.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct ICR: u32 {
            /// Clears [`ISR::PE`].
            const PECF = 1 << 0;
            /// Clears [`ISR::FE`].
            const FECF = 1 << 1;
            /// Clears [`ISR::NE`].
            const NECF = 1 << 2;
            /// Clears [`ISR::ORE`].
            const ORECF = 1 << 3;
            /// Clears [`ISR::IDLE`].
            const IDLECF = 1 << 4;
            /// Clears [`ISR::TXFE`].
            const TXFECF = 1 << 5;
            /// Clears [`ISR::TC`].
            const TCCF = 1 << 6;
            /// Clears [`ISR::TCBGT`].
            const TCBGTCF = 1 << 7;
            /// Clears [`ISR::LBDF`].
            const LBDCF = 1 << 8;
            /// Clears [`ISR::CTSIF`].
            const CTSCF = 1 << 9;
            /// Clears [`ISR::RTOF`].
            const RTOCF = 1 << 11;
            /// Clears [`ISR::EOBF`].
            const EOBCF = 1 << 12;
            /// Clears [`ISR::UDR`].
            const UDRCF = 1 << 13;
            /// Clears [`ISR::CMF`].
            const CMCF = 1 << 17;
            /// Clears [`ISR::WUF`].
            const WUCF = 1 << 20;
        }
    }

    impl ICR {
        /// Clears all of [`ISR::ERRORS`].
        pub const ERRORS: Self = Self::PECF.union(Self::FECF).union(Self::NECF).union(Self::ORECF);

        /// Returns the clear mask for the error flags set in `isr`.
        #[must_use]
        pub const fn for_errors(isr: ISR) -> Self {
            Self::from_bits_truncate(isr.intersection(ISR::ERRORS).bits())
        }
    }

    bitflags! {
        /// Typing of the Request Register (RQR).
        ///
        /// Single-bit strobes; the bits read back as zero.
        ///
        /// This is a **write-only** register.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct RQR: u32 {
            /// Auto baud-rate request. Resets [`ISR::ABRF`] and [`ISR::ABRE`]
            /// and starts a new measurement.
            const ABRRQ = 1 << 0;
            /// Send break request.
            const SBKRQ = 1 << 1;
            /// Mute mode request.
            const MMRQ = 1 << 2;
            /// Receive data flush request. Clears [`ISR::RXNE`].
            const RXFRQ = 1 << 3;
            /// Transmit data flush request. Sets [`ISR::TXE`].
            const TXFRQ = 1 << 4;
        }
    }

    /// The frame length of transmission and reception in [`CR1`], parity
    /// bit included.
    ///
    /// This type is a convenient and non-ABI compatible abstraction. ABI
    /// compatibility is given via [`WordLength::from_raw_bits`] and
    /// [`WordLength::to_raw_bits`] (`M1:M0`).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum WordLength {
        /// 7 bit frames.
        SevenBits,
        /// 8 bit frames.
        ///
        /// # Recommendation
        /// This is the recommended default.
        #[default]
        EightBits,
        /// 9 bit frames.
        NineBits,
    }

    impl WordLength {
        /// Translates the raw `M1:M0` encoding into the corresponding value.
        ///
        /// `0b11` is reserved and yields `None`.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Option<Self> {
            match bits & 0b11 {
                0b00 => Some(Self::EightBits),
                0b01 => Some(Self::NineBits),
                0b10 => Some(Self::SevenBits),
                _ => None,
            }
        }

        /// Translates the value into the raw `M1:M0` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            match self {
                Self::EightBits => 0b00,
                Self::NineBits => 0b01,
                Self::SevenBits => 0b10,
            }
        }

        /// Returns the mask applied to received data, which strips the
        /// parity bit if parity is enabled.
        #[must_use]
        pub const fn data_mask(self, parity: Parity) -> u16 {
            let with_parity = !matches!(parity, Parity::None);
            match (self, with_parity) {
                (Self::NineBits, false) => 0x1ff,
                (Self::NineBits, true) => 0xff,
                (Self::EightBits, false) => 0xff,
                (Self::EightBits, true) => 0x7f,
                (Self::SevenBits, false) => 0x7f,
                (Self::SevenBits, true) => 0x3f,
            }
        }
    }

    /// The parity mode in [`CR1`].
    ///
    /// ABI compatibility is given via [`Parity::from_raw_bits`] and
    /// [`Parity::to_raw_bits`] (`PCE:PS`).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum Parity {
        /// No parity bit is transmitted nor expected.
        #[default]
        None,
        /// The number of bits including the parity bit must be even.
        Even,
        /// The number of bits including the parity bit must be odd.
        Odd,
    }

    impl Parity {
        /// Translates the raw `PCE:PS` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Self {
            match bits & 0b11 {
                0b10 => Self::Even,
                0b11 => Self::Odd,
                // PS is ignored while PCE is cleared.
                _ => Self::None,
            }
        }

        /// Translates the value into the raw `PCE:PS` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            match self {
                Self::None => 0b00,
                Self::Even => 0b10,
                Self::Odd => 0b11,
            }
        }
    }

    /// Which directions are enabled in [`CR1`] (`TE:RE`).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum TransferMode {
        /// Receiver only.
        Rx,
        /// Transmitter only.
        Tx,
        /// Transmitter and receiver.
        #[default]
        TxRx,
    }

    impl TransferMode {
        /// Translates the raw `TE:RE` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Option<Self> {
            match bits & 0b11 {
                0b01 => Some(Self::Rx),
                0b10 => Some(Self::Tx),
                0b11 => Some(Self::TxRx),
                _ => None,
            }
        }

        /// Translates the value into the raw `TE:RE` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            match self {
                Self::Rx => 0b01,
                Self::Tx => 0b10,
                Self::TxRx => 0b11,
            }
        }

        /// Whether the transmitter is enabled.
        #[must_use]
        pub const fn has_tx(self) -> bool {
            matches!(self, Self::Tx | Self::TxRx)
        }

        /// Whether the receiver is enabled.
        #[must_use]
        pub const fn has_rx(self) -> bool {
            matches!(self, Self::Rx | Self::TxRx)
        }
    }

    /// The number of stop bits in [`CR2`].
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum StopBits {
        /// 0.5 stop bit.
        Half,
        /// 1 stop bit.
        #[default]
        One,
        /// 1.5 stop bits.
        OneAndHalf,
        /// 2 stop bits.
        Two,
    }

    impl StopBits {
        /// Translates the raw `STOP` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Self {
            match bits & 0b11 {
                0b00 => Self::One,
                0b01 => Self::Half,
                0b10 => Self::Two,
                _ => Self::OneAndHalf,
            }
        }

        /// Translates the value into the raw `STOP` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            match self {
                Self::One => 0b00,
                Self::Half => 0b01,
                Self::Two => 0b10,
                Self::OneAndHalf => 0b11,
            }
        }
    }

    /// Hardware flow control in [`CR3`] (`CTSE:RTSE`).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum HwFlowControl {
        /// No hardware flow control.
        #[default]
        None,
        /// Request To Send.
        Rts,
        /// Clear To Send.
        Cts,
        /// Request and Clear To Send.
        RtsCts,
    }

    impl HwFlowControl {
        /// Translates the raw `CTSE:RTSE` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Self {
            match bits & 0b11 {
                0b00 => Self::None,
                0b01 => Self::Rts,
                0b10 => Self::Cts,
                _ => Self::RtsCts,
            }
        }

        /// Translates the value into the raw `CTSE:RTSE` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            match self {
                Self::None => 0b00,
                Self::Rts => 0b01,
                Self::Cts => 0b10,
                Self::RtsCts => 0b11,
            }
        }
    }

    /// Auto baud-rate detection method in [`CR2`].
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum AutoBaudRateMode {
        /// Measurement of the start bit.
        #[default]
        StartBit,
        /// Falling edge to falling edge measurement.
        FallingEdge,
        /// Detection of a `0x7F` frame.
        Frame0x7F,
        /// Detection of a `0x55` frame.
        Frame0x55,
    }

    impl AutoBaudRateMode {
        /// Translates the raw `ABRMODE` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Self {
            match bits & 0b11 {
                0b00 => Self::StartBit,
                0b01 => Self::FallingEdge,
                0b10 => Self::Frame0x7F,
                _ => Self::Frame0x55,
            }
        }

        /// Translates the value into the raw `ABRMODE` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            self as u32
        }
    }

    /// The TXFIFO threshold in [`CR3`].
    ///
    /// [`ISR::TXFT`] is raised once the TXFIFO drains to this level.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum TxFifoThreshold {
        /// TXFIFO reaches 1/8 of its depth.
        #[default]
        OneEighth,
        /// TXFIFO reaches 1/4 of its depth.
        OneQuarter,
        /// TXFIFO reaches 1/2 of its depth.
        Half,
        /// TXFIFO reaches 3/4 of its depth.
        ThreeQuarters,
        /// TXFIFO reaches 7/8 of its depth.
        SevenEighths,
        /// TXFIFO becomes empty.
        Empty,
    }

    impl TxFifoThreshold {
        /// Translates the raw `TXFTCFG` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Option<Self> {
            match bits & 0b111 {
                0b000 => Some(Self::OneEighth),
                0b001 => Some(Self::OneQuarter),
                0b010 => Some(Self::Half),
                0b011 => Some(Self::ThreeQuarters),
                0b100 => Some(Self::SevenEighths),
                0b101 => Some(Self::Empty),
                _ => None,
            }
        }

        /// Translates the value into the raw `TXFTCFG` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            self as u32
        }
    }

    /// The RXFIFO threshold in [`CR3`].
    ///
    /// [`ISR::RXFT`] is raised once the RXFIFO fills up to this level.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum RxFifoThreshold {
        /// RXFIFO reaches 1/8 of its depth.
        #[default]
        OneEighth,
        /// RXFIFO reaches 1/4 of its depth.
        OneQuarter,
        /// RXFIFO reaches 1/2 of its depth.
        Half,
        /// RXFIFO reaches 3/4 of its depth.
        ThreeQuarters,
        /// RXFIFO reaches 7/8 of its depth.
        SevenEighths,
        /// RXFIFO becomes full.
        Full,
    }

    impl RxFifoThreshold {
        /// Translates the raw `RXFTCFG` encoding into the corresponding value.
        #[must_use]
        pub const fn from_raw_bits(bits: u32) -> Option<Self> {
            match bits & 0b111 {
                0b000 => Some(Self::OneEighth),
                0b001 => Some(Self::OneQuarter),
                0b010 => Some(Self::Half),
                0b011 => Some(Self::ThreeQuarters),
                0b100 => Some(Self::SevenEighths),
                0b101 => Some(Self::Full),
                _ => None,
            }
        }

        /// Translates the value into the raw `RXFTCFG` encoding.
        #[must_use]
        pub const fn to_raw_bits(self) -> u32 {
            self as u32
        }
    }
}
