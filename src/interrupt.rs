// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interrupt tokens: one value per interrupt that addresses both its enable
//! bit in one of the three control registers and its flag in [`ISR`].
//!
//! The enable bits are spread over [`CR1`], [`CR2`] and [`CR3`] while all
//! flags live in [`ISR`]. An [`InterruptToken`] carries both locations so
//! that enabling, disabling and querying an interrupt is a uniform call
//! regardless of the physical register. See [`Uart::enable_interrupt`] and
//! friends.
//!
//! Flags are **cleared** differently, through [`ICR`] or by data register
//! accesses; see [`ISR::clear_method`].
//!
//! [`CR1`]: crate::spec::registers::CR1
//! [`CR2`]: crate::spec::registers::CR2
//! [`CR3`]: crate::spec::registers::CR3
//! [`ISR`]: crate::spec::registers::ISR
//! [`ICR`]: crate::spec::registers::ICR
//! [`ISR::clear_method`]: crate::spec::registers::ISR::clear_method
//! [`Uart::enable_interrupt`]: crate::Uart::enable_interrupt

use crate::spec::registers::{ISR, offsets};
use core::error::Error;
use core::fmt::{self, Display, Formatter};

/// One of the three control registers holding interrupt enable bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlRegister {
    /// Control Register 1.
    Cr1,
    /// Control Register 2.
    Cr2,
    /// Control Register 3.
    Cr3,
}

impl ControlRegister {
    /// Returns the byte offset of the register.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Cr1 => offsets::CR1,
            Self::Cr2 => offsets::CR2,
            Self::Cr3 => offsets::CR3,
        }
    }

    /// Returns the selector used in the raw token encoding (`1..=3`).
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Cr1 => 1,
            Self::Cr2 => 2,
            Self::Cr3 => 3,
        }
    }

    /// Resolves a raw selector. There is no register for `0`.
    #[must_use]
    pub const fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1 => Some(Self::Cr1),
            2 => Some(Self::Cr2),
            3 => Some(Self::Cr3),
            _ => None,
        }
    }
}

/// Position of an interrupt enable bit within its control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnableBit {
    /// Bit position in CR1.
    Cr1(u8),
    /// Bit position in CR2.
    Cr2(u8),
    /// Bit position in CR3.
    Cr3(u8),
}

impl EnableBit {
    /// Returns the register owning the bit.
    #[must_use]
    pub const fn register(self) -> ControlRegister {
        match self {
            Self::Cr1(_) => ControlRegister::Cr1,
            Self::Cr2(_) => ControlRegister::Cr2,
            Self::Cr3(_) => ControlRegister::Cr3,
        }
    }

    /// Returns the bit position within [`Self::register`].
    #[must_use]
    pub const fn position(self) -> u8 {
        match self {
            Self::Cr1(bit) | Self::Cr2(bit) | Self::Cr3(bit) => bit,
        }
    }

    const fn new(register: ControlRegister, position: u8) -> Self {
        match register {
            ControlRegister::Cr1 => Self::Cr1(position),
            ControlRegister::Cr2 => Self::Cr2(position),
            ControlRegister::Cr3 => Self::Cr3(position),
        }
    }
}

/// Addresses one interrupt: its enable bit and its flag in [`ISR`].
///
/// All tokens of the peripheral are available as associated constants, e.g.
/// [`InterruptToken::RXNE`]. Tokens cannot be created at runtime except by
/// decoding their raw form with [`InterruptToken::from_raw`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterruptToken {
    enable: EnableBit,
    status_bit: u8,
}

impl InterruptToken {
    /// Parity error.
    pub const PE: Self = Self::new(EnableBit::Cr1(8), 0);
    /// Transmit data register empty.
    pub const TXE: Self = Self::new(EnableBit::Cr1(7), 7);
    /// TXFIFO not full. Same bits as [`Self::TXE`] in FIFO mode.
    pub const TXFNF: Self = Self::TXE;
    /// Transmission complete.
    pub const TC: Self = Self::new(EnableBit::Cr1(6), 6);
    /// Read data register not empty.
    pub const RXNE: Self = Self::new(EnableBit::Cr1(5), 5);
    /// RXFIFO not empty. Same bits as [`Self::RXNE`] in FIFO mode.
    pub const RXFNE: Self = Self::RXNE;
    /// Idle line detected.
    pub const IDLE: Self = Self::new(EnableBit::Cr1(4), 4);
    /// LIN break detected.
    pub const LBD: Self = Self::new(EnableBit::Cr2(6), 8);
    /// CTS change. Not present on every instance, see
    /// [`Instance::supports`](crate::Instance::supports).
    pub const CTS: Self = Self::new(EnableBit::Cr3(10), 9);
    /// Character match.
    pub const CM: Self = Self::new(EnableBit::Cr1(14), 17);
    /// Wake-up from low-power mode.
    pub const WUF: Self = Self::new(EnableBit::Cr3(22), 20);
    /// RXFIFO full.
    pub const RXFF: Self = Self::new(EnableBit::Cr1(31), 24);
    /// TXFIFO empty.
    pub const TXFE: Self = Self::new(EnableBit::Cr1(30), 23);
    /// RXFIFO threshold reached.
    pub const RXFT: Self = Self::new(EnableBit::Cr3(28), 26);
    /// TXFIFO threshold reached.
    pub const TXFT: Self = Self::new(EnableBit::Cr3(23), 27);
    /// Error interrupt for frame, noise and overrun errors.
    ///
    /// The individual causes are reported by [`ISR::ERRORS`]; the status bit
    /// of this token only mirrors the raw encoding (position 0).
    pub const ERR: Self = Self::new(EnableBit::Cr3(0), 0);

    /// Every distinct token.
    pub const ALL: [Self; 14] = [
        Self::PE,
        Self::TXE,
        Self::TC,
        Self::RXNE,
        Self::IDLE,
        Self::LBD,
        Self::CTS,
        Self::CM,
        Self::WUF,
        Self::RXFF,
        Self::TXFE,
        Self::RXFT,
        Self::TXFT,
        Self::ERR,
    ];

    const fn new(enable: EnableBit, status_bit: u8) -> Self {
        assert!(enable.position() < 32);
        assert!(status_bit < 32);
        Self { enable, status_bit }
    }

    /// Returns the enable bit.
    #[must_use]
    pub const fn enable_bit(self) -> EnableBit {
        self.enable
    }

    /// Returns the control register to modify for enable/disable.
    #[must_use]
    pub const fn control_register(self) -> ControlRegister {
        self.enable.register()
    }

    /// Returns the mask of the enable bit within [`Self::control_register`].
    #[must_use]
    pub const fn enable_mask(self) -> u32 {
        1 << self.enable.position()
    }

    /// Returns the position of the flag in [`ISR`].
    #[must_use]
    pub const fn status_bit(self) -> u8 {
        self.status_bit
    }

    /// Returns the flag in [`ISR`] to test.
    #[must_use]
    pub const fn status_mask(self) -> ISR {
        ISR::from_bits_retain(1 << self.status_bit)
    }

    /// Returns the `(register_selector, bit_position, status_bit_position)`
    /// triple.
    #[must_use]
    pub const fn decode(self) -> (u8, u8, u8) {
        (
            self.control_register().selector(),
            self.enable.position(),
            self.status_bit,
        )
    }

    /// Encodes the token in the compact firmware layout `000ZZZZZ_0XXYYYYY`:
    /// `YYYYY` is the enable bit position, `XX` the register selector and
    /// `ZZZZZ` the [`ISR`] flag position.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        let (selector, bit, status) = self.decode();
        ((status as u16) << 8) | ((selector as u16) << 5) | bit as u16
    }

    /// Decodes the compact firmware layout, see [`Self::to_raw`].
    ///
    /// A selector of `0` does not name a control register and is rejected,
    /// as are bits outside of the layout.
    pub const fn from_raw(raw: u16) -> Result<Self, InvalidTokenError> {
        if raw & 0xe080 != 0 {
            return Err(InvalidTokenError(raw));
        }
        let bit = (raw & 0x1f) as u8;
        let selector = ((raw >> 5) & 0b11) as u8;
        let status = ((raw >> 8) & 0x1f) as u8;
        match ControlRegister::from_selector(selector) {
            Some(register) => Ok(Self::new(EnableBit::new(register, bit), status)),
            None => Err(InvalidTokenError(raw)),
        }
    }
}

/// A raw value does not decode into an [`InterruptToken`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InvalidTokenError(pub u16);

impl Display for InvalidTokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid interrupt token: {:#06x}", self.0)
    }
}

impl Error for InvalidTokenError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::registers::{CR1, CR2, CR3};

    #[test]
    fn test_raw_values() {
        let expected: [(InterruptToken, u16); 14] = [
            (InterruptToken::PE, 0x0028),
            (InterruptToken::TXE, 0x0727),
            (InterruptToken::TC, 0x0626),
            (InterruptToken::RXNE, 0x0525),
            (InterruptToken::IDLE, 0x0424),
            (InterruptToken::LBD, 0x0846),
            (InterruptToken::CTS, 0x096a),
            (InterruptToken::CM, 0x112e),
            (InterruptToken::WUF, 0x1476),
            (InterruptToken::RXFF, 0x183f),
            (InterruptToken::TXFE, 0x173e),
            (InterruptToken::RXFT, 0x1a7c),
            (InterruptToken::TXFT, 0x1b77),
            (InterruptToken::ERR, 0x0060),
        ];
        for (token, raw) in expected {
            assert_eq!(token.to_raw(), raw, "{token:?}");
        }
    }

    #[test]
    fn test_round_trip() {
        for token in InterruptToken::ALL {
            let (selector, bit, status) = token.decode();
            let decoded = InterruptToken::from_raw(token.to_raw()).unwrap();
            assert_eq!(decoded, token);
            assert_eq!(decoded.decode(), (selector, bit, status));
        }
    }

    #[test]
    fn test_from_raw_rejects_missing_selector() {
        // Status-only encodings (ORE, NE, FE) carry no control register.
        assert_eq!(InterruptToken::from_raw(0x0300), Err(InvalidTokenError(0x0300)));
        assert_eq!(InterruptToken::from_raw(0x0200), Err(InvalidTokenError(0x0200)));
        assert_eq!(InterruptToken::from_raw(0x0100), Err(InvalidTokenError(0x0100)));
        // Reserved bits.
        assert!(InterruptToken::from_raw(0x0080 | 0x0028).is_err());
        assert!(InterruptToken::from_raw(0x2000 | 0x0028).is_err());
    }

    #[test]
    fn test_masks_match_register_typing() {
        assert_eq!(InterruptToken::RXNE.control_register(), ControlRegister::Cr1);
        assert_eq!(InterruptToken::RXNE.enable_mask(), CR1::RXNEIE.bits());
        assert_eq!(InterruptToken::RXNE.status_mask(), ISR::RXNE);

        assert_eq!(InterruptToken::TXE.enable_mask(), CR1::TXEIE.bits());
        assert_eq!(InterruptToken::TC.enable_mask(), CR1::TCIE.bits());
        assert_eq!(InterruptToken::PE.enable_mask(), CR1::PEIE.bits());
        assert_eq!(InterruptToken::PE.status_mask(), ISR::PE);
        assert_eq!(InterruptToken::IDLE.enable_mask(), CR1::IDLEIE.bits());
        assert_eq!(InterruptToken::CM.enable_mask(), CR1::CMIE.bits());
        assert_eq!(InterruptToken::CM.status_mask(), ISR::CMF);
        assert_eq!(InterruptToken::RXFF.enable_mask(), CR1::RXFFIE.bits());
        assert_eq!(InterruptToken::RXFF.status_mask(), ISR::RXFF);
        assert_eq!(InterruptToken::TXFE.enable_mask(), CR1::TXFEIE.bits());
        assert_eq!(InterruptToken::TXFE.status_mask(), ISR::TXFE);

        assert_eq!(InterruptToken::LBD.control_register(), ControlRegister::Cr2);
        assert_eq!(InterruptToken::LBD.enable_mask(), CR2::LBDIE.bits());
        assert_eq!(InterruptToken::LBD.status_mask(), ISR::LBDF);

        assert_eq!(InterruptToken::CTS.control_register(), ControlRegister::Cr3);
        assert_eq!(InterruptToken::CTS.enable_mask(), CR3::CTSIE.bits());
        assert_eq!(InterruptToken::CTS.status_mask(), ISR::CTSIF);
        assert_eq!(InterruptToken::WUF.enable_mask(), CR3::WUFIE.bits());
        assert_eq!(InterruptToken::WUF.status_mask(), ISR::WUF);
        assert_eq!(InterruptToken::RXFT.enable_mask(), CR3::RXFTIE.bits());
        assert_eq!(InterruptToken::RXFT.status_mask(), ISR::RXFT);
        assert_eq!(InterruptToken::TXFT.enable_mask(), CR3::TXFTIE.bits());
        assert_eq!(InterruptToken::TXFT.status_mask(), ISR::TXFT);
        assert_eq!(InterruptToken::ERR.enable_mask(), CR3::EIE.bits());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(InterruptToken::TXFNF, InterruptToken::TXE);
        assert_eq!(InterruptToken::RXFNE, InterruptToken::RXNE);
        assert_eq!(ControlRegister::Cr3.offset(), offsets::CR3);
    }
}
