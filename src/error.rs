// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors that can happen when working with [`Uart`].

use crate::backend::MmioAddress;
use crate::spec::DivisorError;
use crate::state::ErrorCode;
use core::error::Error;
use core::fmt::Display;

#[cfg(doc)]
use crate::{Config, Instance, Uart};

/// The specified address is invalid because it is either null or doesn't offer
/// [`offsets::MAX`] subsequent addresses.
///
/// [`offsets::MAX`]: crate::spec::registers::offsets::MAX
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvalidAddressError(pub(crate) MmioAddress);

impl Display for InvalidAddressError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid register address: {:x?}", self.0)
    }
}

impl Error for InvalidAddressError {}

/// The [`Config`] or the requested change does not fit the [`Instance`] or
/// its current state.
///
/// This is always detected before any register is touched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConfigError {
    /// The configured baud rate can not be set as it results in an invalid
    /// divisor.
    InvalidBaudRate(DivisorError),
    /// The instance has no CTS/RTS lines.
    UnsupportedFlowControl,
    /// The instance does not implement the requested interrupt.
    UnsupportedInterrupt,
    /// The frame does not fit into the data word type, e.g., 9-bit frames
    /// without parity received into `u8`.
    WordSizeMismatch,
    /// The change requires the peripheral to be disabled (`UE` cleared).
    PeripheralEnabled,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidBaudRate(e) => {
                write!(f, "invalid baud rate: {e}")
            }
            Self::UnsupportedFlowControl => {
                write!(f, "the instance does not support hardware flow control")
            }
            Self::UnsupportedInterrupt => {
                write!(f, "the instance does not support the interrupt")
            }
            Self::WordSizeMismatch => {
                write!(f, "the frame length does not fit into the data word")
            }
            Self::PeripheralEnabled => {
                write!(f, "the peripheral must be disabled for this change")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBaudRate(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors that can happen when a [`Uart`] is initialized in [`Uart::init`]
/// or [`Uart::reconfigure`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InitError {
    /// An operation is in flight.
    Busy,
    /// The configuration was rejected. The hardware was not touched.
    Configuration(ConfigError),
    /// The transmitter or receiver did not acknowledge its enable in time.
    Timeout,
}

impl Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => {
                write!(f, "the peripheral is busy")
            }
            Self::Configuration(e) => {
                write!(f, "invalid configuration: {e}")
            }
            Self::Timeout => {
                write!(f, "the enable acknowledge did not arrive in time")
            }
        }
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value)
    }
}

/// Errors of the blocking [`Uart::transmit`] and [`Uart::receive`].
///
/// Every variant except [`TransferError::Busy`] and
/// [`TransferError::Configuration`] reports how many data words were moved
/// before the transfer stopped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransferError {
    /// The relevant axis is busy or the handle is not initialized. Nothing
    /// was touched.
    Busy,
    /// The data word type does not fit the configured frame.
    Configuration(ConfigError),
    /// The hardware reported receive errors. The flags were cleared.
    Hardware {
        /// The errors that were observed.
        errors: ErrorCode,
        /// Number of data words moved.
        completed: usize,
    },
    /// The deadline passed.
    Timeout {
        /// Number of data words moved.
        completed: usize,
    },
}

impl TransferError {
    /// Returns the number of data words moved before the transfer stopped.
    #[must_use]
    pub const fn completed(&self) -> usize {
        match self {
            Self::Busy | Self::Configuration(_) => 0,
            Self::Hardware { completed, .. } | Self::Timeout { completed } => *completed,
        }
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => {
                write!(f, "the peripheral is busy")
            }
            Self::Configuration(e) => {
                write!(f, "invalid configuration: {e}")
            }
            Self::Hardware { errors, completed } => {
                write!(
                    f,
                    "hardware error {errors:?} after {completed} data words"
                )
            }
            Self::Timeout { completed } => {
                write!(f, "timeout after {completed} data words")
            }
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for TransferError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value)
    }
}
