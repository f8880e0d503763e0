// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two-axis peripheral state of a [`Uart`] and its accumulated
//! [`ErrorCode`].
//!
//! [`GlobalState`] covers the handle as a whole and the transmitter while
//! [`ReceiveState`] covers the receiver. Both coexist so that a transmission
//! can be in flight while the receiver is idle and vice versa.
//!
//! [`Uart`]: crate::Uart

use crate::spec::registers::ISR;
use bitflags::bitflags;
use log::trace;

/// State of the handle and of the transmitter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum GlobalState {
    /// Not initialized.
    #[default]
    Reset,
    /// Initialized and idle.
    Ready,
    /// (Re-)configuration ongoing.
    BusyGeneric,
    /// Transmission ongoing.
    BusyTx,
    /// The last operation ran into its deadline.
    Timeout,
    /// The last operation observed hardware error flags.
    Error,
}

impl GlobalState {
    /// Whether an operation is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::BusyGeneric | Self::BusyTx)
    }

    /// Whether a new operation may start.
    ///
    /// The timeout and error markers only describe the previous operation
    /// and do not block the next one.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Ready | Self::Timeout | Self::Error)
    }
}

/// State of the receiver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReceiveState {
    /// Not initialized.
    #[default]
    Reset,
    /// Initialized and idle.
    Ready,
    /// Reception ongoing.
    BusyRx,
}

bitflags! {
    /// Errors accumulated by the most recent operation.
    ///
    /// Several bits may be set at once as the hardware latches each
    /// condition independently.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ErrorCode: u32 {
        /// Parity error.
        const PARITY = 0x01;
        /// Noise error.
        const NOISE = 0x02;
        /// Framing error.
        const FRAME = 0x04;
        /// Overrun error.
        const OVERRUN = 0x08;
        /// The transfer backend (e.g., a DMA engine) failed.
        const TRANSFER_BACKEND = 0x10;
    }
}

impl ErrorCode {
    /// Translates the error flags latched in `isr`.
    #[must_use]
    pub const fn from_isr(isr: ISR) -> Self {
        let mut code = Self::empty();
        if isr.contains(ISR::PE) {
            code = code.union(Self::PARITY);
        }
        if isr.contains(ISR::NE) {
            code = code.union(Self::NOISE);
        }
        if isr.contains(ISR::FE) {
            code = code.union(Self::FRAME);
        }
        if isr.contains(ISR::ORE) {
            code = code.union(Self::OVERRUN);
        }
        code
    }
}

/// Which axis a transfer occupies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Occupies the global axis.
    Tx,
    /// Occupies the receive axis.
    Rx,
}

/// The combined state owned by a handle.
///
/// Transitions are only performed through the methods of this type so that
/// the invariants hold:
/// - [`ReceiveState::BusyRx`] never coexists with [`GlobalState::Reset`].
/// - `Reset` is only entered through [`Self::reset`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PeripheralState {
    global: GlobalState,
    receive: ReceiveState,
}

impl PeripheralState {
    pub(crate) const fn new() -> Self {
        Self {
            global: GlobalState::Reset,
            receive: ReceiveState::Reset,
        }
    }

    pub(crate) const fn global(&self) -> GlobalState {
        self.global
    }

    pub(crate) const fn receive(&self) -> ReceiveState {
        self.receive
    }

    /// Whether any axis has an operation in flight.
    pub(crate) const fn is_busy(&self) -> bool {
        self.global.is_busy() || matches!(self.receive, ReceiveState::BusyRx)
    }

    /// Enters configuration. Fails if any axis is busy.
    pub(crate) fn begin_configuration(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.set_global(GlobalState::BusyGeneric);
        true
    }

    /// Leaves configuration successfully; both axes become ready.
    pub(crate) fn configured(&mut self) {
        self.set_global(GlobalState::Ready);
        self.set_receive(ReceiveState::Ready);
    }

    /// Leaves configuration, restoring the previous global state, e.g.,
    /// because the configuration was rejected before touching hardware.
    pub(crate) fn abort_configuration(&mut self, previous: GlobalState) {
        debug_assert!(!previous.is_busy());
        self.set_global(previous);
    }

    /// Whether a transfer on the given axis may start.
    pub(crate) fn can_begin_transfer(&self, direction: Direction) -> bool {
        match direction {
            Direction::Tx => self.global.is_idle(),
            Direction::Rx => self.receive == ReceiveState::Ready && self.global.is_idle(),
        }
    }

    /// Starts a transfer on the given axis.
    ///
    /// Returns `false` if the axis is not idle; nothing is changed then.
    pub(crate) fn begin_transfer(&mut self, direction: Direction) -> bool {
        if !self.can_begin_transfer(direction) {
            return false;
        }
        match direction {
            Direction::Tx => {
                self.set_global(GlobalState::BusyTx);
            }
            Direction::Rx => {
                // The marker of the previous operation does not outlive the
                // start of the next one.
                self.set_global(GlobalState::Ready);
                self.set_receive(ReceiveState::BusyRx);
            }
        }
        true
    }

    /// Finishes a transfer with the given outcome for the global axis.
    ///
    /// `outcome` must be one of `Ready`, `Timeout` or `Error`.
    pub(crate) fn finish_transfer(&mut self, direction: Direction, outcome: GlobalState) {
        debug_assert!(outcome.is_idle());
        match direction {
            Direction::Tx => self.set_global(outcome),
            Direction::Rx => {
                self.set_receive(ReceiveState::Ready);
                self.set_global(outcome);
            }
        }
    }

    /// Marks the configuration as failed with a timeout or error.
    pub(crate) fn configuration_failed(&mut self, outcome: GlobalState) {
        debug_assert!(matches!(outcome, GlobalState::Timeout | GlobalState::Error));
        self.set_global(outcome);
        if self.receive == ReceiveState::Reset {
            self.set_receive(ReceiveState::Ready);
        }
    }

    /// Returns both axes to `Reset`.
    pub(crate) fn reset(&mut self) {
        self.set_receive(ReceiveState::Reset);
        self.set_global(GlobalState::Reset);
    }

    fn set_global(&mut self, state: GlobalState) {
        if self.global != state {
            trace!("global state: {:?} -> {:?}", self.global, state);
        }
        self.global = state;
    }

    fn set_receive(&mut self, state: ReceiveState) {
        if self.receive != state {
            trace!("receive state: {:?} -> {:?}", self.receive, state);
        }
        self.receive = state;
    }
}
