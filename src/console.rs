// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provides a thin abstraction over a [`Uart`] to print Rust strings to a
//! terminal on the remote side, e.g., for early boot logging.
//!
//! For lower-level access of the underlying hardware, use [`Uart`] instead.
//!
//! See [`UartConsole`].

use crate::backend::{Backend, MmioBackend, Timer};
use crate::{Config, InitError, Instance, InvalidAddressError, Uart};
use core::error::Error;
use core::fmt::{self, Display, Formatter};
use core::time::Duration;

/// How long [`UartConsole`] waits for one chunk of a string by default.
pub const CONSOLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Errors that [`UartConsole::new_mmio`] may return.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UartConsoleError {
    /// The underlying address is invalid.
    AddressError(InvalidAddressError),
    /// Error initializing the device.
    InitError(InitError),
}

impl Display for UartConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressError(e) => {
                write!(f, "{e}")
            }
            Self::InitError(e) => {
                write!(f, "error initializing the device: {e}")
            }
        }
    }
}

impl Error for UartConsoleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AddressError(e) => Some(e),
            Self::InitError(e) => Some(e),
        }
    }
}

/// Thin opinionated abstraction over [`Uart`] that helps to send Rust
/// strings easily to the other side, assuming the remote is a terminal.
///
/// Newlines are sent as `\r\n`. Each chunk is bounded by
/// [`CONSOLE_TIMEOUT`] unless changed with [`UartConsole::set_timeout`]. A
/// failed transfer yields [`fmt::Error`] and drops the rest of the string.
///
/// It implements [`fmt::Write`].
///
/// # Example
/// ```rust,no_run
/// use core::fmt::Write;
/// use core::time::Duration;
/// use stm32mp1_uart::{Config, Instance, Timer, UartConsole};
///
/// struct Ticks;
///
/// impl Timer for Ticks {
///     fn now(&self) -> Duration {
///         Duration::ZERO
///     }
/// }
///
/// let base = Instance::Uart4.base_address() as *mut u32;
/// let mut console =
///     unsafe { UartConsole::new_mmio(base, Instance::Uart4, Config::default(), Ticks) }
///         .expect("should initialize device");
/// write!(console, "hello world\nhow's it going?").expect("should write");
/// ```
#[derive(Debug)]
pub struct UartConsole<B: Backend, T: Timer> {
    uart: Uart<B, T>,
    timeout: Duration,
}

impl<T: Timer> UartConsole<MmioBackend, T> {
    /// Creates a new [`UartConsole`] backed by MMIO.
    ///
    /// Initializes the device.
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
    ) -> Result<Self, UartConsoleError> {
        // SAFETY: The address is valid and we have exclusive access.
        let mut inner = unsafe {
            Uart::new_mmio(base_address, instance, config, timer)
                .map_err(UartConsoleError::AddressError)?
        };
        inner.init().map_err(UartConsoleError::InitError)?;
        Ok(Self::new(inner))
    }
}

impl<B: Backend, T: Timer> UartConsole<B, T> {
    /// Wraps an already initialized [`Uart`].
    #[must_use]
    pub const fn new(uart: Uart<B, T>) -> Self {
        Self {
            uart,
            timeout: CONSOLE_TIMEOUT,
        }
    }

    /// Returns the deadline applied to each chunk.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the deadline applied to each chunk.
    pub const fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Returns a reference to the underlying [`Uart`].
    #[must_use]
    pub const fn inner(&self) -> &Uart<B, T> {
        &self.uart
    }

    /// Returns a mutable reference to the underlying [`Uart`].
    pub const fn inner_mut(&mut self) -> &mut Uart<B, T> {
        &mut self.uart
    }

    /// Returns the underlying [`Uart`].
    #[must_use]
    pub fn into_inner(self) -> Uart<B, T> {
        self.uart
    }

    fn send(&mut self, bytes: &[u8]) -> fmt::Result {
        self.uart
            .transmit(bytes, self.timeout)
            .map_err(|_| fmt::Error)
    }
}

impl<B: Backend, T: Timer> fmt::Write for UartConsole<B, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut lines = s.split('\n');
        if let Some(first) = lines.next() {
            self.send(first.as_bytes())?;
        }
        // Normal Rust newlines to terminal-compatible newlines.
        for line in lines {
            self.send(b"\r\n")?;
            self.send(line.as_bytes())?;
        }
        Ok(())
    }
}
