//! Common error type for CLI operations

/// A common error type for CLI operations.
///
/// This enum defines the set of errors that can occur while receiving,
/// parsing, dispatching and responding to command lines. It is designed to
/// be simple and portable for `no_std` environments.
///
/// Reception errors ([`Error::Overrun`], [`Error::Timeout`]) are recovered
/// locally by the engine (the reception buffer is reset and the next line
/// starts fresh); they are surfaced to the caller of
/// [`Cli::handle`](crate::cli::Cli::handle) purely as a status.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted before [`Cli::init`](crate::cli::Cli::init).
    NotInitialized,
    /// [`Cli::init`](crate::cli::Cli::init) was called twice.
    AlreadyInitialized,
    /// The transport failed while receiving a byte.
    Receive,
    /// The transport failed while transmitting a buffer.
    Transmit,
    /// The reception buffer filled up without a terminator being seen.
    Overrun,
    /// A partially received line went stale before its terminator arrived.
    Timeout,
    /// A formatted response did not fit the transmit staging buffer.
    Truncated,
    /// A command table failed validation at registration time.
    InvalidTable,
    /// The table registry is full.
    RegistryFull,
    /// The transmit mutex could not be acquired.
    Mutex,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotInitialized => defmt::write!(f, "NotInitialized"),
            Error::AlreadyInitialized => defmt::write!(f, "AlreadyInitialized"),
            Error::Receive => defmt::write!(f, "Receive"),
            Error::Transmit => defmt::write!(f, "Transmit"),
            Error::Overrun => defmt::write!(f, "Overrun"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::Truncated => defmt::write!(f, "Truncated"),
            Error::InvalidTable => defmt::write!(f, "InvalidTable"),
            Error::RegistryFull => defmt::write!(f, "RegistryFull"),
            Error::Mutex => defmt::write!(f, "Mutex"),
        }
    }
}
