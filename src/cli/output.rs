//! Formatted output channel.
//!
//! All responses leave the device through [`CliIo`]: text is formatted into
//! a bounded staging buffer, the line terminator is appended and the result
//! is handed to the transport in one transmit call, bracketed by the
//! transport's mutex hooks so concurrent printers cannot interleave bytes.
//!
//! On top of plain printing sit the named logical channels: tagged message
//! streams (`WARNING`, `ERROR`, application defined ones) that can be
//! enabled and disabled at runtime through the `ch_en` built-in.

use core::fmt::{self, Write as _};

use super::Port;
use super::error::Error;

/// Transmit staging buffer size in bytes.
///
/// A single formatted response (terminator included) must fit here;
/// longer output is reported as [`Error::Truncated`] and not sent.
pub const TX_BUF_SIZE: usize = 512;

/// Maximum number of logical output channels.
pub const MAX_CHANNELS: usize = 8;

/// Static definition of one logical output channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelDef {
    /// Channel name, printed as a `name: ` prefix on every message.
    pub name: &'static str,
    /// Whether the channel starts enabled.
    pub enabled: bool,
}

/// Runtime enable state over a static channel table.
pub(crate) struct Channels {
    defs: &'static [ChannelDef],
    en: [bool; MAX_CHANNELS],
}

impl Channels {
    pub(crate) fn new(defs: &'static [ChannelDef]) -> Self {
        debug_assert!(defs.len() <= MAX_CHANNELS);
        let mut en = [false; MAX_CHANNELS];
        for (slot, def) in en.iter_mut().zip(defs) {
            *slot = def.enabled;
        }
        Self { defs, en }
    }

    pub(crate) fn len(&self) -> usize {
        self.defs.len()
    }

    pub(crate) fn name(&self, ch: usize) -> Option<&'static str> {
        self.defs.get(ch).map(|d| d.name)
    }

    pub(crate) fn is_enabled(&self, ch: usize) -> bool {
        ch < self.defs.len() && self.en[ch]
    }

    pub(crate) fn set_enabled(&mut self, ch: usize, enable: bool) -> bool {
        if ch < self.defs.len() {
            self.en[ch] = enable;
            true
        } else {
            false
        }
    }
}

/// Handle through which command handlers and the engine produce output.
///
/// Borrows the engine's transport, staging buffer and channel state for the
/// duration of one dispatch, so handlers can print without owning any of
/// the engine's plumbing.
pub struct CliIo<'a> {
    pub(crate) port: &'a mut dyn Port,
    pub(crate) tx: &'a mut heapless::String<TX_BUF_SIZE>,
    pub(crate) channels: &'a mut Channels,
    pub(crate) terminator: &'a str,
}

impl CliIo<'_> {
    /// Format and transmit one response line, terminator appended.
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error> {
        self.tx.clear();
        self.tx.write_fmt(args).map_err(|_| Error::Truncated)?;
        self.tx
            .push_str(self.terminator)
            .map_err(|_| Error::Truncated)?;
        self.flush()
    }

    /// Format and transmit on a logical channel.
    ///
    /// The message is prefixed with the channel name. Output on a disabled
    /// or unknown channel is silently dropped.
    pub fn printf_ch(&mut self, ch: usize, args: fmt::Arguments<'_>) -> Result<(), Error> {
        if !self.channels.is_enabled(ch) {
            return Ok(());
        }
        let name = match self.channels.name(ch) {
            Some(name) => name,
            None => return Ok(()),
        };

        self.tx.clear();
        self.tx
            .write_fmt(format_args!("{}: {}", name, args))
            .map_err(|_| Error::Truncated)?;
        self.tx
            .push_str(self.terminator)
            .map_err(|_| Error::Truncated)?;
        self.flush()
    }

    /// Format and transmit without appending the terminator.
    ///
    /// Used to build up a single line across several calls, e.g. streaming
    /// values separated by commas; finish the line with an empty
    /// [`printf`](Self::printf).
    pub fn print_raw(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error> {
        self.tx.clear();
        self.tx.write_fmt(args).map_err(|_| Error::Truncated)?;
        self.flush()
    }

    /// Transmit pre-formatted bytes, still under the mutex discipline.
    pub fn send_raw(&mut self, data: &[u8]) -> Result<(), Error> {
        self.port.acquire_mutex()?;
        let result = self.port.transmit(data);
        self.port.release_mutex()?;
        result
    }

    /// Number of defined logical channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Name of channel `ch`, if defined.
    pub fn channel_name(&self, ch: usize) -> Option<&'static str> {
        self.channels.name(ch)
    }

    /// Whether channel `ch` is currently enabled.
    pub fn channel_enabled(&self, ch: usize) -> bool {
        self.channels.is_enabled(ch)
    }

    /// Enable or disable channel `ch`. Returns `false` for unknown channels.
    pub fn set_channel_enabled(&mut self, ch: usize, enable: bool) -> bool {
        self.channels.set_enabled(ch, enable)
    }

    /// Request a device reset through the transport hook.
    pub fn device_reset(&mut self) {
        self.port.device_reset();
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.port.acquire_mutex()?;
        let result = self.port.transmit(self.tx.as_bytes());
        self.port.release_mutex()?;
        result
    }
}

/// Format and transmit one response line through a [`CliIo`] or
/// [`Cli`](crate::cli::Cli), `printf` style.
///
/// ```rust
/// # use libcli::cli::{Cli, Config, Error, Port};
/// # struct P;
/// # impl Port for P {
/// #     fn transmit(&mut self, _d: &[u8]) -> Result<(), Error> { Ok(()) }
/// #     fn receive(&mut self) -> Result<Option<u8>, Error> { Ok(None) }
/// #     fn now_ms(&mut self) -> u32 { 0 }
/// # }
/// # let mut cli: Cli<'_, _, ()> = Cli::new(P, Config::default());
/// # cli.init().unwrap();
/// libcli::cli_printf!(cli, "OK, temperature={}", 23.5).unwrap();
/// ```
#[macro_export]
macro_rules! cli_printf {
    ($cli:expr, $($arg:tt)*) => {
        $cli.printf(core::format_args!($($arg)*))
    };
}
