//! Command line interface engine.
//!
//! The [`Cli`] engine owns the transport, the reception and transmit
//! buffers, the logical output channels and the command table registry. A
//! cooperative [`Cli::handle`] call drains the transport, and once a full
//! terminator-delimited line has been captured, splits it into a command
//! name and attribute string and dispatches it: built-in commands first,
//! then every registered table in registration order, then the unknown
//! command response.
//!
//! The engine is generic over the transport ([`Port`]) and over an
//! application environment `E` that is threaded by value through
//! [`Cli::handle`] into every command handler, so handlers reach their
//! subsystems through a typed reference instead of globals.

pub mod error;

mod line;
mod output;
mod registry;
mod split;

pub use error::Error;
pub use line::RX_BUF_SIZE;
pub use output::{ChannelDef, CliIo, MAX_CHANNELS, TX_BUF_SIZE};
pub use registry::{Command, CommandTable, Handler, MAX_TABLES};

use core::fmt;

use line::LineAccumulator;
use output::Channels;
use registry::Registry;

/// Byte transport and platform hooks the application implements.
///
/// `transmit`/`receive` map directly onto the underlying UART, USB CDC or
/// similar driver. The mutex hooks bracket every transmit so that output
/// from concurrent contexts cannot interleave; single-context applications
/// can rely on the default no-op implementations. `now_ms` supplies the
/// millisecond tick used for reception timeout tracking.
pub trait Port {
    /// Send a buffer out the transport.
    fn transmit(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Fetch the next received byte, or `None` when the transport is dry.
    fn receive(&mut self) -> Result<Option<u8>, Error>;

    /// Take the transmit lock.
    fn acquire_mutex(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Release the transmit lock.
    fn release_mutex(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Perform a device reset, requested by the `reset` built-in.
    fn device_reset(&mut self) {}

    /// Current monotonic time in milliseconds. Wrapping is fine.
    fn now_ms(&mut self) -> u32;
}

/// Identification strings shown in the intro banner and by the
/// `sw_ver`/`hw_ver`/`proj_info` built-ins.
#[derive(Debug, Clone, Copy)]
pub struct Intro {
    /// Project name, centered in the banner.
    pub project: &'static str,
    /// Software version string.
    pub sw_ver: &'static str,
    /// Hardware version string.
    pub hw_ver: &'static str,
    /// Free-form project information for `proj_info`.
    pub proj_info: &'static str,
}

/// Static engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Line terminator appended to every response and scanned for on
    /// reception. Must not be empty.
    pub terminator: &'static str,
    /// Reception timeout for a partially received line, measured from its
    /// first byte. `None` disables the timeout.
    pub rx_timeout_ms: Option<u32>,
    /// When set, an intro banner is sent on [`Cli::init`] and the version
    /// built-ins report these strings.
    pub intro: Option<Intro>,
    /// Logical output channel table.
    pub channels: &'static [ChannelDef],
    /// Emit internal diagnostics (e.g. reception overrun) as responses.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terminator: "\r\n",
            rx_timeout_ms: Some(100),
            intro: None,
            channels: &[],
            debug: false,
        }
    }
}

const SEPARATOR: &str = "--------------------------------------------------------";
const BANNER_EDGE: &str = "********************************************************";

#[derive(Clone, Copy)]
enum Builtin {
    Help,
    Reset,
    SwVer,
    HwVer,
    ProjInfo,
    ChInfo,
    ChEn,
}

struct BuiltinCmd {
    name: &'static str,
    help: &'static str,
    kind: Builtin,
}

const BUILTINS: &[BuiltinCmd] = &[
    BuiltinCmd {
        name: "help",
        help: "Print all commands help",
        kind: Builtin::Help,
    },
    BuiltinCmd {
        name: "reset",
        help: "Reset device",
        kind: Builtin::Reset,
    },
    BuiltinCmd {
        name: "sw_ver",
        help: "Print device software version",
        kind: Builtin::SwVer,
    },
    BuiltinCmd {
        name: "hw_ver",
        help: "Print device hardware version",
        kind: Builtin::HwVer,
    },
    BuiltinCmd {
        name: "proj_info",
        help: "Print project informations",
        kind: Builtin::ProjInfo,
    },
    BuiltinCmd {
        name: "ch_info",
        help: "Print COM channel informations",
        kind: Builtin::ChInfo,
    },
    BuiltinCmd {
        name: "ch_en",
        help: "Enable/disable COM channel [chEnum][en]",
        kind: Builtin::ChEn,
    },
];

/// The command line interface engine.
///
/// `'t` bounds the lifetime of registered command tables, `P` is the
/// transport and `E` the application environment handed to handlers.
pub struct Cli<'t, P, E> {
    port: P,
    cfg: Config,
    rx: LineAccumulator,
    tx: heapless::String<TX_BUF_SIZE>,
    channels: Channels,
    registry: Registry<'t, E>,
    is_init: bool,
}

impl<'t, P: Port, E> Cli<'t, P, E> {
    /// Create an engine over `port` with the given configuration.
    ///
    /// The engine is inert until [`init`](Self::init) is called.
    pub fn new(port: P, cfg: Config) -> Self {
        debug_assert!(!cfg.terminator.is_empty());
        Self {
            port,
            channels: Channels::new(cfg.channels),
            cfg,
            rx: LineAccumulator::new(),
            tx: heapless::String::new(),
            registry: Registry::new(),
            is_init: false,
        }
    }

    /// Initialize the engine and, when configured, send the intro banner.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.is_init {
            return Err(Error::AlreadyInitialized);
        }
        self.is_init = true;

        if let Some(intro) = self.cfg.intro {
            let mut io = self.io();
            io.printf(format_args!(" "))?;
            io.printf(format_args!("{}", BANNER_EDGE))?;
            io.printf(format_args!("        {}", intro.project))?;
            io.printf(format_args!("{}", BANNER_EDGE))?;
            io.printf(format_args!(" {}", intro.sw_ver))?;
            io.printf(format_args!(" {}", intro.hw_ver))?;
            io.printf(format_args!(" "))?;
            io.printf(format_args!(" Enter 'help' to display supported commands"))?;
            io.printf(format_args!("{}", BANNER_EDGE))?;
            io.printf(format_args!("Ready to take orders..."))?;
        }

        Ok(())
    }

    /// Shut the engine down. A subsequent [`init`](Self::init) restarts it.
    pub fn deinit(&mut self) -> Result<(), Error> {
        if !self.is_init {
            return Err(Error::NotInitialized);
        }
        self.is_init = false;
        Ok(())
    }

    /// Whether [`init`](Self::init) has completed.
    pub fn is_init(&self) -> bool {
        self.is_init
    }

    /// Register a command table.
    ///
    /// Tables are consulted in registration order, after the built-ins;
    /// registration is append-only. An invalid table (empty name, name with
    /// spaces, empty help) is rejected as a whole.
    pub fn register(&mut self, table: &'t CommandTable<'t, E>) -> Result<(), Error> {
        let res = self.registry.register(table);
        if self.cfg.debug && matches!(res, Err(Error::InvalidTable)) {
            self.io()
                .printf(format_args!("CLI ERROR: Invalid definition of user table!"))?;
        }
        res
    }

    /// Service reception: drain the transport and dispatch at most one
    /// completed command line.
    ///
    /// Call cyclically from the main loop or a low-priority task. Reception
    /// overrun and timeout reset the line buffer and are reported as
    /// errors, but the engine stays fully operational.
    pub fn handle(&mut self, env: &mut E) -> Result<(), Error> {
        if !self.is_init {
            return Err(Error::NotInitialized);
        }

        let now = self.port.now_ms();
        let Cli {
            cfg,
            port,
            rx,
            tx,
            channels,
            registry,
            ..
        } = self;

        let got = match rx.poll(port, now, cfg.terminator, cfg.rx_timeout_ms) {
            Ok(got) => got,
            Err(err) => {
                if cfg.debug && err == Error::Overrun {
                    let mut io = CliIo {
                        port,
                        tx,
                        channels,
                        terminator: cfg.terminator,
                    };
                    io.printf(format_args!("CLI: Overrun Error!"))?;
                }
                return Err(err);
            }
        };

        if !got {
            return Ok(());
        }

        // A line that is not valid UTF-8 cannot name any command.
        let cmd_line = core::str::from_utf8(rx.line()).unwrap_or("");
        let (name, attr) = split::split(cmd_line);

        let mut io = CliIo {
            port,
            tx,
            channels,
            terminator: cfg.terminator,
        };

        if let Some(builtin) = BUILTINS.iter().find(|b| b.name == name) {
            return exec_builtin(builtin.kind, &mut io, cfg, registry, attr);
        }

        if let Some(cmd) = registry.lookup(name) {
            return (cmd.handler)(&mut io, env, attr);
        }

        unknown(&mut io)
    }

    /// Format and transmit one response line.
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error> {
        if !self.is_init {
            return Err(Error::NotInitialized);
        }
        self.io().printf(args)
    }

    /// Format and transmit on a logical channel; dropped while the channel
    /// is disabled.
    pub fn printf_ch(&mut self, ch: usize, args: fmt::Arguments<'_>) -> Result<(), Error> {
        if !self.is_init {
            return Err(Error::NotInitialized);
        }
        self.io().printf_ch(ch, args)
    }

    /// Borrow the output handle, e.g. to drive periodic streaming.
    pub fn io(&mut self) -> CliIo<'_> {
        CliIo {
            port: &mut self.port,
            tx: &mut self.tx,
            channels: &mut self.channels,
            terminator: self.cfg.terminator,
        }
    }

    /// Access the underlying transport.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutable access to the underlying transport.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

fn exec_builtin<E>(
    kind: Builtin,
    io: &mut CliIo<'_>,
    cfg: &Config,
    registry: &Registry<'_, E>,
    attr: Option<&str>,
) -> Result<(), Error> {
    match kind {
        Builtin::Help => {
            if attr.is_some() {
                return unknown(io);
            }
            help(io, registry)
        }
        Builtin::Reset => {
            if attr.is_some() {
                return unknown(io);
            }
            io.printf(format_args!("OK, Reseting device..."))?;
            io.device_reset();
            Ok(())
        }
        Builtin::SwVer => {
            if attr.is_some() {
                return unknown(io);
            }
            match cfg.intro {
                Some(intro) => io.printf(format_args!("OK, {}", intro.sw_ver)),
                None => io.printf(format_args!("WAR, Not used...")),
            }
        }
        Builtin::HwVer => {
            if attr.is_some() {
                return unknown(io);
            }
            match cfg.intro {
                Some(intro) => io.printf(format_args!("OK, {}", intro.hw_ver)),
                None => io.printf(format_args!("WAR, Not used...")),
            }
        }
        Builtin::ProjInfo => {
            if attr.is_some() {
                return unknown(io);
            }
            match cfg.intro {
                Some(intro) => io.printf(format_args!("OK, {}", intro.proj_info)),
                None => io.printf(format_args!("WAR, Not used...")),
            }
        }
        Builtin::ChInfo => {
            if attr.is_some() {
                return unknown(io);
            }
            ch_info(io)
        }
        Builtin::ChEn => match attr.and_then(parse_ch_en) {
            Some((ch, en)) => {
                let ch = ch as usize;
                if io.set_channel_enabled(ch, en != 0) {
                    // Name is known to exist after a successful enable.
                    let name = io.channel_name(ch).unwrap_or("");
                    io.printf(format_args!(
                        "OK, {} channel {}",
                        if en != 0 { "Enabling" } else { "Disabling" },
                        name
                    ))
                } else {
                    io.printf(format_args!("ERR, Invalid chEnum!"))
                }
            }
            None => unknown(io),
        },
    }
}

fn help<E>(io: &mut CliIo<'_>, registry: &Registry<'_, E>) -> Result<(), Error> {
    io.printf(format_args!(" "))?;
    io.printf(format_args!("    List of device commands "))?;
    io.printf(format_args!("{}", SEPARATOR))?;

    for builtin in BUILTINS {
        io.printf(format_args!("{:<25}{}", builtin.name, builtin.help))?;
    }

    for table in registry.tables() {
        io.printf(format_args!("{}", SEPARATOR))?;
        for cmd in table.commands() {
            io.printf(format_args!("{:<25}{}", cmd.name, cmd.help))?;
        }
    }

    io.printf(format_args!("{}", SEPARATOR))
}

fn ch_info(io: &mut CliIo<'_>) -> Result<(), Error> {
    io.printf(format_args!("{}", SEPARATOR))?;
    io.printf(format_args!("        Communication Channels Info"))?;
    io.printf(format_args!("{}", SEPARATOR))?;
    io.printf(format_args!("  {:<8}{:<20}{}", "chEnum", "Name", "State"))?;
    io.printf(format_args!(" ------------------------------------"))?;

    for ch in 0..io.channel_count() {
        let name = io.channel_name(ch).unwrap_or("");
        let state = if io.channel_enabled(ch) {
            "Enable"
        } else {
            "Disable"
        };
        io.printf(format_args!("    {:02}    {:<20}{}", ch, name, state))?;
    }

    io.printf(format_args!("{}", SEPARATOR))
}

fn unknown(io: &mut CliIo<'_>) -> Result<(), Error> {
    io.printf(format_args!("ERR, Unknown command!"))
}

fn parse_ch_en(attr: &str) -> Option<(u32, u32)> {
    let (ch, en) = attr.split_once(',')?;
    let ch = ch.trim().parse().ok()?;
    let en = en.trim().parse().ok()?;
    Some((ch, en))
}
