//! Live watch: periodic streaming of parameter values.
//!
//! A bounded list of parameter IDs is streamed as one comma-separated line
//! per period while the watch is active. The `watch_*` commands configure
//! the list and period; [`LiveWatch::poll`] does the actual streaming and
//! is called from the same cooperative loop as
//! [`Cli::handle`](crate::cli::Cli::handle).

use crate::cli::{CliIo, Command, Error};

use super::{ParamEnv, ParamStore, parse_id};

/// Maximum number of parameters in the live watch list.
pub const MAX_WATCH_PARAMS: usize = 16;

/// Maximum streaming period in milliseconds accepted by `watch_rate`.
const MAX_PERIOD_MS: u32 = 60_000;

/// Live watch configuration and streaming state.
#[derive(Debug, Clone)]
pub struct LiveWatch {
    period_ms: u32,
    active: bool,
    list: heapless::Vec<u16, MAX_WATCH_PARAMS>,
    hndl_period_ms: u32,
    last_stream_ms: Option<u32>,
}

impl LiveWatch {
    /// Create an inactive watch with an empty list and a 100 ms period.
    ///
    /// `hndl_period_ms` is the period the application calls
    /// [`poll`](Self::poll) with; `watch_rate` only accepts multiples
    /// of it.
    pub fn new(hndl_period_ms: u32) -> Self {
        debug_assert!(hndl_period_ms > 0);
        Self {
            period_ms: 100,
            active: false,
            list: heapless::Vec::new(),
            hndl_period_ms,
            last_stream_ms: None,
        }
    }

    /// Current streaming period in milliseconds.
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Whether streaming is active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The watched parameter IDs in streaming order.
    pub fn ids(&self) -> &[u16] {
        &self.list
    }

    /// Stream one line of current values when the period has elapsed.
    ///
    /// Call at the handler period from ordinary task context. Does nothing
    /// while the watch is inactive or the list is empty.
    pub fn poll<S: ParamStore>(
        &mut self,
        io: &mut CliIo<'_>,
        store: &S,
        now_ms: u32,
    ) -> Result<(), Error> {
        if !self.active || self.list.is_empty() {
            return Ok(());
        }

        let due = match self.last_stream_ms {
            Some(last) => now_ms.wrapping_sub(last) >= self.period_ms,
            None => true,
        };
        if !due {
            return Ok(());
        }
        self.last_stream_ms = Some(now_ms);

        for (idx, id) in self.list.iter().enumerate() {
            match store.get(*id) {
                Ok(value) => io.print_raw(format_args!("{}", value))?,
                Err(_) => io.print_raw(format_args!("0"))?,
            }
            if idx < self.list.len() - 1 {
                io.send_raw(b",")?;
            }
        }

        io.printf(format_args!(""))
    }

    pub(crate) fn restore(&mut self, period_ms: u32, active: bool, ids: &[u16]) {
        self.list.clear();
        for id in ids.iter().take(MAX_WATCH_PARAMS) {
            // Capacity checked by the caller.
            let _ = self.list.push(*id);
        }
        self.period_ms = period_ms;
        self.active = active;
        self.last_stream_ms = None;
    }
}

/// The `watch_*` command table entries.
pub const fn commands<E: ParamEnv>() -> [Command<E>; 6] {
    [
        Command {
            name: "watch_start",
            help: "Start parameter value live watch",
            handler: watch_start::<E>,
        },
        Command {
            name: "watch_stop",
            help: "Stop parameter value live watch",
            handler: watch_stop::<E>,
        },
        Command {
            name: "watch_channel",
            help: "Set live watch channels. Args: [parId1,parId2,...,parIdN]",
            handler: watch_channel::<E>,
        },
        Command {
            name: "watch_rate",
            help: "Change live watch streaming period. Args: [miliseconds]",
            handler: watch_rate::<E>,
        },
        Command {
            name: "watch_info",
            help: "Get live watch configuration info",
            handler: watch_info::<E>,
        },
        Command {
            name: "watch_save",
            help: "Save live watch configuration into to NVM",
            handler: watch_save::<E>,
        },
    ]
}

fn unknown(io: &mut CliIo<'_>) -> Result<(), Error> {
    io.printf(format_args!("ERR, Unknown command!"))
}

fn watch_start<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let watch = env.watch_mut();
    if watch.list.is_empty() {
        return io.printf(format_args!("ERR, Streaming parameter list empty!"));
    }

    watch.active = true;
    watch.last_stream_ms = None;
    io.printf(format_args!("OK, Streaming started!"))
}

fn watch_stop<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    env.watch_mut().active = false;
    io.printf(format_args!("OK, Streaming stopped!"))
}

fn watch_channel<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    let mut ids: heapless::Vec<u16, MAX_WATCH_PARAMS> = heapless::Vec::new();
    for token in attr.split(',') {
        let id = match parse_id(token) {
            Some(id) => id,
            None => return io.printf(format_args!("ERR, Wrong command!")),
        };
        if ids.push(id).is_err() {
            return io.printf(format_args!("ERR, Invalid number of streaming parameter!"));
        }
    }

    // Validate every requested ID before touching the list.
    for id in &ids {
        if env.params().index_of(*id).is_none() {
            env.watch_mut().list.clear();
            return io.printf(format_args!(
                "ERR, Wrong parameter ID! ID: {} does not exsist!",
                id
            ));
        }
    }

    let period_s = env.watch().period_ms as f32 / 1000.0;
    io.print_raw(format_args!("OK,{}", period_s))?;
    for id in &ids {
        // IDs validated above.
        let name = env.params().info(*id).map(|info| info.name).unwrap_or("");
        io.print_raw(format_args!(",{},d,1", name))?;
    }
    io.printf(format_args!(""))?;

    env.watch_mut().list = ids;
    Ok(())
}

fn watch_rate<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    let period: u32 = match attr.trim().parse() {
        Ok(period) => period,
        Err(_) => return io.printf(format_args!("ERR, Wrong command!")),
    };

    let watch = env.watch_mut();
    if period < watch.hndl_period_ms || period > MAX_PERIOD_MS {
        return io.printf(format_args!("ERR, Period out of valid range!"));
    }
    if period % watch.hndl_period_ms != 0 {
        return io.printf(format_args!(
            "ERR, Wanted period is not multiple of handler period!"
        ));
    }

    watch.period_ms = period;
    io.printf(format_args!("OK, Period changed to {} ms", period))
}

fn watch_info<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let watch = env.watch();
    io.print_raw(format_args!(
        "OK, {},{},{}",
        watch.period_ms,
        watch.active as u8,
        watch.list.len()
    ))?;
    for id in &watch.list {
        io.print_raw(format_args!(",{}", id))?;
    }
    io.printf(format_args!(""))
}

fn watch_save<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let snapshot = env.watch().clone();
    let stored = match env.nvm() {
        Some(nvm) => super::save_watch(nvm, &snapshot).is_ok(),
        None => false,
    };

    if stored {
        io.printf(format_args!("OK, Streaming info stored to NVM successfully"))
    } else {
        io.printf(format_args!(
            "ERR, Error while storing streaming info to NVM!"
        ))
    }
}
