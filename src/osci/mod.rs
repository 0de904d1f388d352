//! Software oscilloscope CLI extension.
//!
//! Samples a small set of parameters at a fixed rate into a staging buffer
//! under trigger, pre-trigger and downsample control, then hands the data
//! out over the CLI as CSV lines. [`Osci::sample`] is the fixed-period
//! sampling hook and is the one entry point allowed to run from interrupt
//! context: it only reads the parameter store and writes the staging
//! buffer, it never touches the output channel. Readout and configuration
//! happen through the `osci_*` commands from task context.
//!
//! Capture sequence: `osci_start` arms the scope (Idle/Done → Waiting);
//! while Waiting every kept tick records one frame into a pre-trigger ring
//! and evaluates the trigger; once triggered (Sampling) frames are recorded
//! until the buffer holds a full capture, keeping the configured share of
//! pre-trigger history; Done exposes the data to `osci_data`.

use core::fmt;

use crate::cli::{CliIo, Command, Error};
use crate::param::{ParamEnv, ParamStore, parse_id};

/// Staging buffer size in samples, shared by all channels of a capture.
pub const OSCI_BUF_SIZE: usize = 512;

/// Maximum number of sampled channels.
pub const MAX_OSCI_PARAMS: usize = 8;

/// Trigger condition. Discriminants are the `osci_trigger` wire codes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Trigger {
    /// Start sampling immediately on arm.
    None = 0,
    /// Trigger parameter crosses the threshold upward.
    RisingEdge = 1,
    /// Trigger parameter crosses the threshold downward.
    FallingEdge = 2,
    /// Either crossing direction.
    BothEdges = 3,
}

impl Trigger {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Trigger::None),
            1 => Some(Trigger::RisingEdge),
            2 => Some(Trigger::FallingEdge),
            3 => Some(Trigger::BothEdges),
            _ => None,
        }
    }
}

/// Capture state machine.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// Not armed.
    Idle = 0,
    /// Armed, recording pre-trigger history, waiting for the trigger.
    Waiting = 1,
    /// Triggered, recording post-trigger frames.
    Sampling = 2,
    /// Capture complete, data available.
    Done = 3,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Idle => "IDLE",
            State::Waiting => "WAITING",
            State::Sampling => "SAMPLING",
            State::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Software oscilloscope configuration and staging buffer.
pub struct Osci {
    channels: heapless::Vec<u16, MAX_OSCI_PARAMS>,
    buf: [f32; OSCI_BUF_SIZE],
    state: State,
    trigger: Trigger,
    trig_id: u16,
    threshold: f32,
    /// Share of the buffer kept from before the trigger point, 0.0..=1.0.
    pretrigger: f32,
    downsample: u32,
    skip: u32,
    prev: Option<f32>,
    write: usize,
    filled: usize,
    post_remaining: usize,
    start: usize,
    frames_total: usize,
}

impl Osci {
    /// Create an idle oscilloscope with an empty channel list, no trigger
    /// and downsample factor 1.
    pub fn new() -> Self {
        Self {
            channels: heapless::Vec::new(),
            buf: [0.0; OSCI_BUF_SIZE],
            state: State::Idle,
            trigger: Trigger::None,
            trig_id: 0,
            threshold: 0.0,
            pretrigger: 0.0,
            downsample: 1,
            skip: 0,
            prev: None,
            write: 0,
            filled: 0,
            post_remaining: 0,
            start: 0,
            frames_total: 0,
        }
    }

    /// Current capture state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The sampled parameter IDs, one buffer channel each.
    pub fn channels(&self) -> &[u16] {
        &self.channels
    }

    /// Record one tick. Safe to call from interrupt context: never blocks,
    /// never produces output.
    ///
    /// Call at the sampling rate regardless of state; it is a no-op unless
    /// armed. Downsampling drops ticks before any other processing, so the
    /// trigger is evaluated on kept ticks only.
    pub fn sample<S: ParamStore>(&mut self, store: &S) {
        if self.channels.is_empty()
            || !matches!(self.state, State::Waiting | State::Sampling)
        {
            return;
        }

        if self.skip > 0 {
            self.skip -= 1;
            return;
        }
        self.skip = self.downsample - 1;

        let cap = self.frame_cap();
        let frame = self.write;
        for (ch, id) in self.channels.iter().enumerate() {
            let value = store.get(*id).map(|v| v.as_f32()).unwrap_or(0.0);
            self.buf[frame * self.channels.len() + ch] = value;
        }
        self.write = (self.write + 1) % cap;

        match self.state {
            State::Waiting => {
                self.filled = (self.filled + 1).min(cap);

                let value = store
                    .get(self.trig_id)
                    .map(|v| v.as_f32())
                    .unwrap_or(0.0);
                let fired = match (self.trigger, self.prev) {
                    (Trigger::None, _) => true,
                    (Trigger::RisingEdge, Some(prev)) => {
                        prev < self.threshold && value >= self.threshold
                    }
                    (Trigger::FallingEdge, Some(prev)) => {
                        prev > self.threshold && value <= self.threshold
                    }
                    (Trigger::BothEdges, Some(prev)) => {
                        (prev < self.threshold && value >= self.threshold)
                            || (prev > self.threshold && value <= self.threshold)
                    }
                    (_, None) => false,
                };
                self.prev = Some(value);

                if fired {
                    let pre_keep = self
                        .filled
                        .min((self.pretrigger * cap as f32) as usize + 1);
                    self.frames_total = pre_keep;
                    self.post_remaining = cap - pre_keep;
                    self.state = State::Sampling;
                    if self.post_remaining == 0 {
                        self.finish(cap);
                    }
                }
            }
            State::Sampling => {
                self.frames_total += 1;
                self.post_remaining -= 1;
                if self.post_remaining == 0 {
                    self.finish(cap);
                }
            }
            _ => {}
        }
    }

    fn finish(&mut self, cap: usize) {
        self.state = State::Done;
        self.start = (self.write + cap - self.frames_total) % cap;
    }

    fn arm(&mut self) {
        self.state = State::Waiting;
        self.skip = 0;
        self.prev = None;
        self.write = 0;
        self.filled = 0;
        self.post_remaining = 0;
        self.start = 0;
        self.frames_total = 0;
    }

    fn frame_cap(&self) -> usize {
        OSCI_BUF_SIZE / self.channels.len()
    }

    fn frame(&self, idx: usize) -> &[f32] {
        let cap = self.frame_cap();
        let frame = (self.start + idx) % cap;
        let nch = self.channels.len();
        &self.buf[frame * nch..frame * nch + nch]
    }

    fn busy(&self) -> bool {
        matches!(self.state, State::Waiting | State::Sampling)
    }
}

impl Default for Osci {
    fn default() -> Self {
        Self::new()
    }
}

/// Application environment consumed by the `osci_*` handlers.
pub trait OsciEnv: ParamEnv {
    /// The oscilloscope.
    fn osci(&self) -> &Osci;

    /// The oscilloscope, mutably.
    fn osci_mut(&mut self) -> &mut Osci;
}

/// The `osci_*` command table entries.
pub const fn commands<E: OsciEnv>() -> [Command<E>; 8] {
    [
        Command {
            name: "osci_start",
            help: "Start (trigger) oscilloscope",
            handler: osci_start::<E>,
        },
        Command {
            name: "osci_stop",
            help: "Stop or cancel ongoing sampling",
            handler: osci_stop::<E>,
        },
        Command {
            name: "osci_data",
            help: "Get oscilloscope sampled data",
            handler: osci_data::<E>,
        },
        Command {
            name: "osci_channel",
            help: "Set oscilloscope channels [par1,par2,...,parN]",
            handler: osci_channel::<E>,
        },
        Command {
            name: "osci_trigger",
            help: "Set oscilloscope trigger [type,par,threshold,pre-trigger]",
            handler: osci_trigger::<E>,
        },
        Command {
            name: "osci_downsample",
            help: "Set oscilloscope downsample factor [downsample]",
            handler: osci_downsample::<E>,
        },
        Command {
            name: "osci_state",
            help: "Get oscilloscope state",
            handler: osci_state::<E>,
        },
        Command {
            name: "osci_info",
            help: "Get information of oscilloscope configuration",
            handler: osci_info::<E>,
        },
    ]
}

fn unknown(io: &mut CliIo<'_>) -> Result<(), Error> {
    io.printf(format_args!("ERR, Unknown command!"))
}

fn cfg_locked(io: &mut CliIo<'_>) -> Result<(), Error> {
    io.printf(format_args!(
        "WAR, Oscilloscope cfg cannot be changed during sampling!"
    ))
}

fn osci_start<E: OsciEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let osci = env.osci_mut();
    if osci.busy() {
        return io.printf(format_args!("WAR, Oscilloscope is already running..."));
    }
    if osci.channels.is_empty() {
        return io.printf(format_args!("ERR, Oscilloscope channel list empty!"));
    }

    osci.arm();
    io.printf(format_args!("OK, Oscilloscope started!"))
}

fn osci_stop<E: OsciEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    env.osci_mut().state = State::Idle;
    io.printf(format_args!("OK, Oscilloscope stopped!"))
}

fn osci_data<E: OsciEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let osci = env.osci();
    if osci.state != State::Done {
        return io.printf(format_args!(
            "WAR, Sampled data not available at the moment..."
        ));
    }

    for idx in 0..osci.frames_total {
        let frame = osci.frame(idx);
        for (ch, value) in frame.iter().enumerate() {
            io.print_raw(format_args!("{}", value))?;
            if ch < frame.len() - 1 {
                io.send_raw(b",")?;
            }
        }
        io.printf(format_args!(""))?;
    }

    Ok(())
}

fn osci_channel<E: OsciEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    if env.osci().busy() {
        return cfg_locked(io);
    }

    let mut ids: heapless::Vec<u16, MAX_OSCI_PARAMS> = heapless::Vec::new();
    for token in attr.split(',') {
        let id = match parse_id(token) {
            Some(id) => id,
            None => return io.printf(format_args!("ERR, Wrong command!")),
        };
        if ids.push(id).is_err() {
            return io.printf(format_args!(
                "ERR, Invalid number of oscilloscope parameter!"
            ));
        }
    }

    for id in &ids {
        if env.params().index_of(*id).is_none() {
            return io.printf(format_args!(
                "ERR, Wrong parameter ID! ID: {} does not exsist!",
                id
            ));
        }
    }

    let osci = env.osci_mut();
    osci.channels = ids;
    osci.state = State::Idle;
    io.printf(format_args!("OK, Oscilloscope channels set!"))
}

fn osci_trigger<E: OsciEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    if env.osci().busy() {
        return cfg_locked(io);
    }

    let mut fields = attr.split(',');
    let parsed = (|| {
        let code: u8 = fields.next()?.trim().parse().ok()?;
        let id: u16 = fields.next()?.trim().parse().ok()?;
        let threshold: f32 = fields.next()?.trim().parse().ok()?;
        let pretrigger: f32 = fields.next()?.trim().parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some((code, id, threshold, pretrigger))
    })();

    let (code, id, threshold, pretrigger) = match parsed {
        Some(parsed) => parsed,
        None => return io.printf(format_args!("ERR, Wrong command!")),
    };

    let trigger = match Trigger::from_code(code) {
        Some(trigger) => trigger,
        None => return io.printf(format_args!("ERR, Invalid trigger type!")),
    };

    if trigger != Trigger::None && env.params().index_of(id).is_none() {
        return io.printf(format_args!("ERR, Wrong parameter ID!"));
    }

    if !(0.0..=1.0).contains(&pretrigger) {
        return io.printf(format_args!("ERR, Invalid pre-trigger!"));
    }

    let osci = env.osci_mut();
    osci.trigger = trigger;
    osci.trig_id = id;
    osci.threshold = threshold;
    osci.pretrigger = pretrigger;
    io.printf(format_args!("OK, Oscilloscope trigger set!"))
}

fn osci_downsample<E: OsciEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    if env.osci().busy() {
        return cfg_locked(io);
    }

    let factor: u32 = match attr.trim().parse() {
        Ok(factor) => factor,
        Err(_) => return io.printf(format_args!("ERR, Wrong command!")),
    };

    if factor == 0 {
        return io.printf(format_args!("ERR, Invalid downsample factor!"));
    }

    env.osci_mut().downsample = factor;
    io.printf(format_args!("OK, Downsample factor set to {}", factor))
}

fn osci_state<E: OsciEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    io.printf(format_args!("OK, {}", env.osci().state()))
}

fn osci_info<E: OsciEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let osci = env.osci();
    io.print_raw(format_args!(
        "OK, {},{},{},{},{},{}",
        osci.trigger as u8,
        osci.trig_id,
        osci.threshold,
        osci.pretrigger,
        osci.downsample,
        osci.channels.len()
    ))?;
    for id in &osci.channels {
        io.print_raw(format_args!(",{}", id))?;
    }
    io.printf(format_args!(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParamAccess, ParamError, ParamInfo, ParamValue};

    struct OneParam {
        info: ParamInfo,
        value: f32,
    }

    impl OneParam {
        fn new(value: f32) -> Self {
            Self {
                info: ParamInfo {
                    id: 1,
                    name: "current",
                    unit: "A",
                    desc: "",
                    group: None,
                    def: ParamValue::F32(0.0),
                    min: ParamValue::F32(-100.0),
                    max: ParamValue::F32(100.0),
                    access: ParamAccess::ReadWrite,
                    persistent: false,
                },
                value,
            }
        }
    }

    impl ParamStore for OneParam {
        fn len(&self) -> usize {
            1
        }
        fn info_at(&self, idx: usize) -> Option<&ParamInfo> {
            (idx == 0).then_some(&self.info)
        }
        fn index_of(&self, id: u16) -> Option<usize> {
            (id == 1).then_some(0)
        }
        fn get(&self, id: u16) -> Result<ParamValue, ParamError> {
            if id == 1 {
                Ok(ParamValue::F32(self.value))
            } else {
                Err(ParamError::UnknownId)
            }
        }
        fn set(&mut self, _id: u16, _value: ParamValue) -> Result<(), ParamError> {
            Ok(())
        }
        fn set_default(&mut self, _id: u16) -> Result<(), ParamError> {
            Ok(())
        }
        fn set_default_all(&mut self) {}
    }

    fn armed_osci(trigger: Trigger, threshold: f32, pretrigger: f32) -> Osci {
        let mut osci = Osci::new();
        osci.channels.push(1).unwrap();
        osci.trigger = trigger;
        osci.trig_id = 1;
        osci.threshold = threshold;
        osci.pretrigger = pretrigger;
        osci.arm();
        osci
    }

    #[test]
    fn immediate_trigger_fills_buffer() {
        let mut osci = armed_osci(Trigger::None, 0.0, 0.0);
        let mut store = OneParam::new(0.0);

        for tick in 0..OSCI_BUF_SIZE {
            assert_ne!(osci.state(), State::Done);
            store.value = tick as f32;
            osci.sample(&store);
        }

        assert_eq!(osci.state(), State::Done);
        assert_eq!(osci.frames_total, OSCI_BUF_SIZE);
        assert_eq!(osci.frame(0), &[0.0]);
        assert_eq!(osci.frame(OSCI_BUF_SIZE - 1), &[(OSCI_BUF_SIZE - 1) as f32]);
    }

    #[test]
    fn rising_edge_waits_for_crossing() {
        let mut osci = armed_osci(Trigger::RisingEdge, 1.0, 0.0);
        let mut store = OneParam::new(0.0);

        // Below threshold: stays in Waiting.
        for _ in 0..10 {
            osci.sample(&store);
        }
        assert_eq!(osci.state(), State::Waiting);

        // Crossing upward fires.
        store.value = 2.0;
        osci.sample(&store);
        assert_eq!(osci.state(), State::Sampling);

        for _ in 0..OSCI_BUF_SIZE {
            osci.sample(&store);
        }
        assert_eq!(osci.state(), State::Done);
        // The trigger frame is the first retained frame.
        assert_eq!(osci.frame(0), &[2.0]);
    }

    #[test]
    fn falling_edge_ignores_rising_crossing() {
        let mut osci = armed_osci(Trigger::FallingEdge, 1.0, 0.0);
        let mut store = OneParam::new(2.0);

        osci.sample(&store);
        store.value = 0.5;
        osci.sample(&store);
        assert_eq!(osci.state(), State::Sampling);

        let mut osci = armed_osci(Trigger::FallingEdge, 1.0, 0.0);
        let mut store = OneParam::new(0.0);
        osci.sample(&store);
        store.value = 2.0;
        osci.sample(&store);
        assert_eq!(osci.state(), State::Waiting);
    }

    #[test]
    fn pretrigger_retains_history() {
        let mut osci = armed_osci(Trigger::RisingEdge, 10.0, 0.5);
        let mut store = OneParam::new(0.0);

        // Four pre-trigger samples 0,1,2,3 then the trigger at 20.
        for tick in 0..4 {
            store.value = tick as f32;
            osci.sample(&store);
        }
        store.value = 20.0;
        osci.sample(&store);
        assert_eq!(osci.state(), State::Sampling);

        store.value = 99.0;
        while osci.state() == State::Sampling {
            osci.sample(&store);
        }

        // All five pre-trigger frames fit within the 50% budget.
        assert_eq!(osci.frame(0), &[0.0]);
        assert_eq!(osci.frame(3), &[3.0]);
        assert_eq!(osci.frame(4), &[20.0]);
        assert_eq!(osci.frame(5), &[99.0]);
    }

    #[test]
    fn downsample_keeps_every_nth_tick() {
        let mut osci = armed_osci(Trigger::None, 0.0, 0.0);
        osci.downsample = 4;
        let mut store = OneParam::new(0.0);

        for tick in 0..4 * OSCI_BUF_SIZE {
            store.value = tick as f32;
            osci.sample(&store);
        }

        assert_eq!(osci.state(), State::Done);
        assert_eq!(osci.frame(0), &[0.0]);
        assert_eq!(osci.frame(1), &[4.0]);
        assert_eq!(osci.frame(2), &[8.0]);
    }

    #[test]
    fn stop_is_observed_by_next_sample() {
        let mut osci = armed_osci(Trigger::None, 0.0, 0.0);
        let store = OneParam::new(1.0);

        osci.sample(&store);
        assert_eq!(osci.state(), State::Sampling);

        osci.state = State::Idle;
        osci.sample(&store);
        assert_eq!(osci.state(), State::Idle);
    }

    #[test]
    fn two_channels_interleave_frames() {
        let mut osci = Osci::new();
        osci.channels.push(1).unwrap();
        osci.channels.push(1).unwrap();
        osci.arm();
        let mut store = OneParam::new(7.0);

        let cap = OSCI_BUF_SIZE / 2;
        for _ in 0..cap {
            osci.sample(&store);
            store.value += 1.0;
        }

        assert_eq!(osci.state(), State::Done);
        assert_eq!(osci.frame(0), &[7.0, 7.0]);
        assert_eq!(osci.frame(1), &[8.0, 8.0]);
    }
}
