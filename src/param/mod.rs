//! Device parameter CLI extension.
//!
//! The application exposes its parameter table through the [`ParamStore`]
//! trait; this module contributes the `par_*` command family on top of it
//! and, in [`watch`], the `watch_*` live-watch streaming commands. Glue
//! between the command handlers and the application's subsystems goes
//! through the [`ParamEnv`] environment trait.
//!
//! `par_info` emits a machine-readable table consumed by PC-side tooling:
//! a header line, an optional `:<group>` line ahead of each group and one
//! CSV row per parameter, closed with `;END`.

pub mod watch;

mod nvm;

pub use nvm::{load_watch, save_watch};

use core::fmt;

use crate::cli::{CliIo, Command, Error};
use crate::nvm::NvmRegion;
use watch::LiveWatch;

/// Data type of a parameter.
///
/// The discriminants are the wire codes reported in the `par_info` Type
/// column.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParamType {
    /// Unsigned 8-bit.
    U8 = 0,
    /// Signed 8-bit.
    I8 = 1,
    /// Unsigned 16-bit.
    U16 = 2,
    /// Signed 16-bit.
    I16 = 3,
    /// Unsigned 32-bit.
    U32 = 4,
    /// Signed 32-bit.
    I32 = 5,
    /// 32-bit float.
    F32 = 6,
}

/// A typed parameter value.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ParamValue {
    /// Unsigned 8-bit.
    U8(u8),
    /// Signed 8-bit.
    I8(i8),
    /// Unsigned 16-bit.
    U16(u16),
    /// Signed 16-bit.
    I16(i16),
    /// Unsigned 32-bit.
    U32(u32),
    /// Signed 32-bit.
    I32(i32),
    /// 32-bit float.
    F32(f32),
}

impl ParamValue {
    /// Data type of this value.
    pub fn ty(&self) -> ParamType {
        match self {
            ParamValue::U8(_) => ParamType::U8,
            ParamValue::I8(_) => ParamType::I8,
            ParamValue::U16(_) => ParamType::U16,
            ParamValue::I16(_) => ParamType::I16,
            ParamValue::U32(_) => ParamType::U32,
            ParamValue::I32(_) => ParamType::I32,
            ParamValue::F32(_) => ParamType::F32,
        }
    }

    /// Lossy conversion to `f32`, used for sampling and table printouts.
    pub fn as_f32(&self) -> f32 {
        match *self {
            ParamValue::U8(v) => v as f32,
            ParamValue::I8(v) => v as f32,
            ParamValue::U16(v) => v as f32,
            ParamValue::I16(v) => v as f32,
            ParamValue::U32(v) => v as f32,
            ParamValue::I32(v) => v as f32,
            ParamValue::F32(v) => v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParamValue::U8(v) => write!(f, "{}", v),
            ParamValue::I8(v) => write!(f, "{}", v),
            ParamValue::U16(v) => write!(f, "{}", v),
            ParamValue::I16(v) => write!(f, "{}", v),
            ParamValue::U32(v) => write!(f, "{}", v),
            ParamValue::I32(v) => write!(f, "{}", v),
            ParamValue::F32(v) => write!(f, "{}", v),
        }
    }
}

/// Parameter access level.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParamAccess {
    /// Value can only be read over the CLI.
    ReadOnly = 0,
    /// Value can be read and written over the CLI.
    ReadWrite = 1,
}

/// Static description of one parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo {
    /// Numeric identifier used on the wire.
    pub id: u16,
    /// Parameter name.
    pub name: &'static str,
    /// Unit string for the `par_info` table; empty when unitless.
    pub unit: &'static str,
    /// Free-form description for the `par_info` table.
    pub desc: &'static str,
    /// Group label, set on the first parameter of each group.
    pub group: Option<&'static str>,
    /// Default value. Its type is the parameter's type.
    pub def: ParamValue,
    /// Lower limit.
    pub min: ParamValue,
    /// Upper limit.
    pub max: ParamValue,
    /// Access level.
    pub access: ParamAccess,
    /// Whether the value is persisted by the store.
    pub persistent: bool,
}

impl ParamInfo {
    /// Data type of the parameter.
    pub fn ty(&self) -> ParamType {
        self.def.ty()
    }
}

/// Errors reported by a parameter store.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParamError {
    /// No parameter with the given ID.
    UnknownId,
    /// The parameter is not writable.
    ReadOnly,
    /// The value violates the min/max limits.
    OutOfRange,
    /// Persisting to or loading from storage failed.
    Storage,
}

impl ParamError {
    /// Numeric code reported in `ERR, err_code:` responses.
    pub fn code(&self) -> u16 {
        match self {
            ParamError::UnknownId => 1,
            ParamError::ReadOnly => 2,
            ParamError::OutOfRange => 3,
            ParamError::Storage => 4,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ParamError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ParamError::UnknownId => defmt::write!(f, "UnknownId"),
            ParamError::ReadOnly => defmt::write!(f, "ReadOnly"),
            ParamError::OutOfRange => defmt::write!(f, "OutOfRange"),
            ParamError::Storage => defmt::write!(f, "Storage"),
        }
    }
}

/// The application's parameter table, keyed by numeric ID.
///
/// Iteration order (`info_at` over `0..len()`) defines the `par_info`
/// printout order and is expected to be stable.
pub trait ParamStore {
    /// Number of parameters.
    fn len(&self) -> usize;

    /// Whether the table is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Description of the parameter at table position `idx`.
    fn info_at(&self, idx: usize) -> Option<&ParamInfo>;

    /// Table position of the parameter with wire ID `id`.
    fn index_of(&self, id: u16) -> Option<usize>;

    /// Current value of parameter `id`.
    fn get(&self, id: u16) -> Result<ParamValue, ParamError>;

    /// Write parameter `id`. The store enforces limits and access level.
    fn set(&mut self, id: u16, value: ParamValue) -> Result<(), ParamError>;

    /// Reset parameter `id` to its default.
    fn set_default(&mut self, id: u16) -> Result<(), ParamError>;

    /// Reset every parameter to its default.
    fn set_default_all(&mut self);

    /// Whether [`save`](Self::save) is available on this store.
    fn supports_save(&self) -> bool {
        false
    }

    /// Persist the parameter values to the store's own NVM.
    fn save(&mut self) -> Result<(), ParamError> {
        Err(ParamError::Storage)
    }

    /// Description of parameter `id`, if it exists.
    fn info(&self, id: u16) -> Option<&ParamInfo> {
        self.info_at(self.index_of(id)?)
    }
}

/// Application environment consumed by the `par_*` and `watch_*` handlers.
pub trait ParamEnv {
    /// The parameter store implementation.
    type Store: ParamStore;
    /// NVM region used for live-watch persistence.
    type Nvm: NvmRegion;

    /// The parameter store.
    fn params(&self) -> &Self::Store;

    /// The parameter store, mutably.
    fn params_mut(&mut self) -> &mut Self::Store;

    /// Live-watch state.
    fn watch(&self) -> &LiveWatch;

    /// Live-watch state, mutably.
    fn watch_mut(&mut self) -> &mut LiveWatch;

    /// NVM region for live-watch persistence, when the platform has one.
    fn nvm(&mut self) -> Option<&mut Self::Nvm>;
}

/// The `par_*` command table entries.
///
/// Register them wrapped in a [`CommandTable`](crate::cli::CommandTable):
///
/// ```rust,ignore
/// static PAR_COMMANDS: [Command<App>; 6] = param::commands::<App>();
/// static PAR_TABLE: CommandTable<'_, App> = CommandTable::new("par", &PAR_COMMANDS);
/// cli.register(&PAR_TABLE)?;
/// ```
pub const fn commands<E: ParamEnv>() -> [Command<E>; 6] {
    [
        Command {
            name: "par_info",
            help: "Get device parameter informations",
            handler: par_info::<E>,
        },
        Command {
            name: "par_set",
            help: "Set parameter. Args: [parId,value]",
            handler: par_set::<E>,
        },
        Command {
            name: "par_get",
            help: "Get parameter. Args: [parId]",
            handler: par_get::<E>,
        },
        Command {
            name: "par_def",
            help: "Set parameter to default. Args: [parId]",
            handler: par_def::<E>,
        },
        Command {
            name: "par_def_all",
            help: "Set all parameters to default",
            handler: par_def_all::<E>,
        },
        Command {
            name: "par_save",
            help: "Save parameter to NVM",
            handler: par_save::<E>,
        },
    ]
}

fn unknown(io: &mut CliIo<'_>) -> Result<(), Error> {
    io.printf(format_args!("ERR, Unknown command!"))
}

fn par_info<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let store = env.params();

    io.printf(format_args!(
        ";ID,Name,Value,Def,Min,Max,Unit,Type,Access,Persistance,Description"
    ))?;
    io.printf(format_args!(": "))?;

    for idx in 0..store.len() {
        let info = match store.info_at(idx) {
            Some(info) => info,
            None => break,
        };

        if let Some(group) = info.group {
            io.printf(format_args!(":{}", group))?;
        }

        let value = store.get(info.id).unwrap_or(info.def);
        io.printf(format_args!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            info.id,
            info.name,
            value,
            info.def,
            info.min,
            info.max,
            info.unit,
            info.ty() as u8,
            info.access as u8,
            info.persistent as u8,
            info.desc
        ))?;
    }

    io.printf(format_args!(";END"))
}

fn par_set<E: ParamEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    let parsed = attr
        .split_once(',')
        .and_then(|(id, val)| Some((parse_id(id)?, val)));
    let (id, val_str) = match parsed {
        Some(parsed) => parsed,
        None => return io.printf(format_args!("ERR, Wrong command!")),
    };

    let store = env.params_mut();
    let info = match store.info(id) {
        Some(info) => *info,
        None => return io.printf(format_args!("ERR, Wrong parameter ID!")),
    };

    if info.access == ParamAccess::ReadOnly {
        return io.printf(format_args!("ERR, Parameter is read only!"));
    }

    let value = match parse_value(info.ty(), val_str) {
        Some(value) => value,
        None => return io.printf(format_args!("ERR, Wrong command!")),
    };

    match store.set(id, value) {
        Ok(()) => io.printf(format_args!("OK,PAR_SET={}", value)),
        Err(err) => io.printf(format_args!("ERR, err_code: {}", err.code())),
    }
}

fn par_get<E: ParamEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    let id = match parse_id(attr) {
        Some(id) => id,
        None => return io.printf(format_args!("ERR, Wrong command!")),
    };

    match env.params().get(id) {
        Ok(value) => io.printf(format_args!("OK,PAR_GET={}", value)),
        Err(ParamError::UnknownId) => io.printf(format_args!("ERR, Wrong parameter ID!")),
        Err(err) => io.printf(format_args!("ERR, err_code: {}", err.code())),
    }
}

fn par_def<E: ParamEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    let attr = match attr {
        Some(attr) => attr,
        None => return unknown(io),
    };

    let id = match parse_id(attr) {
        Some(id) => id,
        None => return io.printf(format_args!("ERR, Wrong command!")),
    };

    match env.params_mut().set_default(id) {
        Ok(()) => io.printf(format_args!("OK, Parameter {} set to default", id)),
        Err(_) => io.printf(format_args!("ERR, Wrong parameter ID!")),
    }
}

fn par_def_all<E: ParamEnv>(
    io: &mut CliIo<'_>,
    env: &mut E,
    attr: Option<&str>,
) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    env.params_mut().set_default_all();
    io.printf(format_args!("OK, All parameters set to default!"))
}

fn par_save<E: ParamEnv>(io: &mut CliIo<'_>, env: &mut E, attr: Option<&str>) -> Result<(), Error> {
    if attr.is_some() {
        return unknown(io);
    }

    let store = env.params_mut();
    if !store.supports_save() {
        return io.printf(format_args!("ERR, Storing to NVM not supported!"));
    }

    match store.save() {
        Ok(()) => io.printf(format_args!("OK, Parameter successfully store to NVM")),
        Err(_) => io.printf(format_args!("ERR, Error while storing to NVM")),
    }
}

pub(crate) fn parse_id(s: &str) -> Option<u16> {
    s.trim().parse().ok()
}

fn parse_value(ty: ParamType, s: &str) -> Option<ParamValue> {
    let s = s.trim();
    Some(match ty {
        ParamType::U8 => ParamValue::U8(s.parse().ok()?),
        ParamType::I8 => ParamValue::I8(s.parse().ok()?),
        ParamType::U16 => ParamValue::U16(s.parse().ok()?),
        ParamType::I16 => ParamValue::I16(s.parse().ok()?),
        ParamType::U32 => ParamValue::U32(s.parse().ok()?),
        ParamType::I32 => ParamValue::I32(s.parse().ok()?),
        ParamType::F32 => ParamValue::F32(s.parse().ok()?),
    })
}

#[cfg(test)]
mod tests {
    use std::format;

    use super::*;

    #[test]
    fn value_display_matches_wire_format() {
        assert_eq!(format!("{}", ParamValue::U8(200)), "200");
        assert_eq!(format!("{}", ParamValue::I16(-42)), "-42");
        assert_eq!(format!("{}", ParamValue::F32(2.5)), "2.5");
        assert_eq!(format!("{}", ParamValue::F32(12.0)), "12");
    }

    #[test]
    fn parse_value_respects_type() {
        assert_eq!(parse_value(ParamType::U8, "200"), Some(ParamValue::U8(200)));
        assert_eq!(parse_value(ParamType::U8, "300"), None);
        assert_eq!(
            parse_value(ParamType::I32, " -17 "),
            Some(ParamValue::I32(-17))
        );
        assert_eq!(
            parse_value(ParamType::F32, "3.5"),
            Some(ParamValue::F32(3.5))
        );
        assert_eq!(parse_value(ParamType::U16, "abc"), None);
    }

    #[test]
    fn parse_id_trims() {
        assert_eq!(parse_id(" 12 "), Some(12));
        assert_eq!(parse_id("12x"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn type_codes_are_stable() {
        assert_eq!(ParamType::U8 as u8, 0);
        assert_eq!(ParamType::I8 as u8, 1);
        assert_eq!(ParamType::U16 as u8, 2);
        assert_eq!(ParamType::I16 as u8, 3);
        assert_eq!(ParamType::U32 as u8, 4);
        assert_eq!(ParamType::I32 as u8, 5);
        assert_eq!(ParamType::F32 as u8, 6);
    }
}
