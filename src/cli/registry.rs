//! Command tables and the table registry.
//!
//! A [`CommandTable`] is an immutable, ordered group of [`Command`]s
//! contributed by one module. The [`Registry`] holds references to every
//! registered table in registration order; it only ever grows, and lookup
//! walks tables (and commands within a table) in that order, so the first
//! match wins.

use super::error::Error;
use super::output::CliIo;

/// Maximum number of command tables that can be registered.
///
/// This bounds how many independently built modules can contribute
/// commands to one [`Cli`](crate::cli::Cli) instance. The built-in table
/// does not count against this limit.
pub const MAX_TABLES: usize = 8;

/// Function signature for command handlers.
///
/// Handlers receive the output channel, the application environment `E`
/// and the attribute string following the command name (`None` when no
/// space was present on the line, `Some("")` when the line ended in a
/// space). Handlers print their own `OK,`/`ERR,`/`WAR,` responses and
/// return transport-level errors only.
pub type Handler<E> = fn(&mut CliIo<'_>, &mut E, Option<&str>) -> Result<(), Error>;

/// A named, invocable unit exposed through the CLI.
///
/// Commands are immutable triples of name, help text and handler. Context
/// a handler needs beyond its attribute string is carried by the typed
/// environment `E` rather than an opaque pointer.
pub struct Command<E> {
    /// The command name as typed by the user.
    ///
    /// Names are case-sensitive ASCII without embedded spaces. Two
    /// commands in different tables may share a name; the earlier
    /// registered table wins at lookup.
    pub name: &'static str,

    /// A brief description shown by the built-in `help` command.
    pub help: &'static str,

    /// The function implementing the command.
    pub handler: Handler<E>,
}

impl<E> Clone for Command<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Command<E> {}

/// An immutable, ordered group of commands contributed by one module.
pub struct CommandTable<'c, E> {
    name: &'static str,
    commands: &'c [Command<E>],
}

impl<'c, E> CommandTable<'c, E> {
    /// Create a table over a slice of commands.
    ///
    /// The slice is not copied; it must outlive the [`Cli`](crate::cli::Cli)
    /// the table is registered with. Validation happens at registration,
    /// not here.
    pub const fn new(name: &'static str, commands: &'c [Command<E>]) -> Self {
        Self { name, commands }
    }

    /// Module name of this table (used for documentation only).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The commands in declaration order.
    pub fn commands(&self) -> &'c [Command<E>] {
        self.commands
    }
}

/// The runtime collection of all registered command tables.
pub(crate) struct Registry<'t, E> {
    tables: heapless::Vec<&'t CommandTable<'t, E>, MAX_TABLES>,
}

impl<'t, E> Registry<'t, E> {
    pub(crate) const fn new() -> Self {
        Self {
            tables: heapless::Vec::new(),
        }
    }

    /// Append a table, validating every command first.
    ///
    /// A table with an empty command name, a name containing a space or an
    /// empty help string is rejected in its entirety: none of its commands
    /// become reachable. This is a programmer error, so debug builds also
    /// assert.
    pub(crate) fn register(&mut self, table: &'t CommandTable<'t, E>) -> Result<(), Error> {
        if !validate(table) {
            debug_assert!(false, "invalid command table definition");
            return Err(Error::InvalidTable);
        }

        self.tables.push(table).map_err(|_| Error::RegistryFull)
    }

    /// Resolve a command name, walking tables in registration order.
    ///
    /// Comparing the larger of the two name lengths (so that `par` never
    /// matches `par_set`) is, for NUL-free strings, exactly whole-string
    /// equality.
    pub(crate) fn lookup(&self, name: &str) -> Option<&Command<E>> {
        self.tables
            .iter()
            .flat_map(|table| table.commands().iter())
            .find(|cmd| cmd.name == name)
    }

    /// Registered tables in registration order.
    pub(crate) fn tables(&self) -> &[&'t CommandTable<'t, E>] {
        &self.tables
    }
}

fn validate<E>(table: &CommandTable<'_, E>) -> bool {
    table
        .commands()
        .iter()
        .all(|cmd| !cmd.name.is_empty() && !cmd.name.contains(' ') && !cmd.help.is_empty())
}
