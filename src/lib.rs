//! # libcli - Embedded firmware command line interface
//!
//! A command line interface library for embedded firmware. It turns a raw
//! byte transport (UART, USB CDC, RTT, ...) into a line-oriented command
//! shell: bytes are accumulated into terminator-delimited lines, split into
//! a command name and an attribute string, resolved against a registry of
//! command tables and dispatched to the matching handler. A formatted
//! output channel sends `OK,`/`ERR,`/`WAR,` response lines back through the
//! same transport. This library is designed for embedded systems and
//! supports `no_std` environments.
//!
//! ## Features
//!
//! ### Core CLI
//! - **Line parsing**: bounded reception buffer, configurable terminator,
//!   overflow and reception-timeout recovery
//! - **Command registry**: multiple independently registered command
//!   tables, registration order preserved, first match wins
//! - **Built-in commands**: `help`, `reset`, `sw_ver`, `hw_ver`,
//!   `proj_info`, `ch_info`, `ch_en`
//! - **Output channel**: bounded `printf`-style formatting plus named
//!   logical channels that can be enabled and disabled at runtime
//!
//! ### Satellite extensions
//! - **Device parameters**: `par_*` commands over an application supplied
//!   parameter store, plus `watch_*` live-watch streaming with NVM
//!   persistence of the streaming configuration
//! - **Software oscilloscope**: `osci_*` commands sampling parameter
//!   values into a staging buffer under trigger and downsample control
//!
//! ## Usage
//!
//! The engine is generic over a transport [`cli::Port`] and an application
//! environment threaded to command handlers:
//!
//! ```rust
//! use libcli::cli::{Cli, Config, Error, Port};
//!
//! struct LoopbackPort {
//!     rx: std::collections::VecDeque<u8>,
//!     tx: Vec<u8>,
//!     ms: u32,
//! }
//!
//! impl Port for LoopbackPort {
//!     fn transmit(&mut self, data: &[u8]) -> Result<(), Error> {
//!         self.tx.extend_from_slice(data);
//!         Ok(())
//!     }
//!     fn receive(&mut self) -> Result<Option<u8>, Error> {
//!         Ok(self.rx.pop_front())
//!     }
//!     fn now_ms(&mut self) -> u32 {
//!         self.ms
//!     }
//! }
//!
//! let port = LoopbackPort {
//!     rx: b"help\r\n".iter().copied().collect(),
//!     tx: Vec::new(),
//!     ms: 0,
//! };
//!
//! let mut cli: Cli<'_, _, ()> = Cli::new(port, Config::default());
//! cli.init().unwrap();
//! cli.handle(&mut ()).unwrap();
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based devices exposing a serial console
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt formatting of error types for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://shishir-dey.github.io/libcli/")]

#[cfg(test)]
extern crate std;

/// Command line interface engine.
///
/// Contains the line accumulator, command splitter, table registry,
/// dispatcher and output channel, together with the [`cli::Port`]
/// collaborator trait the application implements for its transport.
pub mod cli;

/// Non-volatile memory abstraction.
///
/// A small blob-store trait used to persist CLI configuration (currently
/// the live-watch setup) across resets, plus a RAM-backed implementation
/// for hosts and tests.
pub mod nvm;

/// Device parameter CLI extension.
///
/// The `par_*` command family over an application supplied
/// [`param::ParamStore`], and the `watch_*` live-watch streaming commands.
pub mod param;

/// Software oscilloscope CLI extension.
///
/// The `osci_*` command family: parameter sampling into a staging buffer
/// under trigger, pre-trigger and downsample control.
pub mod osci;
