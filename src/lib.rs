//! Helper programs for exercising a subprocess library from its integration tests,
//! plus the tool that renders the project README.
//!
//! Each fixture is a tiny, single-purpose program (an echo that prints no newline,
//! a `cat` that survives its reader going away, a process that swallows signals, ...)
//! whose observable behavior a test can rely on byte for byte. Fixtures implement
//! [`command::FixtureCommand`] and run through a [`Runner`], either against in-memory
//! streams or against the real standard streams of a `nht_*` binary.
//!
//! The [`readme`] module renders `README.md` from a template, substituting
//! `--define` values and code snippets cut out of source files.

#[macro_use]
extern crate tracing;

pub mod command;
pub mod env;
pub mod fixtures;
pub mod logging;
pub mod readme;
mod runner;
pub mod signal;

/// Just a convenient re-export of the fixture runner.
///
/// See [`Runner`] for the high-level API and examples.
pub use runner::Runner;
