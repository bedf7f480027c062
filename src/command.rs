use crate::env::Environment;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::ffi::OsString;
use std::io::{BufRead, Write};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Fixtures report user errors with 1, the way the programs they stand in for do.
pub type ExitCode = i32;

/// A helper program that a test harness launches as an external process.
///
/// Arguments are parsed with [`argh`] (`FromArgs`) before anything runs, so every
/// recognized option ends up as a typed field. Execution only sees the streams and
/// environment it is handed, which keeps fixtures testable in-process.
pub trait FixtureCommand: Sized + FromArgs {
    /// Canonical name of the fixture, e.g. "echo" or "cat".
    fn name() -> &'static str;

    /// Parse arguments exactly as the process received them.
    ///
    /// The default requires every argument to be valid UTF-8 and hands them to
    /// [`FromArgs::from_args`]. Fixtures that take file names override it so paths
    /// the OS accepts are never mangled.
    fn from_os_args(name: &str, args: &[OsString]) -> Result<Self, EarlyExit> {
        let args = args
            .iter()
            .map(|arg| {
                arg.to_str().ok_or_else(|| EarlyExit {
                    output: format!("argument is not valid UTF-8: {:?}", arg),
                    status: Err(()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_args(&[name], &args)
    }

    /// Executes the fixture using the provided streams and environment.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &Environment,
    ) -> Result<ExitCode>;
}

/// Object-safe form of a parsed fixture, ready to run.
pub trait ExecutableCommand {
    /// Executes the command. Failures are reported on `stderr` and mapped to an exit code.
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &Environment,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[OsString]) -> Option<Box<dyn ExecutableCommand>>;

    /// Name this factory answers to.
    fn name(&self) -> &'static str;
}
