//! A process that swallows signals instead of dying from them.
//!
//! Tests that exercise signal senders need a target that survives what it receives.
//! Beware the startup race: until [`Listener::install`] has returned, signals get
//! their default disposition. Pass `--pidfile` and poll the file until it ends with a
//! newline; by then the handlers are in place.

use crate::command::{ExitCode, FixtureCommand};
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::FromArgs;
use std::convert::Infallible;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Signal kinds the listener knows how to intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Swallowed {
    Interrupt,
    Terminate,
}

impl Swallowed {
    /// Platform signal number, as printed when the signal arrives.
    #[cfg(unix)]
    pub fn number(self) -> i32 {
        match self {
            Swallowed::Interrupt => libc::SIGINT,
            Swallowed::Terminate => libc::SIGTERM,
        }
    }

    /// Platform signal number, as printed when the signal arrives.
    #[cfg(not(unix))]
    pub fn number(self) -> i32 {
        match self {
            Swallowed::Interrupt => 2,
            Swallowed::Terminate => 15,
        }
    }
}

#[cfg(unix)]
mod streams {
    use super::Swallowed;
    use std::future::pending;
    use std::io;
    use tokio::signal::unix::{Signal, SignalKind, signal};

    pub(super) struct Streams {
        interrupt: Option<Signal>,
        terminate: Option<Signal>,
    }

    impl Streams {
        pub(super) fn install(kinds: &[Swallowed]) -> io::Result<Self> {
            let install = |kind: Swallowed, raw: SignalKind| -> io::Result<Option<Signal>> {
                if kinds.contains(&kind) { signal(raw).map(Some) } else { Ok(None) }
            };
            Ok(Self {
                interrupt: install(Swallowed::Interrupt, SignalKind::interrupt())?,
                terminate: install(Swallowed::Terminate, SignalKind::terminate())?,
            })
        }

        pub(super) async fn recv(&mut self) -> Swallowed {
            tokio::select! {
                () = recv_or_pending(&mut self.interrupt) => Swallowed::Interrupt,
                () = recv_or_pending(&mut self.terminate) => Swallowed::Terminate,
            }
        }
    }

    async fn recv_or_pending(stream: &mut Option<Signal>) {
        if let Some(stream) = stream {
            if stream.recv().await.is_some() {
                return;
            }
        }
        pending().await
    }
}

#[cfg(windows)]
mod streams {
    use super::Swallowed;
    use std::io;
    use tokio::signal::windows::{CtrlC, ctrl_c};

    pub(super) struct Streams {
        interrupt: CtrlC,
    }

    impl Streams {
        pub(super) fn install(kinds: &[Swallowed]) -> io::Result<Self> {
            if kinds.contains(&Swallowed::Terminate) {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "the termination signal cannot be intercepted on this platform",
                ));
            }
            Ok(Self { interrupt: ctrl_c()? })
        }

        pub(super) async fn recv(&mut self) -> Swallowed {
            loop {
                if self.interrupt.recv().await.is_some() {
                    return Swallowed::Interrupt;
                }
            }
        }
    }
}

/// Installed signal handlers plus the state they update.
///
/// Everything a handler touches lives here, so two listeners in one process (as in
/// tests) keep separate counts.
pub struct Listener<W> {
    streams: streams::Streams,
    out: W,
    received: u64,
}

impl<W: Write> Listener<W> {
    /// Install handlers for `kinds`. Received signals are reported on `out`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install(kinds: &[Swallowed], out: W) -> Result<Self> {
        let streams = streams::Streams::install(kinds).context("failed to install signal handlers")?;
        debug!(?kinds, "signal handlers installed");
        Ok(Self {
            streams,
            out,
            received: 0,
        })
    }

    /// Number of signals swallowed so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Wait for the next swallowed signal and record it.
    pub async fn wait(&mut self) -> Swallowed {
        let kind = self.streams.recv().await;
        self.received += 1;
        if let Err(error) = writeln!(self.out, "signal {}", kind.number()).and_then(|()| self.out.flush()) {
            // Nobody reading our output must not end the process.
            debug!(%error, "failed to report signal");
        }
        kind
    }

    /// Swallow signals forever.
    pub async fn listen(mut self) -> Infallible {
        loop {
            self.wait().await;
        }
    }
}

fn write_pidfile(path: &Path) -> Result<()> {
    fs::write(path, format!("{}\n", std::process::id()))
        .with_context(|| format!("failed to write pid file {}", path.display()))
}

async fn serve<W: Write>(kinds: &[Swallowed], pidfile: Option<&Path>, out: W) -> Result<Infallible> {
    let listener = Listener::install(kinds, out)?;
    if let Some(path) = pidfile {
        write_pidfile(path)?;
    }
    Ok(listener.listen().await)
}

#[derive(FromArgs)]
/// Listen for signals, swallowing SIGINT and any others requested. Never exits on its own.
pub struct SignalListener {
    // SIGINT is swallowed regardless; the switch exists so callers can spell it out.
    #[argh(switch)]
    /// swallow SIGINT (always on; accepted for callers that pass it explicitly)
    pub swallow_sigint: bool,

    #[argh(switch)]
    /// swallow SIGTERM too
    pub swallow_sigterm: bool,

    #[argh(option)]
    /// write the process id to this file once handlers are installed
    pub pidfile: Option<PathBuf>,

    #[argh(switch)]
    /// do not print received signals
    pub quiet: bool,
}

impl SignalListener {
    /// The signal kinds this configuration intercepts.
    ///
    /// Interrupt is always first, with or without `--swallow-sigint`.
    pub fn swallowed(&self) -> Vec<Swallowed> {
        let mut kinds = vec![Swallowed::Interrupt];
        if self.swallow_sigterm {
            kinds.push(Swallowed::Terminate);
        }
        kinds
    }
}

impl FixtureCommand for SignalListener {
    fn name() -> &'static str {
        "signal_listener"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        let kinds = self.swallowed();
        let out: Box<dyn Write + '_> = if self.quiet {
            Box::new(io::sink())
        } else {
            Box::new(stdout)
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the signal runtime")?;
        let never = runtime.block_on(serve(&kinds, self.pidfile.as_deref(), out))?;
        match never {}
    }
}
