use crate::command::{CommandFactory, ExitCode};
use crate::env::Environment;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, i.e. types implementing `FixtureCommand`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Runs fixtures by name, either against injected streams or the real process streams.
///
/// The runner owns an [`Environment`] snapshot and a list of [`CommandFactory`] objects
/// that are queried to create fixtures by name. See [`Default`] for the fixtures
/// included out of the box.
///
/// Example
/// ```
/// use nht_scripts::Runner;
/// let runner = Runner::default();
/// let mut out = Vec::new();
/// let code = runner
///     .run("echo", &["hello", "world"], &mut std::io::empty(), &mut out, &mut std::io::sink())
///     .unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world");
/// ```
pub struct Runner {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Runner {
    /// Create a new runner with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::capture(),
            commands,
        }
    }

    /// Replace the captured environment.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Names of every registered fixture.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|f| f.name())
    }

    /// Run a single fixture invocation by name with arguments.
    ///
    /// Returns the fixture's exit code, or an error if no fixture has that name.
    pub fn run<A: AsRef<OsStr>>(
        &self,
        name: &str,
        args: &[A],
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        let args: Vec<OsString> = args.iter().map(|a| a.as_ref().to_owned()).collect();
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, &args) {
                return cmd.execute(stdin, stdout, stderr, &self.env);
            }
        }
        Err(anyhow::anyhow!("fixture not found: {}", name))
    }

    /// Run a fixture with the process arguments and standard streams.
    ///
    /// This is what each fixture binary's `main` calls.
    pub fn run_process(&self, name: &str) -> ExitCode {
        let args: Vec<OsString> = std::env::args_os().skip(1).collect();

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut stdout = stdout.lock();
        let mut stderr = stderr.lock();

        let code = match self.run(name, args.as_slice(), &mut stdin.lock(), &mut stdout, &mut stderr) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(stderr, "{name}: {e:#}");
                1
            }
        };
        // A reader that went away is not our problem at this point.
        let _ = stdout.flush();
        code
    }
}

impl Default for Runner {
    /// Create a runner with every fixture this crate provides:
    /// `cat`, `echo`, `exit`, `length`, `read_input`, `env`, `stereo`, `signal_listener`.
    fn default() -> Self {
        use crate::fixtures::*;
        use crate::signal::SignalListener;
        Self::new(vec![
            Box::new(Factory::<Cat>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Length>::default()),
            Box::new(Factory::<ReadInput>::default()),
            Box::new(Factory::<EnvPrinter>::default()),
            Box::new(Factory::<Stereo>::default()),
            Box::new(Factory::<SignalListener>::default()),
        ])
    }
}
