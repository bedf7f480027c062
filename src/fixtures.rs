use crate::command::{CommandFactory, ExecutableCommand, ExitCode, FixtureCommand};
use crate::env::Environment;
use crate::runner::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

impl<T: FixtureCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdin, stdout, stderr, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stderr, "{}: {:#}", T::name(), e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            writeln!(stderr, "{}", self.output)?;
            Ok(1)
        } else {
            writeln!(stdout, "{}", self.output)?;
            Ok(0)
        }
    }
}

impl<T: FixtureCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[OsString]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_os_args(name, args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        T::name()
    }
}

fn verbatim(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Print files (or standard input) to standard output, byte for byte.
///
/// `-` names standard input and may be mixed with file names; no arguments at all
/// means standard input only. Arguments are taken verbatim, never as flags, and need
/// not be valid UTF-8.
pub struct Cat {
    pub sources: Vec<PathBuf>,
}

impl FromArgs for Cat {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            sources: args.iter().map(PathBuf::from).collect(),
        })
    }
}

enum Dumped {
    Finished,
    OutputClosed,
}

/// Copy `input` to `output`, flushing after every chunk so bytes show up as soon as
/// they arrive. A reader on the other end hanging up is reported, not raised.
fn dump<R, W>(input: &mut R, output: &mut W) -> io::Result<Dumped>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => return Ok(Dumped::Finished),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        match output.write_all(&buf[..n]).and_then(|()| output.flush()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(Dumped::OutputClosed),
            Err(e) => return Err(e),
        }
    }
}

impl FixtureCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn from_os_args(_name: &str, args: &[OsString]) -> Result<Self, EarlyExit> {
        Ok(Self {
            sources: args.iter().map(PathBuf::from).collect(),
        })
    }

    fn execute(
        self,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        let sources = if self.sources.is_empty() {
            vec![PathBuf::from("-")]
        } else {
            self.sources
        };
        for source in &sources {
            let dumped = if source.as_os_str() == OsStr::new("-") {
                dump(stdin, stdout).context("standard input")?
            } else {
                let mut f = File::open(source).with_context(|| source.display().to_string())?;
                dump(&mut f, stdout).with_context(|| source.display().to_string())?
            };
            if let Dumped::OutputClosed = dumped {
                break;
            }
        }
        Ok(0)
    }
}

/// Like `echo`, except no trailing newline is printed.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self { args: verbatim(args) })
    }
}

impl FixtureCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        write!(stdout, "{}", self.args.join(" "))?;
        stdout.flush()?;
        Ok(0)
    }
}

/// Exit with the status given by the first argument.
pub struct Exit {
    pub requested: Option<String>,
}

impl FromArgs for Exit {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            requested: args.first().map(|a| a.to_string()),
        })
    }
}

impl FixtureCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        _stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        let Some(requested) = self.requested else {
            return Ok(0);
        };
        match requested.trim().parse::<ExitCode>() {
            Ok(code) => Ok(code),
            Err(_) => {
                writeln!(stderr, "invalid argument; must be int")?;
                Ok(1)
            }
        }
    }
}

#[derive(FromArgs)]
/// Print the number of bytes received on standard input, without a newline.
pub struct Length {}

impl FixtureCommand for Length {
    fn name() -> &'static str {
        "length"
    }

    fn execute(
        self,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        let mut data = Vec::new();
        stdin.read_to_end(&mut data).context("failed to read standard input")?;
        write!(stdout, "{}", data.len())?;
        stdout.flush()?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Echo lines from standard input until an empty line or end of input.
pub struct ReadInput {}

impl FixtureCommand for ReadInput {
    fn name() -> &'static str {
        "read_input"
    }

    fn execute(
        self,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        let mut line = String::new();
        loop {
            line.clear();
            if stdin.read_line(&mut line).context("failed to read standard input")? == 0 {
                break;
            }
            let text = line
                .strip_suffix('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .unwrap_or(&line);
            if text.is_empty() {
                break;
            }
            writeln!(stdout, "{}", text)?;
            stdout.flush()?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print values of environment variables, matching names case-insensitively.
pub struct EnvPrinter {
    #[argh(positional)]
    /// environment variable names to print
    pub varnames: Vec<String>,

    #[argh(switch)]
    /// dump the whole environment on standard error first
    pub dump: bool,

    #[argh(switch)]
    /// ignore names that are not defined; otherwise exit with status 1
    pub skip_undefined: bool,
}

impl FixtureCommand for EnvPrinter {
    fn name() -> &'static str {
        "env"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &Environment,
    ) -> Result<ExitCode> {
        if self.varnames.is_empty() {
            anyhow::bail!("at least one variable name is required");
        }

        if self.dump {
            for (name, value) in env.iter() {
                write_assignment(stderr, name, value)?;
            }
        }

        let mut printed = HashSet::new();
        let mut undefined: Vec<&str> = Vec::new();
        for wanted in &self.varnames {
            let found = env.find_case_insensitive(wanted);
            if found.is_empty() {
                if !undefined.contains(&wanted.as_str()) {
                    undefined.push(wanted);
                }
                continue;
            }
            for (name, value) in found {
                if printed.insert(name) {
                    write_assignment(stdout, name, value)?;
                }
            }
        }

        if !undefined.is_empty() && !self.skip_undefined {
            writeln!(stderr, "undefined: {}", undefined.join(", "))?;
            return Ok(1);
        }
        Ok(0)
    }
}

/// Write `NAME=value` followed by a newline, passing the OS bytes through untouched.
fn write_assignment(out: &mut dyn Write, name: &OsStr, value: &OsStr) -> io::Result<()> {
    out.write_all(name.as_encoded_bytes())?;
    out.write_all(b"=")?;
    out.write_all(value.as_encoded_bytes())?;
    out.write_all(b"\n")
}

/// Print arguments alternately on standard output and standard error.
///
/// Even positions go to standard output, odd positions to standard error.
pub struct Stereo {
    pub args: Vec<String>,
}

impl FromArgs for Stereo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self { args: verbatim(args) })
    }
}

impl FixtureCommand for Stereo {
    fn name() -> &'static str {
        "stereo"
    }

    fn execute(
        self,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &Environment,
    ) -> Result<ExitCode> {
        for pair in self.args.chunks(2) {
            writeln!(stdout, "{}", pair[0])?;
            stdout.flush()?;
            if let Some(second) = pair.get(1) {
                writeln!(stderr, "{}", second)?;
                stderr.flush()?;
            }
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn no_input() -> Cursor<Vec<u8>> {
        Cursor::new(Vec::new())
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_cat_reads_file() {
        let mut tmp = NamedTempFile::new().expect("create tmp file");
        tmp.write_all(b"hello").expect("write");

        let cat = Cat {
            sources: vec![tmp.path().to_path_buf()],
        };
        let mut out = Vec::new();
        let res = cat.execute(&mut no_input(), &mut out, &mut Vec::new(), &Environment::default());

        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_cat_reads_stdin_when_no_args() {
        let cat = Cat { sources: Vec::new() };
        let input = b"from stdin\n\x00\xffline2".to_vec();
        let mut out = Vec::new();
        let res = cat.execute(&mut Cursor::new(input.clone()), &mut out, &mut Vec::new(), &Environment::default());

        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, input);
    }

    #[test]
    fn test_cat_mixes_dash_and_files_in_order() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"[file]").unwrap();
        let path = tmp.path().to_path_buf();

        let cat = Cat {
            sources: vec![path.clone(), PathBuf::from("-"), path],
        };
        let mut out = Vec::new();
        let res = cat.execute(&mut Cursor::new(b"[stdin]".to_vec()), &mut out, &mut Vec::new(), &Environment::default());

        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, b"[file][stdin][file]");
    }

    #[test]
    fn test_cat_closed_output_is_normal_termination() {
        let cat = Cat { sources: Vec::new() };
        let res = cat.execute(
            &mut Cursor::new(b"nobody is listening".to_vec()),
            &mut ClosedPipe,
            &mut Vec::new(),
            &Environment::default(),
        );

        assert_eq!(res.unwrap(), 0);
    }

    #[test]
    fn test_cat_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");

        let cat: Box<dyn ExecutableCommand> = Box::new(Cat {
            sources: vec![missing.clone()],
        });
        let mut err = Vec::new();
        let code = cat
            .execute(&mut no_input(), &mut Vec::new(), &mut err, &Environment::default())
            .unwrap();

        assert_eq!(code, 1);
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("cat: "));
        assert!(err.contains(&missing.display().to_string()));
    }

    #[test]
    fn test_echo_joins_without_newline() {
        let echo = Echo::from_args(&["echo"], &["a", "b"]).unwrap();
        let mut out = Vec::new();
        let res = echo.execute(&mut no_input(), &mut out, &mut Vec::new(), &Environment::default());

        assert_eq!(res.unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "a b");
    }

    #[test]
    fn test_echo_takes_flags_verbatim() {
        let echo = Echo::from_args(&["echo"], &["-n", "--help"]).unwrap();
        let mut out = Vec::new();
        echo.execute(&mut no_input(), &mut out, &mut Vec::new(), &Environment::default())
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "-n --help");
    }

    #[rstest]
    #[case(&[], 0)]
    #[case(&["7"], 7)]
    #[case(&["0"], 0)]
    #[case(&["-3"], -3)]
    #[case(&[" 42 "], 42)]
    #[case(&["9", "ignored"], 9)]
    fn test_exit_uses_first_argument(#[case] args: &[&str], #[case] expected: ExitCode) {
        let exit = Exit::from_args(&["exit"], args).unwrap();
        let mut err = Vec::new();
        let code = exit
            .execute(&mut no_input(), &mut Vec::new(), &mut err, &Environment::default())
            .unwrap();

        assert_eq!(code, expected);
        assert!(err.is_empty());
    }

    #[test]
    fn test_exit_rejects_non_integer() {
        let exit = Exit::from_args(&["exit"], &["x"]).unwrap();
        let mut err = Vec::new();
        let code = exit
            .execute(&mut no_input(), &mut Vec::new(), &mut err, &Environment::default())
            .unwrap();

        assert_eq!(code, 1);
        assert_eq!(String::from_utf8(err).unwrap(), "invalid argument; must be int\n");
    }

    #[test]
    fn test_length_counts_raw_bytes() {
        let mut out = Vec::new();
        let res = Length {}.execute(
            &mut Cursor::new(vec![0xe2, 0x82, 0xac, b'\n']),
            &mut out,
            &mut Vec::new(),
            &Environment::default(),
        );

        assert_eq!(res.unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "4");
    }

    #[test]
    fn test_length_of_empty_input() {
        let mut out = Vec::new();
        Length {}
            .execute(&mut no_input(), &mut out, &mut Vec::new(), &Environment::default())
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "0");
    }

    #[rstest]
    #[case("one\ntwo\n\nthree\n", "one\ntwo\n")]
    #[case("one\r\n\r\nafter\n", "one\n")]
    #[case("one\nlast", "one\nlast\n")]
    #[case("", "")]
    fn test_read_input_stops_at_blank_line(#[case] input: &str, #[case] expected: &str) {
        let mut out = Vec::new();
        let res = ReadInput {}.execute(
            &mut Cursor::new(input.as_bytes().to_vec()),
            &mut out,
            &mut Vec::new(),
            &Environment::default(),
        );

        assert_eq!(res.unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    fn env_printer(varnames: &[&str], skip_undefined: bool) -> EnvPrinter {
        EnvPrinter {
            varnames: verbatim(varnames),
            dump: false,
            skip_undefined,
        }
    }

    #[test]
    fn test_env_prints_defined_variable() {
        let env = Environment::from_vars([("PATH", "/bin:/usr/bin"), ("HOME", "/root")]);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = env_printer(&["PATH"], false)
            .execute(&mut no_input(), &mut out, &mut err, &env)
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "PATH=/bin:/usr/bin\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_env_matches_case_insensitively() {
        let env = Environment::from_vars([("SystemRoot", "C:\\Windows")]);
        let mut out = Vec::new();
        let code = env_printer(&["SYSTEMROOT", "systemroot"], false)
            .execute(&mut no_input(), &mut out, &mut Vec::new(), &env)
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "SystemRoot=C:\\Windows\n");
    }

    #[test]
    fn test_env_reports_undefined() {
        let env = Environment::from_vars([("PATH", "/bin")]);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = env_printer(&["NOPE123", "PATH", "NOPE456"], false)
            .execute(&mut no_input(), &mut out, &mut err, &env)
            .unwrap();

        assert_eq!(code, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "PATH=/bin\n");
        assert_eq!(String::from_utf8(err).unwrap(), "undefined: NOPE123, NOPE456\n");
    }

    #[test]
    fn test_env_skip_undefined_is_silent() {
        let env = Environment::from_vars([("PATH", "/bin")]);
        let mut err = Vec::new();
        let code = env_printer(&["NOPE123"], true)
            .execute(&mut no_input(), &mut Vec::new(), &mut err, &env)
            .unwrap();

        assert_eq!(code, 0);
        assert!(err.is_empty());
    }

    #[test]
    fn test_env_dump_goes_to_stderr_first() {
        let env = Environment::from_vars([("A", "1"), ("B", "2")]);
        let mut printer = env_printer(&["b"], false);
        printer.dump = true;
        let mut out = Vec::new();
        let mut err = Vec::new();
        printer.execute(&mut no_input(), &mut out, &mut err, &env).unwrap();

        assert_eq!(String::from_utf8(err).unwrap(), "A=1\nB=2\n");
        assert_eq!(String::from_utf8(out).unwrap(), "B=2\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_env_prints_non_unicode_value_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let env = Environment::from_vars([(OsStr::new("NHT_BYTES"), OsStr::from_bytes(b"caf\xe9"))]);
        let mut out = Vec::new();
        let code = env_printer(&["nht_bytes"], false)
            .execute(&mut no_input(), &mut out, &mut Vec::new(), &env)
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(out, b"NHT_BYTES=caf\xe9\n");
    }

    #[test]
    fn test_env_requires_a_name() {
        let res = env_printer(&[], false).execute(&mut no_input(), &mut Vec::new(), &mut Vec::new(), &Environment::default());
        assert!(res.is_err());
    }

    #[test]
    fn test_stereo_alternates_streams() {
        let stereo = Stereo::from_args(&["stereo"], &["a", "b", "c"]).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = stereo
            .execute(&mut no_input(), &mut out, &mut err, &Environment::default())
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "a\nc\n");
        assert_eq!(String::from_utf8(err).unwrap(), "b\n");
    }

    #[test]
    fn test_stereo_with_no_arguments_prints_nothing() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        Stereo { args: Vec::new() }
            .execute(&mut no_input(), &mut out, &mut err, &Environment::default())
            .unwrap();

        assert!(out.is_empty());
        assert!(err.is_empty());
    }
}
