//! External command execution.
//!
//! The process-backed collaborators ([`crate::diskutil::DiskUtil`],
//! [`crate::asr::Asr`], [`crate::plist::PlistDecoder`]) never spawn processes
//! themselves. They build an [`Invocation`] and hand it to an injected
//! [`CommandRunner`]: [`SystemRunner`] for real processes, [`ScriptedRunner`]
//! for canned responses in tests.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::ExecError;

/// A command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Bytes written to the command's stdin, if any.
    pub stdin: Option<Vec<u8>>,
    /// Forward stdout to the runner's sink as it is produced instead of
    /// capturing it.
    pub stream_stdout: bool,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            stream_stdout: false,
        }
    }

    /// Appends arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets stdin contents.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Streams stdout to the runner's sink.
    pub fn streaming(mut self) -> Self {
        self.stream_stdout = true;
        self
    }

    /// Returns true if `arg` is one of the arguments.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout; empty when stdout was streamed.
    pub stdout: Vec<u8>,
    /// Captured stderr.
    pub stderr: Vec<u8>,
}

/// Runs external commands to completion.
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation`, blocking until it exits. A non-zero exit is an
    /// [`ExecError::Failed`] carrying the captured output.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        (**self).run(invocation)
    }
}

type Sink = Box<dyn Write + Send>;

/// Runs commands as child processes.
pub struct SystemRunner {
    sink: Mutex<Sink>,
}

impl SystemRunner {
    /// Creates a runner that streams to the process's stdout.
    pub fn new() -> Self {
        Self::with_stdout_sink(std::io::stdout())
    }

    /// Creates a runner that streams to `sink`.
    pub fn with_stdout_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    fn forward(&self, command: &str, mut from: impl Read) -> Result<(), ExecError> {
        let io_err = |source| ExecError::Io {
            command: command.to_string(),
            source,
        };
        let mut buf = [0u8; 8192];
        loop {
            let n = from.read(&mut buf).map_err(io_err)?;
            if n == 0 {
                return Ok(());
            }
            let mut sink = self.sink.lock();
            sink.write_all(&buf[..n]).map_err(io_err)?;
            sink.flush().map_err(io_err)?;
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRunner").finish_non_exhaustive()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        let command = invocation.to_string();
        debug!(command = %command, "running command");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Fed from its own thread so a child that writes before it has read
        // all of its input cannot block on a full stdout pipe.
        let stdin_writer = match (&invocation.stdin, child.stdin.take()) {
            (Some(data), Some(mut stdin)) => {
                let data = data.clone();
                Some(std::thread::spawn(move || {
                    match stdin.write_all(&data) {
                        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                        other => other,
                    }
                }))
            }
            _ => None,
        };

        let io_err = |source| ExecError::Io {
            command: command.clone(),
            source,
        };
        let (status, stdout, stderr) = if invocation.stream_stdout {
            let stderr_reader = child.stderr.take().map(|mut err| {
                std::thread::spawn(move || {
                    let mut buf = Vec::new();
                    err.read_to_end(&mut buf).map(|_| buf)
                })
            });
            let forwarded = match child.stdout.take() {
                Some(out) => self.forward(&command, out),
                None => Ok(()),
            };
            if forwarded.is_err() {
                // Nothing drains stdout any more.
                let _ = child.kill();
            }
            let status = child.wait();
            let stderr = match stderr_reader {
                Some(handle) => handle.join().unwrap_or_else(|_| Ok(Vec::new())),
                None => Ok(Vec::new()),
            };
            let written = join_writer(stdin_writer);
            forwarded?;
            written.map_err(io_err)?;
            (status.map_err(io_err)?, Vec::new(), stderr.map_err(io_err)?)
        } else {
            let output = child.wait_with_output();
            join_writer(stdin_writer).map_err(io_err)?;
            let output = output.map_err(io_err)?;
            (output.status, output.stdout, output.stderr)
        };

        if !status.success() {
            return Err(ExecError::Failed {
                command,
                status: status.to_string(),
                stdout,
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        Ok(CommandOutput { stdout, stderr })
    }
}

fn join_writer(writer: Option<JoinHandle<io::Result<()>>>) -> io::Result<()> {
    match writer {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(ErrorKind::Other, "stdin writer panicked"))),
        None => Ok(()),
    }
}

/// A canned response for [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Exit 0 with the given stdout.
    Success {
        /// Stdout to return.
        stdout: Vec<u8>,
    },
    /// Exit 1 with the given stdout and stderr.
    Failure {
        /// Stdout to return.
        stdout: Vec<u8>,
        /// Stderr to return.
        stderr: String,
    },
}

/// Answers invocations from per-program response queues and records every
/// call.
///
/// Responses for a program are consumed in order; the last one is repeated
/// once the queue is down to a single entry.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Creates a runner with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response for `program`.
    pub fn respond(self, program: &str, stdout: impl Into<Vec<u8>>) -> Self {
        self.push(
            program,
            Scripted::Success {
                stdout: stdout.into(),
            },
        )
    }

    /// Queues a failing response for `program`.
    pub fn fail(self, program: &str, stdout: impl Into<Vec<u8>>, stderr: &str) -> Self {
        self.push(
            program,
            Scripted::Failure {
                stdout: stdout.into(),
                stderr: stderr.to_string(),
            },
        )
    }

    fn push(self, program: &str, response: Scripted) -> Self {
        self.responses
            .lock()
            .entry(program.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Every invocation received so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// Invocations of `program` received so far.
    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        self.calls.lock().push(invocation.clone());
        let response = {
            let mut responses = self.responses.lock();
            let queue = responses.get_mut(&invocation.program);
            match queue {
                Some(q) if q.len() > 1 => q.pop_front(),
                Some(q) => q.front().cloned(),
                None => None,
            }
        };
        match response {
            Some(Scripted::Success { stdout }) => Ok(CommandOutput {
                stdout,
                stderr: Vec::new(),
            }),
            Some(Scripted::Failure { stdout, stderr }) => Err(ExecError::Failed {
                command: invocation.to_string(),
                status: "exit status: 1".to_string(),
                stdout,
                stderr,
            }),
            None => Err(ExecError::Unscripted {
                command: invocation.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("diskutil").args(["info", "-plist", "/Volumes/Foo"]);
        assert_eq!(inv.to_string(), "diskutil info -plist /Volumes/Foo");
        assert!(inv.has_arg("-plist"));
        assert!(!inv.stream_stdout);
    }

    #[test]
    fn test_scripted_runner_queues_and_repeats() {
        let runner = ScriptedRunner::new()
            .respond("diskutil", "first")
            .respond("diskutil", "second");
        let inv = Invocation::new("diskutil");
        assert_eq!(runner.run(&inv).unwrap().stdout, b"first");
        assert_eq!(runner.run(&inv).unwrap().stdout, b"second");
        assert_eq!(runner.run(&inv).unwrap().stdout, b"second");
        assert_eq!(runner.calls_to("diskutil").len(), 3);
    }

    #[test]
    fn test_scripted_runner_failure_and_unscripted() {
        let runner = ScriptedRunner::new().fail("asr", "", "boom");
        match runner.run(&Invocation::new("asr")).unwrap_err() {
            ExecError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            runner.run(&Invocation::new("plutil")).unwrap_err(),
            ExecError::Unscripted { .. }
        ));
        assert_eq!(runner.calls().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_stdout_and_stdin() {
        let runner = SystemRunner::new();
        let out = runner
            .run(&Invocation::new("cat").stdin("hello"))
            .unwrap();
        assert_eq!(out.stdout, b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_streams_to_sink() {
        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let shared = Shared::default();
        let runner = SystemRunner::with_stdout_sink(shared.clone());
        let out = runner
            .run(&Invocation::new("echo").args(["restored"]).streaming())
            .unwrap();
        assert!(out.stdout.is_empty());
        assert_eq!(shared.0.lock().as_slice(), b"restored\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_stdin_larger_than_pipe_buffer() {
        let input = vec![b'a'; 1 << 20];
        let out = SystemRunner::new()
            .run(&Invocation::new("cat").stdin(input.clone()))
            .unwrap();
        assert_eq!(out.stdout.len(), input.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_sink_error_reaps_child() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::Other, "sink closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let runner = SystemRunner::with_stdout_sink(Broken);
        let err = runner
            .run(&Invocation::new("cat").stdin(vec![b'a'; 1 << 20]).streaming())
            .unwrap_err();
        assert!(matches!(err, ExecError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_failure() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("sh").args(["-c", "echo oops >&2; exit 3"]))
            .unwrap_err();
        match err {
            ExecError::Failed { stderr, .. } => assert_eq!(stderr, "oops\n"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_system_runner_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("snapclone-definitely-not-a-command"))
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
