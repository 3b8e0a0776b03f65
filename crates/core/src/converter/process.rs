//! Scoped invocation of external tools.
//!
//! A [`ToolCommand`] spawns a program with an argument vector (never through
//! a shell), drains stdout and stderr concurrently line by line, and waits
//! for the process on every exit path. If the future is dropped the child is
//! killed.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

use super::error::ConverterError;

/// Number of trailing output lines kept for error reports.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Builder and runner for an external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

/// Captured result of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code (0 on success).
    pub code: Option<i32>,
    /// Last lines of merged stdout/stderr.
    pub diagnostics: Vec<String>,
}

impl ToolCommand {
    /// Creates a command for `program`; `tool` names it in errors and logs.
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory of the child.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The argument vector, for logging and tests.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Runs the tool to completion, discarding its output.
    pub async fn run(self) -> Result<ToolOutput, ConverterError> {
        self.run_streaming(|_| {}).await
    }

    /// Runs the tool to completion, passing every output line to `on_line`.
    ///
    /// Lines from stdout and stderr are interleaved in arrival order; carriage
    /// returns split lines too. A non-zero exit yields
    /// [`ConverterError::ExternalToolFailed`] carrying the exit code and the
    /// last lines of output.
    pub async fn run_streaming<F>(self, mut on_line: F) -> Result<ToolOutput, ConverterError>
    where
        F: FnMut(&str),
    {
        debug!(tool = %self.tool, program = ?self.program, args = ?self.args, "Spawning external tool");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConverterError::missing_dependency(&self.tool, &self.program)
            } else {
                ConverterError::Io(e)
            }
        })?;

        let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
        let status = match drain_and_wait(&mut child, &mut on_line, &mut tail).await {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill().await;
                return Err(ConverterError::Io(e));
            }
        };

        let diagnostics: Vec<String> = tail.into_iter().collect();
        if !status.success() {
            return Err(ConverterError::ExternalToolFailed {
                tool: self.tool,
                code: status.code(),
                stderr: if diagnostics.is_empty() {
                    None
                } else {
                    Some(diagnostics.join("\n"))
                },
            });
        }

        Ok(ToolOutput {
            code: status.code(),
            diagnostics,
        })
    }
}

/// Reads both pipes until they close, then waits for the child.
async fn drain_and_wait<F>(
    child: &mut Child,
    on_line: &mut F,
    tail: &mut VecDeque<String>,
) -> std::io::Result<ExitStatus>
where
    F: FnMut(&str),
{
    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            segment = next_segment(&mut stdout), if stdout.is_some() => match segment? {
                Some(bytes) => emit(&bytes, on_line, tail),
                None => stdout = None,
            },
            segment = next_segment(&mut stderr), if stderr.is_some() => match segment? {
                Some(bytes) => emit(&bytes, on_line, tail),
                None => stderr = None,
            },
        }
    }

    child.wait().await
}

async fn next_segment<R>(
    split: &mut Option<tokio::io::Split<R>>,
) -> std::io::Result<Option<Vec<u8>>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match split {
        Some(s) => s.next_segment().await,
        None => Ok(None),
    }
}

fn emit<F>(bytes: &[u8], on_line: &mut F, tail: &mut VecDeque<String>)
where
    F: FnMut(&str),
{
    let text = String::from_utf8_lossy(bytes);
    for line in text.split('\r') {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        on_line(line);
        if tail.len() == DIAGNOSTIC_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }
}
