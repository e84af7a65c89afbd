// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External process invocation.
//
// Every call into the raster tool goes through a `ProcessInvoker`. The
// production implementation, `ProcessRunner`, spawns the program directly (no
// shell), drains stdout and stderr, and waits for exit. Arguments are typed so
// that path arguments can be measured the way the host command line would
// render them (double-quoted) before anything is spawned.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::CommandResult;
use tokio::process::Command;
use tracing::{debug, error, instrument};

/// Longest argument string accepted by any supported host (the Windows
/// `CreateProcess` ceiling, used everywhere as the conservative bound).
pub const MAX_COMMAND_LENGTH: usize = 32_767;

/// One argument of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// An option or literal value, rendered as-is.
    Flag(String),
    /// A filesystem path, rendered inside double quotes.
    Path(PathBuf),
}

impl Arg {
    pub fn flag(value: impl Into<String>) -> Self {
        Self::Flag(value.into())
    }

    pub fn path(value: impl Into<PathBuf>) -> Self {
        Self::Path(value.into())
    }

    /// Length this argument occupies on a rendered command line.
    /// Length in characters, not bytes.
    fn rendered_len(&self) -> usize {
        match self {
            Self::Flag(value) => value.chars().count(),
            Self::Path(path) => path.as_os_str().to_string_lossy().chars().count() + 2,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Flag(value) => value.clone(),
            Self::Path(path) => format!("\"{}\"", path.display()),
        }
    }

    fn to_os_string(&self) -> OsString {
        match self {
            Self::Flag(value) => OsString::from(value),
            Self::Path(path) => path.as_os_str().to_os_string(),
        }
    }
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<Arg>,
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Start a command for `program`, run from the current directory.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
        }
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Length of the rendered argument string (program excluded).
    pub fn argument_len(&self) -> usize {
        let separators = self.args.len().saturating_sub(1);
        self.args.iter().map(Arg::rendered_len).sum::<usize>() + separators
    }

    /// Whether the argument string exceeds [`MAX_COMMAND_LENGTH`].
    pub fn exceeds_limit(&self) -> bool {
        self.argument_len() > MAX_COMMAND_LENGTH
    }

    /// Render the argument string as a host shell would show it.
    pub fn rendered_args(&self) -> String {
        self.args
            .iter()
            .map(Arg::render)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Path arguments, in order.
    pub fn path_args(&self) -> impl Iterator<Item = &Path> {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Path(path) => Some(path.as_path()),
            Arg::Flag(_) => None,
        })
    }

    /// Whether a flag with exactly this value is present.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args
            .iter()
            .any(|arg| matches!(arg, Arg::Flag(value) if value == flag))
    }
}

/// Capability to run an external program and capture its output.
///
/// `Ok` with `success = false` means the invocation was refused before
/// spawning; `Err` means the process could not be started at all.
pub trait ProcessInvoker: Send + Sync + 'static {
    fn invoke(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandResult>> + Send;
}

/// Spawns real processes through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessInvoker for ProcessRunner {
    #[instrument(skip_all, fields(program = %invocation.program.display()))]
    async fn invoke(&self, invocation: &Invocation) -> Result<CommandResult> {
        let length = invocation.argument_len();
        debug!(length, "Command length");

        if length > MAX_COMMAND_LENGTH {
            error!(
                length,
                limit = MAX_COMMAND_LENGTH,
                command = %invocation.rendered_args(),
                "Command line too long, not starting process"
            );
            return Ok(CommandResult::rejected(
                PagewerkError::CommandTooLong {
                    length,
                    limit: MAX_COMMAND_LENGTH,
                }
                .to_string(),
            ));
        }

        let output = Command::new(&invocation.program)
            .args(invocation.args.iter().map(Arg::to_os_string))
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PagewerkError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let message = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let error_text = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        debug!(
            exit_code = ?output.status.code(),
            stdout_len = message.len(),
            stderr_len = error_text.len(),
            "Process finished"
        );

        Ok(CommandResult::completed(
            message,
            error_text,
            output.status.code(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_arguments_count_their_quotes() {
        let invocation = Invocation::new("convert")
            .arg(Arg::flag("-density"))
            .arg(Arg::flag("200"))
            .arg(Arg::path("/a b/c.tif"));

        assert_eq!(invocation.rendered_args(), "-density 200 \"/a b/c.tif\"");
        assert_eq!(invocation.argument_len(), invocation.rendered_args().len());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let invocation = Invocation::new("convert")
            .arg(Arg::flag("-gamma"))
            .arg(Arg::path("/scans/Übersicht-é.tif"));

        let rendered = invocation.rendered_args();
        assert!(rendered.len() > rendered.chars().count());
        assert_eq!(invocation.argument_len(), rendered.chars().count());

        // Two-byte characters right at the limit stay within it.
        let wide = Invocation::new("x").arg(Arg::flag("é".repeat(MAX_COMMAND_LENGTH)));
        assert!(!wide.exceeds_limit());
    }

    #[test]
    fn limit_is_exclusive() {
        let at_limit = Invocation::new("x").arg(Arg::flag("a".repeat(MAX_COMMAND_LENGTH)));
        assert!(!at_limit.exceeds_limit());

        let over = Invocation::new("x").arg(Arg::flag("a".repeat(MAX_COMMAND_LENGTH + 1)));
        assert!(over.exceeds_limit());
    }

    #[tokio::test]
    async fn over_long_command_is_refused_without_spawning() {
        // The program does not exist: a spawn attempt would surface as Err.
        let invocation = Invocation::new("/nonexistent/pagewerk-tool")
            .arg(Arg::flag("x".repeat(MAX_COMMAND_LENGTH + 10)));

        let result = ProcessRunner::new()
            .invoke(&invocation)
            .await
            .expect("refusal is not a spawn error");
        assert!(!result.success);
        assert!(result.message.contains("too long"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let invocation = Invocation::new("/nonexistent/pagewerk-tool").arg(Arg::flag("-version"));
        let err = ProcessRunner::new()
            .invoke(&invocation)
            .await
            .expect_err("spawn must fail");
        assert!(matches!(err, PagewerkError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_both_streams_regardless_of_exit_code() {
        let invocation = Invocation::new("sh")
            .arg(Arg::flag("-c"))
            .arg(Arg::flag("echo out; echo err 1>&2; exit 3"));

        let result = ProcessRunner::new().invoke(&invocation).await.expect("run sh");
        assert!(result.success);
        assert_eq!(result.message, "out");
        assert_eq!(result.error, "err");
        assert_eq!(result.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_requested_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), b"here").expect("write marker");

        let invocation = Invocation::new("cat")
            .arg(Arg::path("marker.txt"))
            .current_dir(dir.path());

        let result = ProcessRunner::new().invoke(&invocation).await.expect("run cat");
        assert_eq!(result.message, "here");
        assert!(result.error.is_empty());
    }
}
