//! Bounded child-process execution shared by the oracle and the checkers.

use std::io::{Read, Write};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Wall-clock and memory bounds for one child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    pub timeout: Duration,
    /// Bytes kept per stream; the rest is drained and counted.
    pub output_limit_bytes: usize,
}

/// Captured child process output.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Last non-empty stderr line, for short error messages.
    pub fn stderr_summary(&self) -> Option<String> {
        self.stderr_text()
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

/// Run `cmd` to completion or until `limits.timeout`, whichever comes first.
///
/// stdin is written and both output pipes are drained on helper threads while
/// the child runs, so a child that produces output before consuming all of its
/// input cannot deadlock against us. A timed-out child is killed and reported
/// with `timed_out = true` rather than as an error.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = limits.timeout.as_secs()))]
pub fn run_bounded(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    limits: ProcessLimits,
) -> Result<ProcessOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().map_err(|err| {
        error!(err = %err, "failed to spawn command");
        anyhow::Error::new(err).context(format!("spawn {:?}", cmd.get_program()))
    })?;

    let stdin_handle = match stdin {
        Some(input) => {
            let pipe = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            Some(thread::spawn(move || feed_stdin(pipe, &input)))
        }
        None => None,
    };
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let limit = limits.output_limit_bytes;
    let stdout_handle = thread::spawn(move || drain_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || drain_limited(stderr, limit));

    let mut timed_out = false;
    let status = match child.wait_timeout(limits.timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = limits.timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    if let Some(handle) = stdin_handle {
        // The child may exit without reading all of its input.
        if let Err(err) = join_thread(handle)? {
            debug!(err = %err, "stdin not fully consumed");
        }
    }
    let (stdout, stdout_truncated) = join_thread(stdout_handle)?.context("read stdout")?;
    let (stderr, stderr_truncated) = join_thread(stderr_handle)?.context("read stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn feed_stdin(mut pipe: ChildStdin, input: &[u8]) -> std::io::Result<()> {
    pipe.write_all(input)?;
    pipe.flush()
}

fn join_thread<T>(handle: thread::JoinHandle<T>) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("process i/o thread panicked"))
}

fn drain_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        let keep = n.min(room);
        kept.extend_from_slice(&chunk[..keep]);
        dropped += n - keep;
    }

    Ok((kept, dropped))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn limits() -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_secs(10),
            output_limit_bytes: 1024,
        }
    }

    #[test]
    fn captures_stdout_from_stdin() {
        let output = run_bounded(Command::new("cat"), Some(b"hello".to_vec()), limits())
            .expect("run cat");
        assert!(output.status.success());
        assert_eq!(output.stdout_text(), "hello");
        assert!(!output.timed_out);
    }

    #[test]
    fn truncates_beyond_limit() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf 'abcdefghij'");
        let output = run_bounded(
            cmd,
            None,
            ProcessLimits {
                output_limit_bytes: 4,
                ..limits()
            },
        )
        .expect("run sh");
        assert_eq!(output.stdout, b"abcd");
        assert_eq!(output.stdout_truncated, 6);
    }

    #[test]
    fn kills_on_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let output = run_bounded(
            cmd,
            None,
            ProcessLimits {
                timeout: Duration::from_millis(100),
                ..limits()
            },
        )
        .expect("run sleep");
        assert!(output.timed_out);
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let err = run_bounded(Command::new("definitely-not-a-real-binary-xyz"), None, limits())
            .unwrap_err();
        assert!(format!("{err:#}").contains("spawn"));
    }

    #[test]
    fn stderr_summary_is_last_nonempty_line() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo first >&2; echo last >&2; echo >&2; exit 3");
        let output = run_bounded(cmd, None, limits()).expect("run sh");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stderr_summary().as_deref(), Some("last"));
    }
}
