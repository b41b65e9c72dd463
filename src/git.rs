use std::ffi::OsStr;
use std::io::{PipeReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What a finished process left behind: its merged stdout/stderr text and
/// exit code. `exit_code` is `None` when the process was killed by a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub output: String,
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// The process could not be run to completion at all.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to set up output pipe: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read output of {program}: {source}")]
    Read {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not exit within {}ms", .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },
}

/// A version-control executable plus the directory and time limit to run it
/// with.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: String,
    repo: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl GitCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            repo: None,
            timeout: None,
        }
    }

    pub fn current_dir(mut self, repo: impl Into<PathBuf>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn repo(&self) -> Option<&Path> {
        self.repo.as_deref()
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `program args...` to completion. Stderr shares the stdout pipe,
    /// so the captured text interleaves both streams in write order.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<CommandResult, InvocationError> {
        let (reader, writer) = std::io::pipe().map_err(InvocationError::Pipe)?;
        let stderr_writer = writer.try_clone().map_err(InvocationError::Pipe)?;

        // The Command owns our copies of the write end; it has to be gone
        // before reading or the pipe never reaches EOF.
        let spawned = {
            let mut command = Command::new(&self.program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(stderr_writer);
            if let Some(repo) = &self.repo {
                command.current_dir(repo);
            }
            command.spawn()
        };
        let child = spawned.map_err(|source| InvocationError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let (output, status) = match self.timeout {
            None => self.collect(child, reader)?,
            Some(timeout) => self.collect_with_timeout(child, reader, timeout)?,
        };

        Ok(CommandResult {
            output: String::from_utf8_lossy(&output).into_owned(),
            exit_code: status.code(),
        })
    }

    fn collect(
        &self,
        mut child: Child,
        mut reader: PipeReader,
    ) -> Result<(Vec<u8>, ExitStatus), InvocationError> {
        let mut output = Vec::new();
        if let Err(source) = reader.read_to_end(&mut output) {
            reap(&mut child);
            return Err(InvocationError::Read {
                program: self.program.clone(),
                source,
            });
        }

        let status = child.wait().map_err(|source| InvocationError::Wait {
            program: self.program.clone(),
            source,
        })?;
        Ok((output, status))
    }

    fn collect_with_timeout(
        &self,
        mut child: Child,
        mut reader: PipeReader,
        timeout: Duration,
    ) -> Result<(Vec<u8>, ExitStatus), InvocationError> {
        let deadline = Instant::now() + timeout;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = Vec::new();
            let result = reader.read_to_end(&mut output).map(|_| output);
            let _ = tx.send(result);
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    reap(&mut child);
                    return Err(self.timed_out(timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    reap(&mut child);
                    return Err(InvocationError::Wait {
                        program: self.program.clone(),
                        source,
                    });
                }
            }
        };

        // A grandchild can inherit the pipe and keep it open after the
        // child exits, so the drain is bounded by the same deadline.
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining.max(POLL_INTERVAL)) {
            Ok(Ok(output)) => Ok((output, status)),
            Ok(Err(source)) => Err(InvocationError::Read {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(self.timed_out(timeout)),
        }
    }

    fn timed_out(&self, timeout: Duration) -> InvocationError {
        InvocationError::Timeout {
            program: self.program.clone(),
            timeout,
        }
    }
}

impl Default for GitCommand {
    fn default() -> Self {
        Self::new("git")
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestEnv;

    fn sh() -> GitCommand {
        GitCommand::new("sh")
    }

    #[test]
    fn run_captures_stdout_and_exit_code() {
        let result = sh().run(&["-c", "printf 'hello\\n'"]).unwrap();
        assert_eq!(result.output, "hello\n");
        assert_eq!(result.exit_code, Some(0));
        assert!(result.success());
    }

    #[test]
    fn run_merges_stderr_in_write_order() {
        let result = sh()
            .run(&["-c", "echo out; echo err 1>&2; echo again"])
            .unwrap();
        assert_eq!(result.output, "out\nerr\nagain\n");
    }

    #[test]
    fn run_reports_nonzero_exit_code() {
        let result = sh().run(&["-c", "echo nope; exit 3"]).unwrap();
        assert_eq!(result.exit_code, Some(3));
        assert!(!result.success());
        assert_eq!(result.output, "nope\n");
    }

    #[test]
    fn run_missing_program_is_spawn_error() {
        let err = GitCommand::new("git-stamp-no-such-program-xyz")
            .run(&["status"])
            .unwrap_err();
        assert!(matches!(err, InvocationError::Spawn { .. }), "{err:?}");
        assert!(err.to_string().contains("git-stamp-no-such-program-xyz"));
    }

    #[test]
    fn run_times_out_and_kills_hung_process() {
        let started = Instant::now();
        let err = sh()
            .timeout(Some(Duration::from_millis(100)))
            .run(&["-c", "exec sleep 5"])
            .unwrap_err();
        assert!(matches!(err, InvocationError::Timeout { .. }), "{err:?}");
        assert!(err.to_string().contains("100ms"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn run_with_timeout_still_collects_output() {
        let result = sh()
            .timeout(Some(Duration::from_secs(5)))
            .run(&["-c", "echo quick; echo warn 1>&2"])
            .unwrap();
        assert_eq!(result.output, "quick\nwarn\n");
        assert!(result.success());
    }

    #[test]
    fn run_uses_repo_as_working_directory() {
        let env = TestEnv::new();
        let repo = env.create_repo("app");
        let result = GitCommand::default()
            .current_dir(&repo)
            .run(&["rev-parse", "HEAD"])
            .unwrap();
        assert!(result.success());
        assert_eq!(result.output.trim().len(), 40); // SHA-1 hex
    }

    #[test]
    fn run_outside_repository_fails_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitCommand::default()
            .current_dir(dir.path())
            .run(&["rev-parse", "HEAD"])
            .unwrap();
        assert!(!result.success());
        // git writes the diagnostic to stderr, which lands in the merged output
        assert!(!result.output.trim().is_empty());
    }
}
