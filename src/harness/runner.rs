//! Invocation runner
//!
//! Runs the program under test once per input as `<program> <input> <flag>`,
//! bounded by a wall-clock budget. Each child is the leader of its own process
//! group so a timeout or an interrupt can take down everything it spawned.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::common::{Error, Result};

use super::case::TestCase;
use super::interrupt::Interrupt;

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own with this status
    Exited(i32),
    /// Killed by a signal the harness did not send
    Signaled(i32),
    /// Exceeded the budget and was terminated by the harness
    TimedOut,
}

impl Termination {
    /// Numeric status in shell terms (128 + signal for signal deaths)
    ///
    /// `None` for [`Termination::TimedOut`], which has no status of its own.
    pub fn status_code(self) -> Option<i32> {
        match self {
            Termination::Exited(code) => Some(code),
            Termination::Signaled(signal) => Some(128 + signal),
            Termination::TimedOut => None,
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled(signal);
            }
        }
        Termination::Exited(-1)
    }
}

/// Raw result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub termination: Termination,
    /// Merged stdout and stderr, present only when capture was requested
    pub output: Option<String>,
}

/// Settings shared by every invocation in a batch
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub program: PathBuf,
    /// Flag passed after the input path (e.g. `--headless`)
    pub flag: String,
    pub timeout: Duration,
    /// How long a terminated child gets between SIGTERM and SIGKILL
    pub grace_period: Duration,
}

/// Executes one test case
///
/// The input is known to exist when this is called; a missing input never
/// reaches the runner.
#[async_trait]
pub trait Invoke: Send {
    /// Run `case` to completion or until the budget expires
    ///
    /// Returns [`Error::Interrupted`] if `interrupt` fires mid-run, after the
    /// child's process group has been terminated. Failing to spawn the program
    /// is an error, not an outcome.
    async fn invoke(
        &mut self,
        case: &TestCase,
        capture: bool,
        interrupt: &Interrupt,
    ) -> Result<InvocationResult>;
}

/// Runner backed by real child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

enum Wait {
    Exited(std::io::Result<ExitStatus>),
    Deadline,
    Interrupted(i32),
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    fn spawn(&self, case: &TestCase, capture: Option<&File>) -> Result<Child> {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg(&case.path)
            .arg(&self.config.flag)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match capture {
            Some(file) => {
                // Both streams share one file description, so writes interleave
                // in the order the child makes them.
                cmd.stdout(Stdio::from(file.try_clone()?));
                cmd.stderr(Stdio::from(file.try_clone()?));
            }
            None => {
                cmd.stdout(Stdio::null());
                cmd.stderr(Stdio::null());
            }
        }

        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
            .map_err(|e| Error::spawn_failed(&self.config.program, e))
    }
}

#[async_trait]
impl Invoke for ProcessRunner {
    async fn invoke(
        &mut self,
        case: &TestCase,
        capture: bool,
        interrupt: &Interrupt,
    ) -> Result<InvocationResult> {
        let capture_file = if capture {
            Some(tempfile::tempfile()?)
        } else {
            None
        };

        let mut child = self.spawn(case, capture_file.as_ref())?;
        // The id is gone once the child is reaped, and the group outlives it.
        let pgid = child.id();
        tracing::debug!(
            pid = pgid,
            input = %case.path.display(),
            "Spawned {}",
            self.config.program.display()
        );

        let wait = tokio::select! {
            biased;
            signal = interrupt.triggered() => Wait::Interrupted(signal),
            status = child.wait() => Wait::Exited(status),
            _ = tokio::time::sleep(self.config.timeout) => Wait::Deadline,
        };

        let termination = match wait {
            Wait::Exited(status) => {
                let termination = Termination::from_status(status?);
                kill_leftovers(pgid);
                termination
            }
            Wait::Deadline => {
                tracing::debug!(
                    "{} exceeded {:?}, terminating its process group",
                    case.name,
                    self.config.timeout
                );
                terminate_group(&mut child, self.config.grace_period).await;
                Termination::TimedOut
            }
            Wait::Interrupted(signal) => {
                terminate_group(&mut child, self.config.grace_period).await;
                return Err(Error::Interrupted(signal));
            }
        };
        tracing::debug!("{} finished: {:?}", case.name, termination);

        let output = capture_file.map(read_captured).transpose()?;
        Ok(InvocationResult {
            termination,
            output,
        })
    }
}

fn read_captured(mut file: File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Terminate a child and every process in its group
///
/// SIGTERM first, SIGKILL once the grace period is up. The group is killed
/// even when the leader exits promptly, since descendants may outlive it.
#[cfg(unix)]
async fn terminate_group(child: &mut Child, grace_period: Duration) {
    let Some(pid) = child.id() else {
        return;
    };
    let pgid = pid as libc::pid_t;

    unsafe { libc::kill(-pgid, libc::SIGTERM) };

    if tokio::time::timeout(grace_period, child.wait()).await.is_err() {
        tracing::warn!(
            "Process group {} ignored SIGTERM for {:?}, sending SIGKILL",
            pgid,
            grace_period
        );
    }

    unsafe { libc::kill(-pgid, libc::SIGKILL) };
    let _ = child.wait().await;
}

/// Kill whatever the child left running in its process group after exiting
#[cfg(unix)]
fn kill_leftovers(pgid: Option<u32>) {
    let Some(pgid) = pgid else {
        return;
    };
    if unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) } == 0 {
        tracing::debug!("Killed processes left behind in group {}", pgid);
    }
}

#[cfg(not(unix))]
fn kill_leftovers(_pgid: Option<u32>) {}

#[cfg(not(unix))]
async fn terminate_group(child: &mut Child, _grace_period: Duration) {
    let _ = child.kill().await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Runner whose "program" is `sh`, so each input is a shell script
    fn sh_runner(timeout: Duration) -> ProcessRunner {
        ProcessRunner::new(RunnerConfig {
            program: PathBuf::from("/bin/sh"),
            flag: "--headless".to_string(),
            timeout,
            grace_period: Duration::from_millis(200),
        })
    }

    fn script(dir: &Path, name: &str, body: &str) -> TestCase {
        let path = dir.join(format!("{name}.gb"));
        fs::write(&path, body).unwrap();
        TestCase::from_path(path)
    }

    fn quiet() -> Interrupt {
        Interrupt::manual().1
    }

    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let dir = tempdir().unwrap();
        let mut runner = sh_runner(Duration::from_secs(10));

        let pass = script(dir.path(), "pass", "exit 0\n");
        let fail = script(dir.path(), "fail", "exit 1\n");
        let odd = script(dir.path(), "odd", "exit 7\n");

        let interrupt = quiet();
        for (case, code) in [(pass, 0), (fail, 1), (odd, 7)] {
            let result = runner.invoke(&case, false, &interrupt).await.unwrap();
            assert_eq!(result.termination, Termination::Exited(code));
            assert_eq!(result.output, None);
        }
    }

    #[tokio::test]
    async fn test_flag_is_passed_after_input() {
        let dir = tempdir().unwrap();
        let mut runner = sh_runner(Duration::from_secs(10));
        let case = script(dir.path(), "args", "[ \"$1\" = --headless ] && exit 0\nexit 1\n");

        let result = runner.invoke(&case, false, &quiet()).await.unwrap();
        assert_eq!(result.termination, Termination::Exited(0));
    }

    #[tokio::test]
    async fn test_capture_merges_stdout_and_stderr() {
        let dir = tempdir().unwrap();
        let mut runner = sh_runner(Duration::from_secs(10));
        let case = script(
            dir.path(),
            "talk",
            "echo first\necho second >&2\necho third\nexit 3\n",
        );

        let result = runner.invoke(&case, true, &quiet()).await.unwrap();
        assert_eq!(result.termination, Termination::Exited(3));
        assert_eq!(result.output.as_deref(), Some("first\nsecond\nthird\n"));
    }

    #[tokio::test]
    async fn test_timeout_kills_the_whole_group() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("sentinel");
        let mut runner = sh_runner(Duration::from_millis(200));
        let case = script(
            dir.path(),
            "hang",
            &format!("sleep 1 && touch '{}'\n", sentinel.display()),
        );

        let result = runner.invoke(&case, false, &quiet()).await.unwrap();
        assert_eq!(result.termination, Termination::TimedOut);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!sentinel.exists(), "descendant survived the timeout");
    }

    #[tokio::test]
    async fn test_exit_kills_background_descendants() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("sentinel");
        let mut runner = sh_runner(Duration::from_secs(10));
        let case = script(
            dir.path(),
            "detach",
            &format!("(sleep 1 && touch '{}') &\nexit 0\n", sentinel.display()),
        );

        let result = runner.invoke(&case, false, &quiet()).await.unwrap();
        assert_eq!(result.termination, Termination::Exited(0));

        tokio::time::sleep(Duration::from_millis(1800)).await;
        assert!(!sentinel.exists(), "background process outlived the case");
    }

    #[tokio::test]
    async fn test_timeout_escalates_to_sigkill() {
        let dir = tempdir().unwrap();
        let mut runner = sh_runner(Duration::from_millis(100));
        let case = script(dir.path(), "stubborn", "trap '' TERM\nwhile :; do sleep 0.05; done\n");

        let started = std::time::Instant::now();
        let result = runner.invoke(&case, false, &quiet()).await.unwrap();
        assert_eq!(result.termination, Termination::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_interrupt_terminates_child_and_errors() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("sentinel");
        let mut runner = sh_runner(Duration::from_secs(30));
        let case = script(
            dir.path(),
            "slow",
            &format!("sleep 1 && touch '{}'\n", sentinel.display()),
        );

        let (trigger, interrupt) = Interrupt::manual();
        let fire = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.trigger(15);
            trigger
        });

        let err = runner.invoke(&case, false, &interrupt).await.unwrap_err();
        assert!(matches!(err, Error::Interrupted(15)));
        let _trigger = fire.await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!sentinel.exists(), "child survived the interrupt");
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let dir = tempdir().unwrap();
        let mut runner = ProcessRunner::new(RunnerConfig {
            program: dir.path().join("no-such-emulator"),
            flag: "--headless".to_string(),
            timeout: Duration::from_secs(1),
            grace_period: Duration::from_millis(100),
        });
        let case = script(dir.path(), "a", "exit 0\n");

        let err = runner.invoke(&case, false, &quiet()).await.unwrap_err();
        assert!(matches!(err, Error::SpawnFailed { .. }));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Termination::Exited(1).status_code(), Some(1));
        assert_eq!(Termination::Signaled(9).status_code(), Some(137));
        assert_eq!(Termination::TimedOut.status_code(), None);
    }
}
