//! Wall-clock timestamps for log records.
//!
//! Timestamps are formatted `MM-DD-YYYY HH:MM:SS`. A time source never fails
//! its caller: when no timestamp can be produced in time it hands back
//! [`PLACEHOLDER`] instead.

use std::{
    future::Future,
    process::Stdio,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use tokio::{io::AsyncReadExt, process::Command};
use tracing::{debug, warn};

/// Returned in place of a timestamp when the time source does not answer.
pub const PLACEHOLDER: &str = "00-00-0000 00:00:00";

/// `chrono` format string matching the `date +%m-%d-%Y %H:%M:%S` output.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

pub trait TimeSource {
    /// Current wall-clock time, or [`PLACEHOLDER`].
    fn now(&self) -> impl Future<Output = String>;
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Bounded polling schedule: exponential backoff capped at `max_backoff`,
/// with the total wait never exceeding `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before poll number `attempt + 1`, given that `elapsed` has
    /// already passed since the first poll. `None` once the budget is spent.
    pub fn next_delay(&self, elapsed: Duration, attempt: u32) -> Option<Duration> {
        let remaining = self.timeout.checked_sub(elapsed).filter(|d| !d.is_zero())?;
        let backoff = self
            .initial_backoff
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
            .max(Duration::from_millis(1));
        Some(backoff.min(remaining))
    }
}

// ---------------------------------------------------------------------------
// CommandTimeSource
// ---------------------------------------------------------------------------

/// Runs an external date command and polls it until it exits or the retry
/// budget runs out.
#[derive(Debug, Clone)]
pub struct CommandTimeSource {
    program: String,
    args: Vec<String>,
    retry: RetryPolicy,
}

impl CommandTimeSource {
    /// `command` is the program followed by its arguments.
    pub fn new(command: &[String], retry: RetryPolicy) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("time command must name a program")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            retry,
        })
    }

    async fn run(&self) -> Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn time command {:?}", self.program))?;

        let started = Instant::now();
        let mut attempt = 0;
        let status = loop {
            if let Some(status) = child.try_wait().context("failed to poll time command")? {
                break status;
            }
            match self.retry.next_delay(started.elapsed(), attempt) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Ok(None),
            }
            attempt += 1;
        };

        if !status.success() {
            bail!("time command exited with {status}");
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .await
                .context("failed to read time command output")?;
        }
        debug!(attempts = attempt + 1, "time command finished");

        let line = output.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            bail!("time command produced no output");
        }
        Ok(Some(line.to_owned()))
    }
}

impl TimeSource for CommandTimeSource {
    async fn now(&self) -> String {
        match self.run().await {
            Ok(Some(ts)) => ts,
            Ok(None) => {
                warn!(
                    timeout_ms = self.retry.timeout.as_millis() as u64,
                    "time command did not finish in time; using placeholder"
                );
                PLACEHOLDER.to_owned()
            }
            Err(e) => {
                warn!(error = %e, "time command failed; using placeholder");
                PLACEHOLDER.to_owned()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SystemTimeSource
// ---------------------------------------------------------------------------

/// Formats the local system clock; never falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    async fn now(&self) -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(timeout_ms: u64, initial_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(timeout_ms),
            initial_backoff: Duration::from_millis(initial_ms),
            max_backoff: Duration::from_millis(max_ms),
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let p = policy(1000, 10, 100);
        let at = |attempt| p.next_delay(Duration::ZERO, attempt).unwrap().as_millis();
        assert_eq!(at(0), 10);
        assert_eq!(at(1), 20);
        assert_eq!(at(2), 40);
        assert_eq!(at(3), 80);
        assert_eq!(at(4), 100);
        assert_eq!(at(30), 100);
        assert_eq!(at(u32::MAX), 100);
    }

    #[test]
    fn delay_is_clamped_to_remaining_budget() {
        let p = policy(1000, 10, 100);
        let d = p.next_delay(Duration::from_millis(970), 5).unwrap();
        assert_eq!(d, Duration::from_millis(30));
    }

    #[test]
    fn budget_spent_yields_none() {
        let p = policy(1000, 10, 100);
        assert_eq!(p.next_delay(Duration::from_millis(1000), 0), None);
        assert_eq!(p.next_delay(Duration::from_millis(1500), 3), None);
    }

    #[test]
    fn total_wait_never_exceeds_timeout() {
        let p = RetryPolicy::default();
        let mut elapsed = Duration::ZERO;
        let mut attempt = 0;
        while let Some(d) = p.next_delay(elapsed, attempt) {
            elapsed += d;
            attempt += 1;
        }
        assert_eq!(elapsed, p.timeout);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandTimeSource::new(&[], RetryPolicy::default()).is_err());
    }

    #[tokio::test]
    async fn system_source_matches_format() {
        let ts = SystemTimeSource.now().await;
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_output_is_trimmed() {
        let cmd = ["echo".to_owned(), "10-18-2026 09:30:00".to_owned()];
        let source = CommandTimeSource::new(&cmd, RetryPolicy::default()).unwrap();
        assert_eq!(source.now().await, "10-18-2026 09:30:00");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_yields_placeholder() {
        let cmd = ["sleep".to_owned(), "5".to_owned()];
        let source = CommandTimeSource::new(&cmd, policy(100, 5, 20)).unwrap();
        let started = Instant::now();
        assert_eq!(source.now().await, PLACEHOLDER);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_yields_placeholder() {
        let cmd = ["false".to_owned()];
        let source = CommandTimeSource::new(&cmd, RetryPolicy::default()).unwrap();
        assert_eq!(source.now().await, PLACEHOLDER);
    }

    #[tokio::test]
    async fn missing_program_yields_placeholder() {
        let cmd = ["definitely-not-a-date-binary".to_owned()];
        let source = CommandTimeSource::new(&cmd, RetryPolicy::default()).unwrap();
        assert_eq!(source.now().await, PLACEHOLDER);
    }
}
