//! The subreaper wait loop (spec.md §4.4 step 9) and the Adverb's own
//! exit-status mapping (spec.md §4.4, "Adverb exit status").

use std::{
    collections::HashSet,
    io,
    os::unix::process::ExitStatusExt,
    time::{Duration, Instant},
};

use os_ext::SIGTERM;

use crate::signals::signal_and_cont;

/// `EX_USAGE`, `EX_UNAVAILABLE`, `EX_SOFTWARE` from `<sysexits.h>`.
pub const EX_USAGE: i32 = 64;
pub const EX_UNAVAILABLE: i32 = 69;
pub const EX_SOFTWARE: i32 = 70;
/// Conventional "command not found" status for a failed execve.
pub const EXEC_FAILED: i32 = 127;

/// How the primary child ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrimaryOutcome
{
    /// Exited normally with this status.
    Exited(i32),
    /// Killed by this signal.
    Signalled(i32),
}

impl PrimaryOutcome
{
    /// The Adverb's own exit status for this outcome.
    pub fn adverb_exit_status(self) -> i32
    {
        match self {
            PrimaryOutcome::Exited(code)    => code,
            PrimaryOutcome::Signalled(signal) => 128 + signal,
        }
    }
}

/// The terminate cascade's current stage, driven by [`Supervisor::tick`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage
{
    Running,
    PrimaryExited(Instant),
    Terminated(Instant),
    Killed,
}

/// Tracks known descendants and drives the idle/terminate timeout
/// cascade once the primary child has exited.
pub struct Supervisor
{
    primary_pid: libc::pid_t,
    descendants: HashSet<libc::pid_t>,
    idle_timeout: Option<Duration>,
    terminate_timeout: Duration,
    stage: Stage,
    primary_outcome: Option<PrimaryOutcome>,
}

impl Supervisor
{
    /// Begin supervising, with `primary_pid` as the child whose exit
    /// status becomes the Adverb's own.
    pub fn new(primary_pid: libc::pid_t, idle_timeout: Option<Duration>, terminate_timeout: Duration)
        -> Self
    {
        Self{
            primary_pid,
            descendants: HashSet::from([primary_pid]),
            idle_timeout,
            terminate_timeout,
            stage: Stage::Running,
            primary_outcome: None,
        }
    }

    /// Has the primary child's outcome been recorded?
    pub fn primary_outcome(&self) -> Option<PrimaryOutcome>
    {
        self.primary_outcome
    }

    /// Record that `pid` exited with `status`. Returns `true` if every
    /// known descendant (including the primary) has now been reaped.
    pub fn record_exit(&mut self, pid: libc::pid_t, status: std::process::ExitStatus) -> bool
    {
        self.descendants.remove(&pid);

        if pid == self.primary_pid {
            self.primary_outcome = Some(match status.code() {
                Some(code) => PrimaryOutcome::Exited(code),
                None        => PrimaryOutcome::Signalled(status.signal().unwrap_or(0)),
            });

            if self.idle_timeout.is_some() {
                self.stage = Stage::PrimaryExited(Instant::now());
            }
        }

        self.descendants.is_empty()
    }

    /// Whether any descendants are still outstanding.
    pub fn has_descendants(&self) -> bool
    {
        !self.descendants.is_empty()
    }

    /// Advance the terminate cascade based on elapsed time, sending
    /// signals as thresholds are crossed. Call this periodically (or
    /// compute [`Supervisor::next_deadline`] and only call it when due).
    pub fn tick(&mut self) -> io::Result<()>
    {
        match self.stage {
            Stage::Running => {},

            Stage::PrimaryExited(since) => {
                let Some(idle_timeout) = self.idle_timeout else { return Ok(()) };

                if self.descendants.is_empty() {
                    return Ok(());
                }

                if since.elapsed() >= idle_timeout {
                    if self.terminate_timeout.is_zero() {
                        self.kill_all(libc::SIGKILL)?;
                        self.stage = Stage::Killed;
                    } else {
                        self.send_all(SIGTERM)?;
                        self.stage = Stage::Terminated(Instant::now());
                    }
                }
            },

            Stage::Terminated(since) => {
                if self.descendants.is_empty() {
                    return Ok(());
                }

                if since.elapsed() >= self.terminate_timeout {
                    self.kill_all(libc::SIGKILL)?;
                    self.stage = Stage::Killed;
                }
            },

            Stage::Killed => {},
        }

        Ok(())
    }

    /// The instant [`Supervisor::tick`] next has something to do, if
    /// any, for callers driving a `wait4`/`poll` loop with a timeout.
    pub fn next_deadline(&self) -> Option<Instant>
    {
        match self.stage {
            Stage::Running => None,
            Stage::PrimaryExited(since) =>
                self.idle_timeout.map(|timeout| since + timeout),
            Stage::Terminated(since) => Some(since + self.terminate_timeout),
            Stage::Killed => None,
        }
    }

    fn send_all(&self, signal: libc::c_int) -> io::Result<()>
    {
        for &pid in &self.descendants {
            // Best-effort: a descendant that has already exited by the
            // time we get here yields ESRCH, which is not an error.
            match signal_and_cont(pid, signal) {
                Ok(())                                                     => {},
                Err(err) if err.raw_os_error() == Some(libc::ESRCH)        => {},
                Err(err)                                                   => return Err(err),
            }
        }
        Ok(())
    }

    fn kill_all(&self, signal: libc::c_int) -> io::Result<()>
    {
        self.send_all(signal)
    }

    /// Record a newly observed descendant (reparented to this Adverb
    /// as subreaper).
    pub fn observe_descendant(&mut self, pid: libc::pid_t)
    {
        self.descendants.insert(pid);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn primary_exit_code_maps_directly()
    {
        assert_eq!(PrimaryOutcome::Exited(3).adverb_exit_status(), 3);
    }

    #[test]
    fn primary_signal_maps_to_128_plus_n()
    {
        assert_eq!(PrimaryOutcome::Signalled(9).adverb_exit_status(), 137);
    }

    #[test]
    fn record_exit_reports_when_empty()
    {
        let mut supervisor = Supervisor::new(100, None, Duration::ZERO);
        assert!(supervisor.has_descendants());
        let status = std::process::ExitStatus::from_raw(0);
        assert!(supervisor.record_exit(100, status));
        assert_eq!(supervisor.primary_outcome(), Some(PrimaryOutcome::Exited(0)));
    }

    #[test]
    fn tick_without_idle_timeout_does_nothing()
    {
        let mut supervisor = Supervisor::new(100, None, Duration::from_secs(5));
        supervisor.observe_descendant(200);
        supervisor.record_exit(100, std::process::ExitStatus::from_raw(0));
        supervisor.tick().unwrap();
        assert!(supervisor.has_descendants());
    }
}
