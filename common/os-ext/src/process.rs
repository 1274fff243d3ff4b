//! Processes: creating, waiting for, and signalling them.

use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
};

/// Call getpid(2).
pub fn getpid() -> libc::pid_t
{
    // SAFETY: This is always safe.
    unsafe { libc::getpid() }
}

/// Call getuid(2).
pub fn getuid() -> libc::uid_t
{
    // SAFETY: This is always safe.
    unsafe { libc::getuid() }
}

/// Call getgid(2).
pub fn getgid() -> libc::gid_t
{
    // SAFETY: This is always safe.
    unsafe { libc::getgid() }
}

/// Call kill(2).
pub fn kill(pid: libc::pid_t, signal: libc::c_int) -> io::Result<()>
{
    // SAFETY: This is always safe; the kernel validates pid and signal.
    let result = unsafe { libc::kill(pid, signal) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Outcome of [`fork`].
#[derive(Debug)]
pub enum ForkResult
{
    /// We are the parent process; this is the child's pid.
    Parent(libc::pid_t),

    /// We are the child process.
    Child,
}

/// Call fork(2).
///
/// # Safety
///
/// The child process may only call async-signal-safe functions
/// until it either execve(2)s or calls `_exit`.
/// See signal-safety(7) for the list of safe functions.
pub unsafe fn fork() -> io::Result<ForkResult>
{
    // SAFETY: Upheld by the caller.
    let pid = unsafe { libc::fork() };

    match pid {
        -1 => Err(io::Error::last_os_error()),
        0  => Ok(ForkResult::Child),
        _  => Ok(ForkResult::Parent(pid)),
    }
}

/// Call waitpid(2) and decode the resulting wait status.
///
/// If `pid` is [`None`], any child is waited for (equivalent to pid `-1`).
pub fn waitpid(pid: Option<libc::pid_t>, options: libc::c_int)
    -> io::Result<Option<(libc::pid_t, ExitStatus)>>
{
    let pid = pid.unwrap_or(-1);
    let mut wstatus = 0;

    // SAFETY: wstatus is a valid pointer to an integer.
    let result = unsafe { libc::waitpid(pid, &mut wstatus, options) };

    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ECHILD) {
            // There are no children left to wait for.
            return Ok(None);
        }
        return Err(err);
    }

    if result == 0 {
        // WNOHANG was passed and no state change is available yet.
        return Ok(None);
    }

    Ok(Some((result, ExitStatus::from_raw(wstatus))))
}

/// Mark the calling process as a subreaper.
///
/// Orphaned descendants of the calling process will be reparented
/// to it instead of to PID 1. See `prctl(2)`, `PR_SET_CHILD_SUBREAPER`.
pub fn set_child_subreaper(on: bool) -> io::Result<()>
{
    // SAFETY: PR_SET_CHILD_SUBREAPER takes one integer argument.
    let result = unsafe {
        libc::prctl(libc::PR_SET_CHILD_SUBREAPER, on as libc::c_ulong, 0, 0, 0)
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Request a signal when the parent process exits.
///
/// See `prctl(2)`, `PR_SET_PDEATHSIG`.
///
/// There is an inherent race: if the parent has already exited
/// by the time this call is made, the signal will not be delivered.
/// Callers should check `getppid() != 1` (or the original parent pid)
/// after this call to detect the race.
pub fn set_pdeathsig(signal: libc::c_int) -> io::Result<()>
{
    // SAFETY: PR_SET_PDEATHSIG takes one integer argument.
    let result = unsafe {
        libc::prctl(libc::PR_SET_PDEATHSIG, signal as libc::c_ulong, 0, 0, 0)
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
