//! The autofs responsiveness probe (spec.md §4.2 "Autofs guard").
//!
//! An autofs mount that has lost its backing server hangs on open(2)
//! indefinitely. Naively bind-mounting such a path would wedge every
//! container launch that happens to touch it, so before exposing a
//! path the planner detects autofs mounts (via `statfs`'s magic number)
//! and probes them from a forked child with a hard 200ms deadline,
//! enforced with `poll` over a self-pipe the child closes on exit.
//!
//! Grounded on the fork/pidfd/timeout pattern in the host project's
//! command runner (`run_command`): fork, let the child do the
//! possibly-blocking work, and bound the parent's wait with a timeout
//! so a wedged child cannot wedge the launcher too.

use {
    os_ext::{ForkResult, O_DIRECTORY, O_NONBLOCK, O_PATH, O_RDONLY},
    std::{
        ffi::CStr,
        io,
        os::unix::io::{AsFd, AsRawFd, BorrowedFd},
        time::Duration,
    },
};

/// How long the probe child is given to complete its `open`.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// The `statfs` magic number for autofs mounts, from `<linux/magic.h>`.
const AUTOFS_SUPER_MAGIC: i64 = 0x0187;

/// Whether `path` (already known to exist) is mounted via autofs.
pub fn is_autofs_mount(dirfd: Option<BorrowedFd>, pathname: &CStr)
    -> io::Result<bool>
{
    let fd = os_ext::openat(dirfd, pathname, O_PATH, 0)?;
    let statfs = os_ext::fstatfs(fd.as_fd())?;
    Ok(statfs.f_type as i64 == AUTOFS_SUPER_MAGIC)
}

/// Probe whether opening `pathname` (relative to `dirfd`) completes
/// within [`PROBE_TIMEOUT`].
///
/// Returns `Ok(true)` if the open returned (successfully or not) in
/// time, `Ok(false)` if the probe child was still blocked at the
/// deadline and had to be killed.
pub fn probe_responsive(dirfd: Option<BorrowedFd>, pathname: &CStr)
    -> io::Result<bool>
{
    let (pipe_r, pipe_w) = os_ext::pipe2(0)?;

    // SAFETY: the child performs only the open attempt and _exit;
    // no heap allocation occurs between fork and the open() call,
    // and the process is single-threaded.
    match unsafe { os_ext::fork() }?
    {
        ForkResult::Child => {
            drop(pipe_r);

            // The result is irrelevant to the caller; only completion
            // (vs. indefinite blocking) is being measured. Dropping
            // pipe_w on any exit path closes it, which is what the
            // parent's poll/read detects.
            let _ = unsafe {
                libc::openat(
                    dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD),
                    pathname.as_ptr(),
                    O_RDONLY | O_NONBLOCK | O_DIRECTORY,
                )
            };

            drop(pipe_w);
            // SAFETY: exits the child without running parent destructors.
            unsafe { libc::_exit(0) };
        },

        ForkResult::Parent(child_pid) => {
            drop(pipe_w);

            let mut pollfd = libc::pollfd{
                fd: pipe_r.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };

            let timeout_ms: libc::c_int =
                PROBE_TIMEOUT.as_millis().try_into().unwrap_or(libc::c_int::MAX);

            // SAFETY: pollfd points to one valid, initialized pollfd.
            let ready = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

            if ready == -1 {
                return Err(io::Error::last_os_error());
            }

            if ready == 0 {
                // Timed out: the child is still stuck in open(). Kill
                // and reap it so it doesn't linger as a zombie/orphan.
                let _ = os_ext::kill(child_pid, libc::SIGKILL);
                let _ = os_ext::waitpid(Some(child_pid), 0);
                return Ok(false);
            }

            // The child closed the pipe (exited); collect it.
            let _ = os_ext::waitpid(Some(child_pid), 0);
            Ok(true)
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn probe_responsive_on_fast_path()
    {
        let pathname = os_ext::cstr!("/tmp");
        let responsive = probe_responsive(None, pathname).unwrap();
        assert!(responsive);
    }
}
