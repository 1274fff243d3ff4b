//! Signal setup (spec.md §4.4 step 1).
//!
//! Grounded on the host project's own signal-safety discipline
//! (`os_ext::signal`): handlers do only async-signal-safe work. Here
//! that work is a single atomic load and a `kill(2)`, both safe to do
//! from a signal handler.

use std::sync::atomic::{AtomicI32, Ordering};

use os_ext::{SIGCONT, SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2};

/// The primary child's pid, or 0 if it has not been recorded yet (or
/// has already exited). Written once from the main thread after fork;
/// read from signal handlers.
static PRIMARY_CHILD: AtomicI32 = AtomicI32::new(0);

/// Record the primary child's pid so forwarded signals reach it.
pub fn set_primary_child(pid: libc::pid_t)
{
    PRIMARY_CHILD.store(pid, Ordering::SeqCst);
}

/// Clear the recorded primary child, e.g. once it has been reaped.
pub fn clear_primary_child()
{
    PRIMARY_CHILD.store(0, Ordering::SeqCst);
}

const FORWARDED: &[libc::c_int] = &[SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2];

extern "C" fn forward(signal: libc::c_int)
{
    let child = PRIMARY_CHILD.load(Ordering::SeqCst);

    if child != 0 {
        // SAFETY: kill(2) is async-signal-safe.
        unsafe { libc::kill(child, signal); }
    } else {
        // No primary child (yet, or any more): behave as if this
        // handler were never installed.
        // SAFETY: sigaction with SIG_DFL then re-raising is the
        // standard async-signal-safe "default and reraise" idiom.
        unsafe {
            libc::signal(signal, libc::SIG_DFL);
            libc::raise(signal);
        }
    }
}

/// Reset all dispositions, unblock all signals, install the forwarders,
/// and arrange the parent-death signal if requested.
pub fn setup(exit_with_parent: bool) -> std::io::Result<()>
{
    os_ext::reset_all_signal_dispositions()?;
    os_ext::unblock_all_signals()?;

    for &signal in FORWARDED {
        os_ext::sigaction(signal, Some(forward))?;
    }

    if exit_with_parent {
        os_ext::set_pdeathsig(SIGTERM)?;
    }

    Ok(())
}

/// Send `signal`, then [`SIGCONT`], to `pid` — the terminate-cascade
/// idiom (spec.md §4.4 step 9) that wakes a stopped process up enough
/// to receive the signal that follows it.
pub fn signal_and_cont(pid: libc::pid_t, signal: libc::c_int) -> std::io::Result<()>
{
    os_ext::kill(pid, signal)?;
    os_ext::kill(pid, SIGCONT)?;
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn primary_child_roundtrips()
    {
        set_primary_child(1234);
        assert_eq!(PRIMARY_CHILD.load(Ordering::SeqCst), 1234);
        clear_primary_child();
        assert_eq!(PRIMARY_CHILD.load(Ordering::SeqCst), 0);
    }
}
