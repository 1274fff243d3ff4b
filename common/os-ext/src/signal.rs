//! Signal disposition and blocking.

use std::{io, mem::zeroed};

/// A signal handler function, as accepted by [`sigaction`].
///
/// Must be async-signal-safe: see signal-safety(7).
pub type SignalHandler = extern "C" fn(libc::c_int);

/// Install `handler` as the disposition for `signal`, with no flags
/// and the full signal set blocked while the handler runs.
///
/// Passing [`None`] installs `SIG_DFL` (the default disposition).
pub fn sigaction(signal: libc::c_int, handler: Option<SignalHandler>)
    -> io::Result<()>
{
    // SAFETY: zero-initializing sigaction is not generally valid for all
    // platforms, but glibc's sigaction has no invalid all-zero bit pattern
    // other than the handler/mask fields we overwrite below.
    let mut action: libc::sigaction = unsafe { zeroed() };

    action.sa_sigaction = match handler {
        Some(handler) => handler as usize,
        None          => libc::SIG_DFL,
    };

    // SAFETY: action.sa_mask is a valid sigset_t.
    unsafe { libc::sigemptyset(&mut action.sa_mask); }

    // SAFETY: action is a fully initialized sigaction.
    let result = unsafe {
        libc::sigaction(signal, &action, std::ptr::null_mut())
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Reset the disposition of every standard signal to `SIG_DFL`.
///
/// Signals whose default disposition is `SIG_IGN`
/// (`SIGCHLD`, `SIGURG`, `SIGWINCH`) are left untouched by glibc's
/// `sigaction` when passed `SIG_DFL`, which is exactly what we want:
/// `SIG_DFL` for those signals behaves as ignore, as documented.
pub fn reset_all_signal_dispositions() -> io::Result<()>
{
    for signal in 1 .. libc::SIGRTMAX() {
        // A few signal numbers cannot be handled/reset; skip them.
        if signal == libc::SIGKILL || signal == libc::SIGSTOP {
            continue;
        }

        match sigaction(signal, None) {
            Ok(())                                                   => {},
            Err(err) if err.raw_os_error() == Some(libc::EINVAL)     => {},
            Err(err)                                                 => return Err(err),
        }
    }

    Ok(())
}

/// Unblock every signal for the calling thread.
///
/// See `sigprocmask(2)`, `SIG_SETMASK`.
pub fn unblock_all_signals() -> io::Result<()>
{
    // SAFETY: set is fully initialized by sigfillset below.
    let mut set: libc::sigset_t = unsafe { zeroed() };

    // SAFETY: set is a valid pointer to a sigset_t.
    unsafe { libc::sigfillset(&mut set); }

    // SAFETY: set is fully initialized.
    let result = unsafe {
        libc::sigprocmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut())
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Block a single signal for the calling thread, returning the previous mask
/// so it can be restored with [`sigprocmask_setmask`].
///
/// See `sigprocmask(2)`, `SIG_BLOCK`.
pub fn block_signal(signal: libc::c_int) -> io::Result<libc::sigset_t>
{
    // SAFETY: zero-initializing a sigset_t and then populating it via
    // sigemptyset/sigaddset below is the documented way to build one.
    let mut set: libc::sigset_t = unsafe { zeroed() };
    // SAFETY: oldset is written by sigprocmask below before being read.
    let mut oldset: libc::sigset_t = unsafe { zeroed() };

    // SAFETY: set is a valid pointer to a sigset_t.
    unsafe {
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, signal);
    }

    // SAFETY: set and oldset are valid pointers.
    let result = unsafe {
        libc::sigprocmask(libc::SIG_BLOCK, &set, &mut oldset)
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(oldset)
}

/// Restore a signal mask previously returned by [`block_signal`].
pub fn sigprocmask_setmask(mask: &libc::sigset_t) -> io::Result<()>
{
    // SAFETY: mask is a valid sigset_t.
    let result = unsafe {
        libc::sigprocmask(libc::SIG_SETMASK, mask, std::ptr::null_mut())
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
