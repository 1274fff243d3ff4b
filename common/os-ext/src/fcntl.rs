use std::{
    ffi::CStr,
    io,
    os::unix::io::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd},
};

/// Equivalent to [`openat`] with [`None`] passed for `dirfd`.
pub fn open(
    pathname: &CStr,
    flags: libc::c_int,
    mode: libc::mode_t,
) -> io::Result<OwnedFd>
{
    openat(None, pathname, flags, mode)
}

/// Call openat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn openat(
    dirfd:    Option<BorrowedFd>,
    pathname: &CStr,
    flags:    libc::c_int,
    mode:     libc::mode_t,
) -> io::Result<OwnedFd>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let flags = flags | libc::O_CLOEXEC;

    // SAFETY: path is NUL-terminated.
    let fd = unsafe { libc::openat(dirfd, pathname.as_ptr(), flags, mode) };

    if fd == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: fd is a new, open file descriptor.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Call pipe2(2) with the given flags.
///
/// `O_CLOEXEC` is implied and need not be passed.
/// Returns the `(read end, write end)` pair.
pub fn pipe2(flags: libc::c_int) -> io::Result<(OwnedFd, OwnedFd)>
{
    let mut fds: [RawFd; 2] = [-1, -1];
    let flags = flags | libc::O_CLOEXEC;

    // SAFETY: fds points to a 2-element array, as pipe2(2) requires.
    let result = unsafe { libc::pipe2(fds.as_mut_ptr(), flags) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: pipe2 populated both fds with new, open file descriptors.
    unsafe { Ok((OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))) }
}

/// Query whether `FD_CLOEXEC` is set on `fd`.
pub fn get_cloexec(fd: BorrowedFd) -> io::Result<bool>
{
    // SAFETY: This is always safe.
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD) };

    if flags == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(flags & libc::FD_CLOEXEC != 0)
}

/// Set or clear `FD_CLOEXEC` on `fd`.
///
/// Most file descriptors obtained from this crate already have
/// `FD_CLOEXEC` set atomically at creation time; this function exists
/// for the rare case where it must be cleared before an execve(2),
/// such as a lock or a forwarded fd that must survive into the child.
pub fn set_cloexec(fd: BorrowedFd, cloexec: bool) -> io::Result<()>
{
    let flags = if cloexec { libc::FD_CLOEXEC } else { 0 };

    // SAFETY: This is always safe.
    let result = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, flags) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Acquire (or attempt to acquire) an advisory byte-range lock on the whole
/// file referred to by `fd`, via fcntl(2) `F_SETLK`/`F_SETLKW`.
///
/// The lock is a property of the open file description, not the fd itself;
/// it is inherited across `execve` as long as the fd stays open with
/// `FD_CLOEXEC` cleared. If `wait` is false and the lock is already held
/// incompatibly, this returns `Err` with `EAGAIN`/`EACCES`.
pub fn fcntl_lock(fd: BorrowedFd, exclusive: bool, wait: bool)
    -> io::Result<()>
{
    // SAFETY: libc::flock is a plain-old-data struct; every field relevant
    // to F_SETLK/F_SETLKW is set explicitly below before use.
    let mut flock: libc::flock = unsafe { std::mem::zeroed() };
    flock.l_type   = if exclusive { libc::F_WRLCK } else { libc::F_RDLCK } as libc::c_short;
    flock.l_whence = libc::SEEK_SET as libc::c_short;
    flock.l_start  = 0;
    flock.l_len    = 0; // Whole file.

    let cmd = if wait { libc::F_SETLKW } else { libc::F_SETLK };

    // SAFETY: flock is fully initialized.
    let result = unsafe { libc::fcntl(fd.as_raw_fd(), cmd, &flock) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
