//! Fd redirection before execve (spec.md §4.4 step 7).

use std::{
    io,
    os::unix::io::{AsFd, BorrowedFd},
};

use os_ext::get_cloexec;

use crate::options::AssignFd;

/// Apply every `--assign-fd target=source` request, then clear
/// close-on-exec on every `--pass-fd` target, then set close-on-exec
/// on everything else above fd 2.
///
/// Must run after signals are unblocked in the child and before
/// execve.
pub fn redirect(assigns: &[AssignFd], pass: &[i32]) -> io::Result<()>
{
    for assign in assigns {
        // SAFETY: source/target are caller-supplied fd numbers that
        // are expected to be open in this process; dup2 itself
        // validates them and returns an error if not.
        let source: BorrowedFd = unsafe { BorrowedFd::borrow_raw(assign.source) };
        let target: BorrowedFd = unsafe { BorrowedFd::borrow_raw(assign.target) };
        os_ext::dup2(source, target)?;
    }

    apply_cloexec_above_stderr(pass)?;

    Ok(())
}

/// Clear close-on-exec on every fd in `keep`; set it on every other
/// open fd above stderr.
fn apply_cloexec_above_stderr(keep: &[i32]) -> io::Result<()>
{
    // Rather than enumerate /proc/self/fd (which may not be mounted
    // yet this early), probe a fixed, generous fd range: anything not
    // open yields EBADF from fcntl, which is not an error here.
    const MAX_PROBE_FD: i32 = 1024;

    for fd in 3 ..= MAX_PROBE_FD {
        let desired = !keep.contains(&fd);

        // SAFETY: fd is only used for the duration of this borrow to
        // query/set FD_CLOEXEC; it is not closed or retained.
        let borrowed: BorrowedFd = unsafe { BorrowedFd::borrow_raw(fd) };

        match get_cloexec(borrowed) {
            Ok(current) if current != desired => os_ext::set_cloexec(borrowed, desired)?,
            Ok(_)                              => {},
            Err(err) if err.raw_os_error() == Some(libc::EBADF) => {},
            Err(err)                           => return Err(err),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn pass_fd_is_spared_cloexec()
    {
        let (read_end, write_end) = os_ext::pipe2(0).unwrap();
        let pass = read_end.as_raw_fd();

        apply_cloexec_above_stderr(&[pass]).unwrap();

        assert!(!get_cloexec(read_end.as_fd()).unwrap());
        assert!(get_cloexec(write_end.as_fd()).unwrap());
    }
}
