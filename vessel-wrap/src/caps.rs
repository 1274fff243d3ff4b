//! Probing the container helper's own capabilities (spec.md §9,
//! "minimum container helper version").
//!
//! The source this spec was distilled from silently drops permission
//! bits when the container helper predates `--perms` support. Per the
//! open question's resolution (see `DESIGN.md`), this tree takes the
//! stricter newer position instead: a helper too old to support
//! `--perms` is a fatal setup error, not a silent downgrade.

use std::{
    ffi::CString,
    io::{self, Read},
    os::unix::io::AsRawFd,
};

use os_ext::ForkResult;

/// Run `helper --help` and check whether its usage text advertises
/// `--perms` support.
pub fn supports_perms(helper: &CString) -> io::Result<bool>
{
    let (read_end, write_end) = os_ext::pipe2(libc::O_CLOEXEC)?;

    // SAFETY: the child only dup2s, execve's, and _exit's before any
    // other potentially-unsafe operation, per fork(2)'s child-side
    // contract.
    match unsafe { os_ext::fork() }?
    {
        ForkResult::Child => {
            // SAFETY: write_end is a valid, open fd owned by this process.
            unsafe { libc::dup2(write_end.as_raw_fd(), libc::STDOUT_FILENO); }
            drop(write_end);
            drop(read_end);

            let help_flag = CString::new("--help").unwrap();
            let argv = [helper.as_ptr(), help_flag.as_ptr(), std::ptr::null()];
            // SAFETY: argv is nul-terminated; environ is supplied by libc.
            unsafe { libc::execve(helper.as_ptr(), argv.as_ptr(), libc::environ as *const _); }
            // SAFETY: exits the child without running parent destructors.
            unsafe { libc::_exit(127) };
        },

        ForkResult::Parent(child_pid) => {
            drop(write_end);

            let mut output = String::new();
            let mut file = std::fs::File::from(read_end);
            file.read_to_string(&mut output).ok();

            loop {
                match os_ext::waitpid(Some(child_pid), 0)? {
                    Some(_) => break,
                    None    => continue,
                }
            }

            Ok(output.contains("--perms"))
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn help_of_true_does_not_mention_perms()
    {
        let helper = CString::new("/bin/true").unwrap();
        let supported = supports_perms(&helper).unwrap();
        assert!(!supported);
    }
}
