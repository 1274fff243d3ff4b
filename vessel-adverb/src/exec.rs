//! Running helper programs and the final execve (spec.md §4.4 steps
//! 5, 6, 8).
//!
//! Grounded on the host project's `run_command` action: build nul-
//! terminated argv/envp arrays, fork, and either exec or collect a
//! wait status in the parent.

use std::{
    ffi::CStr,
    io,
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
    ptr::null,
};

use os_ext::ForkResult;

/// Replace the current process image, never returning on success.
///
/// # Safety
///
/// Must only be called after all setup requiring heap allocation or
/// non-async-signal-safe work has completed, consistent with the
/// fork/exec discipline this crate follows throughout.
pub unsafe fn exec_replace(
    program: &CStr,
    argv: &[impl AsRef<CStr>],
    envp: &[impl AsRef<CStr>],
) -> io::Error
{
    let argv_ptrs: Vec<*const libc::c_char> =
        argv.iter().map(|s| s.as_ref().as_ptr()).chain(Some(null())).collect();
    let envp_ptrs: Vec<*const libc::c_char> =
        envp.iter().map(|s| s.as_ref().as_ptr()).chain(Some(null())).collect();

    // SAFETY: argv_ptrs/envp_ptrs are nul-terminated arrays of valid
    // C string pointers, kept alive for the duration of this call.
    unsafe { libc::execve(program.as_ptr(), argv_ptrs.as_ptr(), envp_ptrs.as_ptr()); }

    io::Error::last_os_error()
}

/// Fork, execve `program` with `argv` (no custom environment — the
/// current process's own environment is inherited) in the child, and
/// wait for it to finish in the parent.
///
/// Used for the two synchronous helper invocations the Adverb makes
/// before execve-ing the guest: ldconfig and the locale-generation
/// helper.
pub fn run_to_completion(program: &CStr, argv: &[impl AsRef<CStr>]) -> io::Result<ExitStatus>
{
    let argv_ptrs: Vec<*const libc::c_char> =
        argv.iter().map(|s| s.as_ref().as_ptr()).chain(Some(null())).collect();

    // SAFETY: the child only calls execve and _exit before any other
    // potentially-unsafe operation, per fork(2)'s child-side contract.
    match unsafe { os_ext::fork() }?
    {
        ForkResult::Child => {
            // SAFETY: argv_ptrs is a nul-terminated array of valid C
            // string pointers; environ is supplied by libc itself.
            unsafe {
                libc::execve(program.as_ptr(), argv_ptrs.as_ptr(), libc::environ as *const _);
            }
            // SAFETY: exits the child without running parent destructors.
            unsafe { libc::_exit(127) };
        },

        ForkResult::Parent(child_pid) => {
            loop {
                match os_ext::waitpid(Some(child_pid), 0)? {
                    Some((_, status)) => return Ok(status),
                    None              => continue,
                }
            }
        },
    }
}

/// Decode a wait status's exit code, treating signal termination as
/// `128 + signal`, matching the Adverb's own exit-status convention
/// (spec.md §4.4, "Adverb exit status").
pub fn exit_code_of(status: &ExitStatus) -> i32
{
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use os_ext::cstr;

    #[test]
    fn run_to_completion_true_and_false()
    {
        let status = run_to_completion(cstr!("/bin/true"), &[cstr!("true")]).unwrap();
        assert_eq!(status.code(), Some(0));

        let status = run_to_completion(cstr!("/bin/false"), &[cstr!("false")]).unwrap();
        assert_eq!(status.code(), Some(1));
    }

    #[test]
    fn exit_code_of_normal_exit()
    {
        let status = run_to_completion(cstr!("/bin/false"), &[cstr!("false")]).unwrap();
        assert_eq!(exit_code_of(&status), 1);
    }
}
