//! The final execve of the container helper (spec.md §4.5 step 8).

use std::{ffi::CString, io, ptr::null};

/// Replace the current process image with `program`, passing `argv`
/// and `envp`. Never returns on success.
///
/// # Safety
///
/// Must only be called once all setup is complete; the caller has
/// already arranged which fds survive into the new image.
pub unsafe fn exec_replace(program: &CString, argv: &[CString], envp: &[CString]) -> io::Error
{
    let argv_ptrs: Vec<*const libc::c_char> =
        argv.iter().map(|s| s.as_ptr()).chain(Some(null())).collect();
    let envp_ptrs: Vec<*const libc::c_char> =
        envp.iter().map(|s| s.as_ptr()).chain(Some(null())).collect();

    // SAFETY: argv_ptrs/envp_ptrs are nul-terminated arrays of valid C
    // string pointers, kept alive for the duration of this call.
    unsafe { libc::execve(program.as_ptr(), argv_ptrs.as_ptr(), envp_ptrs.as_ptr()); }

    io::Error::last_os_error()
}

/// Convert a `Vec<String>` argv into nul-terminated [`CString`]s,
/// failing if any entry embeds a NUL byte.
pub fn to_cstrings(args: &[String]) -> io::Result<Vec<CString>>
{
    args.iter()
        .map(|s| CString::new(s.as_str()).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput)))
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn to_cstrings_rejects_embedded_nul()
    {
        let args = vec!["ok".to_string(), "bad\0value".to_string()];
        assert!(to_cstrings(&args).is_err());
    }

    #[test]
    fn to_cstrings_converts_normal_args()
    {
        let args = vec!["--flag".to_string(), "value".to_string()];
        let cstrings = to_cstrings(&args).unwrap();
        assert_eq!(cstrings.len(), 2);
    }
}
