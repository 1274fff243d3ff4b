//! Advisory lock acquisition (spec.md §4.4 step 3).

use std::{io, os::unix::io::{AsFd, OwnedFd}};

use os_ext::{cstr::IntoCStr, O_CREAT, O_WRONLY};

use crate::options::LockRequest;

/// Open and lock every requested file, in order. The returned fds must
/// be kept alive (not dropped) for the Adverb's lifetime, and must
/// survive execve — callers clear their close-on-exec bit with
/// [`keep_across_exec`] once all other setup has succeeded.
pub fn acquire(requests: &[LockRequest]) -> io::Result<Vec<OwnedFd>>
{
    let mut fds = Vec::with_capacity(requests.len());

    for request in requests {
        let pathname = request.path.clone().into_cstr()
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        let flags = if request.create { O_WRONLY | O_CREAT } else { O_WRONLY };
        let fd = os_ext::open(&pathname, flags, 0o644)?;

        os_ext::fcntl_lock(fd.as_fd(), request.exclusive, request.wait)?;
        fds.push(fd);
    }

    Ok(fds)
}

/// Clear close-on-exec on every lock fd so it survives into the guest.
pub fn keep_across_exec(fds: &[OwnedFd]) -> io::Result<()>
{
    for fd in fds {
        os_ext::set_cloexec(fd.as_fd(), false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use os_ext::cstr;
    use std::path::PathBuf;

    #[test]
    fn acquire_and_hold_exclusive_lock()
    {
        let dir = os_ext::mkdtemp(cstr!("/tmp/vessel-adverb-test-XXXXXX").to_owned()).unwrap();
        let mut path = PathBuf::from(dir.to_str().unwrap().to_string());
        path.push("lockfile");

        let requests = vec![LockRequest{
            path:      path,
            create:    true,
            exclusive: true,
            wait:      false,
        }];

        let fds = acquire(&requests).unwrap();
        assert_eq!(fds.len(), 1);
        keep_across_exec(&fds).unwrap();
    }
}
