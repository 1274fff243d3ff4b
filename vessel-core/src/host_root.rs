//! The host lookup root: where the planner resolves bare host paths against.
//!
//! Most of the container launcher's planning code (exports planning,
//! preload classification, reserved-path checks) needs to stat or read
//! paths "on the host" without actually caring whether "the host" means
//! the real root filesystem of the running process or a directory tree
//! substituted in for testing. [`HostRoot`] is the one seam where that
//! distinction lives; everything above it just calls its methods.
//!
//! Grounded on the dirfd-or-`AT_FDCWD` convention used throughout
//! `os_ext`'s `*at` wrappers (see `fstatat`/`openat`/`readlinkat`): when
//! `dirfd` is `None` those calls pass `AT_FDCWD`, and the kernel ignores
//! `dirfd` entirely whenever the path argument is absolute. A mock root
//! therefore only takes effect for paths resolved *relative* to it, so
//! [`HostRoot::resolve`] strips the leading slash before handing the
//! path to a mock fd, and leaves it absolute (dirfd ignored, real `/`
//! used) when there is no mock fd.

use {
    os_ext::{self, IntoCStr},
    std::{
        ffi::CString,
        io,
        os::unix::io::{AsFd, BorrowedFd, OwnedFd},
        path::{Path, PathBuf},
    },
};

/// Where host paths are resolved against.
///
/// The real variant is used in production; the mock variant lets tests
/// substitute an arbitrary directory tree (typically under `mkdtemp`)
/// for the host root without needing root privileges or a real chroot.
pub struct HostRoot
{
    mock: Option<OwnedFd>,
}

impl HostRoot
{
    /// The real host root: `/` as seen by this process.
    pub fn real() -> Self
    {
        Self{ mock: None }
    }

    /// A mock host root rooted at an already-open directory descriptor.
    pub fn mock(dirfd: OwnedFd) -> Self
    {
        Self{ mock: Some(dirfd) }
    }

    /// Open `path` (which must be an absolute host path) for use as a
    /// mock root via [`HostRoot::mock`].
    pub fn open_mock_dir(path: &Path) -> io::Result<Self>
    {
        let cstr = path.into_cstr().map_err(|_| io::ErrorKind::InvalidInput)?;
        let dirfd = os_ext::open(
            &cstr,
            os_ext::O_DIRECTORY | os_ext::O_PATH,
            0,
        )?;
        Ok(Self::mock(dirfd))
    }

    fn is_mock(&self) -> bool
    {
        self.mock.is_some()
    }

    /// The underlying mock directory descriptor, if any, for callers
    /// that need to issue raw syscalls (e.g. the autofs probe) against
    /// the same root this `HostRoot` resolves paths under.
    pub fn dirfd(&self) -> Option<BorrowedFd>
    {
        self.mock.as_ref().map(AsFd::as_fd)
    }

    /// Strip the leading slash from `path` when looking it up under a
    /// mock root (where it must resolve relative to the mock dirfd),
    /// leaving it untouched under the real root (where it is passed
    /// through with `AT_FDCWD`, which the kernel ignores for absolute
    /// paths).
    fn for_lookup<'a>(&self, path: &'a Path) -> &'a Path
    {
        if self.is_mock() {
            path.strip_prefix("/").unwrap_or(path)
        } else {
            path
        }
    }

    /// Resolve an absolute host path into the pathname that should be
    /// passed alongside [`HostRoot::dirfd`] to an `os_ext::*at` call
    /// taking a `&CStr`.
    ///
    /// Exposed so that callers issuing their own raw `*at` syscalls
    /// against this root (e.g. the autofs probe, which forks and so
    /// cannot reuse `HostRoot`'s own methods conveniently) stay
    /// consistent with the mock-vs-real path handling documented above.
    pub fn resolve(&self, path: &Path) -> io::Result<CString>
    {
        self.for_lookup(path)
            .into_cstr()
            .map(|cow| cow.into_owned())
            .map_err(|_| io::ErrorKind::InvalidInput.into())
    }

    /// Call fstatat(2) on `path`, not following a trailing symlink.
    pub fn lstat(&self, path: &Path) -> io::Result<os_ext::stat>
    {
        let pathname = self.resolve(path)?;
        os_ext::fstatat(self.dirfd(), &pathname, libc::AT_SYMLINK_NOFOLLOW)
    }

    /// Call fstatat(2) on `path`, following a trailing symlink.
    pub fn stat(&self, path: &Path) -> io::Result<os_ext::stat>
    {
        let pathname = self.resolve(path)?;
        os_ext::fstatat(self.dirfd(), &pathname, 0)
    }

    /// Read the target of the symlink at `path`.
    pub fn readlink(&self, path: &Path) -> io::Result<PathBuf>
    {
        let target = os_ext::readlinkat(self.dirfd(), self.for_lookup(path))?;
        Ok(PathBuf::from(target.into_string().unwrap_or_else(|cstring| {
            String::from_utf8_lossy(cstring.as_bytes()).into_owned()
        })))
    }

    /// Open `path` with the given flags and mode, as if via openat(2)
    /// against this root.
    pub fn open(&self, path: &Path, flags: libc::c_int, mode: libc::mode_t)
        -> io::Result<OwnedFd>
    {
        let pathname = self.resolve(path)?;
        os_ext::openat(self.dirfd(), &pathname, flags, mode)
    }

    /// Whether `path` exists under this root (following symlinks).
    pub fn exists(&self, path: &Path) -> bool
    {
        self.stat(path).is_ok()
    }
}

#[cfg(test)]
mod tests
{
    use {
        super::*,
        os_ext::cstr,
        std::fs,
    };

    fn mkdtemp() -> PathBuf
    {
        let path = os_ext::mkdtemp(cstr!("/tmp/vessel-core-test-XXXXXX").to_owned())
            .unwrap();
        PathBuf::from(path.into_string().unwrap())
    }

    #[test]
    fn real_root_resolves_absolute_path()
    {
        let root = HostRoot::real();
        assert!(root.exists(Path::new("/")));
    }

    #[test]
    fn mock_root_strips_leading_slash()
    {
        let dir = mkdtemp();
        fs::write(dir.join("marker"), b"hi").unwrap();

        let root = HostRoot::open_mock_dir(&dir).unwrap();
        assert!(root.exists(Path::new("/marker")));
        assert!(!root.exists(Path::new("/absent")));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mock_root_readlink()
    {
        let dir = mkdtemp();
        std::os::unix::fs::symlink("target", dir.join("link")).unwrap();

        let root = HostRoot::open_mock_dir(&dir).unwrap();
        let target = root.readlink(Path::new("/link")).unwrap();
        assert_eq!(target, Path::new("target"));

        fs::remove_dir_all(&dir).ok();
    }
}
