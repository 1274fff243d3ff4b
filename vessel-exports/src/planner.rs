//! The exports planner (spec.md §4.2): accumulates `(path, mode)`
//! requests and finalizes them into a deterministic op stream.

use {
    crate::{
        autofs,
        entry::Entry,
        mode::Mode,
        op::Op,
    },
    os_ext::{S_IFDIR, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK},
    std::{
        collections::BTreeMap,
        path::{Component, Path, PathBuf},
    },
    vessel_core::{AlreadyWarned, Error, HostRoot, Result},
    vessel_path_policy::is_reserved,
};

/// Paths that are never mirrored as symlinks even if the host exposes
/// them as one, because the container always wants its own private
/// writable area there (spec.md §4.2, "Ancestor symlink handling").
const NEVER_SYMLINK: &[&str] = &["/tmp", "/var/tmp"];

/// Maximum symlink-resolution recursion depth before giving up with
/// [`Error::Loop`] (spec.md §4.2, `add_expose` failure modes).
const MAX_SYMLINK_DEPTH: u32 = 40;

/// Accumulates export requests and turns them into a mount-operation
/// stream.
pub struct ExportsPlanner
{
    host_root: HostRoot,
    entries: BTreeMap<PathBuf, Entry>,
    already_warned: AlreadyWarned,
}

impl ExportsPlanner
{
    /// Create a planner that resolves paths against `host_root`.
    pub fn new(host_root: HostRoot) -> Self
    {
        Self{
            host_root,
            entries: BTreeMap::new(),
            already_warned: AlreadyWarned::new(),
        }
    }

    /// Request that `path` be made visible with at least `mode`.
    ///
    /// `mode` must be [`Mode::ReadOnly`] or [`Mode::ReadWrite`]; use
    /// [`ExportsPlanner::add_tmpfs`]/[`ExportsPlanner::add_dir`] for
    /// the internal modes.
    pub fn add_expose(&mut self, path: &Path, mode: Mode, origin: &str)
        -> Result<()>
    {
        debug_assert!(matches!(mode, Mode::ReadOnly | Mode::ReadWrite));
        self.add_expose_inner(path, mode, origin, 0)
    }

    /// Request that `path` be replaced with an empty writable tmpfs.
    pub fn add_tmpfs(&mut self, path: &Path, origin: &str) -> Result<()>
    {
        self.check_basic(path)?;
        self.insert(path, Mode::TmpfsMask, origin, None, None);
        Ok(())
    }

    /// Request that `path` exist as a directory, without mounting
    /// anything over it.
    pub fn add_dir(&mut self, path: &Path, origin: &str) -> Result<()>
    {
        self.check_basic(path)?;
        self.insert(path, Mode::EnsureDir, origin, None, None);
        Ok(())
    }

    fn check_basic(&mut self, path: &Path) -> Result<()>
    {
        if !path.is_absolute() {
            return Err(Error::Usage(format!("{} is not absolute", path.display())));
        }

        if is_reserved(path) {
            let first_warning = self.already_warned.warn_once(path);
            if first_warning {
                log::warn!("refusing to expose reserved path {}", path.display());
            } else {
                log::info!("refusing to expose reserved path {}", path.display());
            }
            return Err(Error::ReservedPath(path.to_path_buf()));
        }

        Ok(())
    }

    fn add_expose_inner(
        &mut self,
        path: &Path,
        mode: Mode,
        origin: &str,
        depth: u32,
    ) -> Result<()>
    {
        if depth > MAX_SYMLINK_DEPTH {
            return Err(Error::Loop(path.to_path_buf()));
        }

        self.check_basic(path)?;

        let canonical = canonicalize_lexically(path);

        // Walk the path's ancestors left to right, looking for a host
        // symlink we must mirror.
        let mut walked = PathBuf::from("/");
        let mut components = canonical.components();
        // Skip the RootDir component; `walked` already represents it.
        components.next();

        for component in components {
            let Component::Normal(name) = component
                else { continue };
            walked.push(name);

            if NEVER_SYMLINK.iter().any(|p| Path::new(p) == walked) {
                continue;
            }

            let Ok(stat) = self.host_root.lstat(&walked)
                else { continue };

            if stat.st_mode & S_IFMT != S_IFLNK {
                continue;
            }

            let link_target = self.host_root.readlink(&walked)
                .map_err(|_| Error::PathNotFound(walked.clone()))?;

            let remainder = canonical.strip_prefix(&walked).unwrap_or(Path::new(""));
            let resolved_target = resolve_symlink_target(&walked, &link_target);
            let rewritten = resolved_target.join(remainder);

            // Recurse into the rewritten path. If it succeeds, record
            // the original prefix as a SYMLINK entry mirroring the
            // host link; if not, the whole request fails.
            self.add_expose_inner(&rewritten, mode, origin, depth + 1)?;

            self.insert(&walked, Mode::Symlink, origin, None, Some(link_target));
            return Ok(());
        }

        // No ancestor symlink intervened; resolve `canonical` directly.
        let stat = self.host_root.stat(&canonical).map_err(|err| {
            match err.kind() {
                std::io::ErrorKind::NotFound      => Error::PathNotFound(canonical.clone()),
                std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(canonical.clone()),
                _                                  => Error::PathNotFound(canonical.clone()),
            }
        })?;

        match stat.st_mode & S_IFMT {
            S_IFDIR | S_IFREG | S_IFLNK | S_IFSOCK => {},
            _ => return Err(Error::Usage(format!(
                "{} is not a supported file type", canonical.display(),
            ))),
        }

        if self.is_on_autofs(&canonical)? {
            return Err(Error::AutofsBlocked(canonical));
        }

        self.insert(&canonical, mode, origin, Some(canonical.clone()), None);
        Ok(())
    }

    fn is_on_autofs(&self, path: &Path) -> Result<bool>
    {
        let pathname = self.host_root.resolve(path)
            .map_err(|err| Error::Unexpected(err.into()))?;
        let dirfd = self.host_root.dirfd();

        let is_autofs = autofs::is_autofs_mount(dirfd, &pathname)
            .map_err(|err| Error::Unexpected(err.into()))?;

        if !is_autofs {
            return Ok(false);
        }

        let responsive = autofs::probe_responsive(dirfd, &pathname)
            .map_err(|err| Error::Unexpected(err.into()))?;

        Ok(!responsive)
    }

    fn insert(
        &mut self,
        path: &Path,
        mode: Mode,
        origin: &str,
        source: Option<PathBuf>,
        symlink_target: Option<PathBuf>,
    )
    {
        self.entries
            .entry(path.to_path_buf())
            .and_modify(|entry| entry.promote(mode, origin, source.clone(), symlink_target.clone()))
            .or_insert_with(|| Entry{
                path: path.to_path_buf(),
                mode,
                origin: origin.to_owned(),
                source,
                symlink_target,
            });
    }

    /// Produce the deterministic op stream for everything accumulated
    /// so far. The planner is *not* consumed: further requests may
    /// still be added and `finalize` called again.
    pub fn finalize(&self) -> Vec<Op>
    {
        let mut ops: Vec<Op> = self.entries.values().map(|entry| {
            match entry.mode {
                Mode::TmpfsMask => Op::Tmpfs{ target: entry.path.clone() },
                Mode::EnsureDir => Op::Dir{ target: entry.path.clone() },
                Mode::Symlink   => Op::Symlink{
                    target: entry.path.clone(),
                    relative_target: entry.symlink_target.clone()
                        .unwrap_or_default(),
                },
                Mode::ReadOnly | Mode::ReadWrite => Op::Bind{
                    ro: entry.mode == Mode::ReadOnly,
                    source: entry.source.clone().unwrap_or_else(|| entry.path.clone()),
                    target: entry.path.clone(),
                },
            }
        }).collect();

        ops.sort_by(|a, b| a.target().cmp(b.target()));
        ops
    }

    /// Simulate the effect of every accumulated entry and report the
    /// resulting container-side visibility of `path`.
    pub fn is_visible(&self, path: &Path) -> Visibility
    {
        let canonical = canonicalize_lexically(path);

        if let Some(entry) = self.entries.get(&canonical) {
            return match entry.mode {
                Mode::TmpfsMask => Visibility::ReadWrite,
                Mode::EnsureDir => self.parent_visibility(&canonical),
                Mode::Symlink   => Visibility::ReadOnly,
                Mode::ReadOnly  => Visibility::ReadOnly,
                Mode::ReadWrite => Visibility::ReadWrite,
            };
        }

        self.parent_visibility(&canonical)
    }

    fn parent_visibility(&self, path: &Path) -> Visibility
    {
        let mut ancestor = path.parent();
        while let Some(candidate) = ancestor {
            if let Some(entry) = self.entries.get(candidate) {
                return match entry.mode {
                    Mode::TmpfsMask => Visibility::Hidden,
                    Mode::ReadOnly  => Visibility::ReadOnly,
                    Mode::ReadWrite => Visibility::ReadWrite,
                    Mode::EnsureDir | Mode::Symlink => Visibility::Hidden,
                };
            }
            ancestor = candidate.parent();
        }
        Visibility::Hidden
    }
}

/// The container-side visibility of a path, as reported by
/// [`ExportsPlanner::is_visible`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Visibility
{
    /// Not visible at all.
    Hidden,
    /// Visible, read-only.
    ReadOnly,
    /// Visible, read-write.
    ReadWrite,
}

/// Resolve a symlink target string relative to the symlink's own
/// containing directory, without touching the filesystem.
fn resolve_symlink_target(link_path: &Path, target: &Path) -> PathBuf
{
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        let parent = link_path.parent().unwrap_or(Path::new("/"));
        canonicalize_lexically(&parent.join(target))
    }
}

/// Lexically canonicalize `path`: resolve `.`/`..` components without
/// touching the filesystem or following symlinks. `path` must be
/// absolute.
fn canonicalize_lexically(path: &Path) -> PathBuf
{
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir    => {},
            Component::CurDir     => {},
            Component::ParentDir  => { out.pop(); },
            Component::Normal(n)  => out.push(n),
            Component::Prefix(_)  => {},
        }
    }
    out
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn canonicalize_dot_and_dotdot()
    {
        assert_eq!(
            canonicalize_lexically(Path::new("/home/./u")),
            PathBuf::from("/home/u"),
        );
        assert_eq!(
            canonicalize_lexically(Path::new("/a/b/../c")),
            PathBuf::from("/a/c"),
        );
    }

    #[test]
    fn add_expose_rejects_relative_path()
    {
        let mut planner = ExportsPlanner::new(HostRoot::real());
        let err = planner.add_expose(Path::new("relative"), Mode::ReadOnly, "test");
        assert!(matches!(err, Err(Error::Usage(_))));
    }

    #[test]
    fn add_expose_rejects_reserved_path()
    {
        let mut planner = ExportsPlanner::new(HostRoot::real());
        let err = planner.add_expose(Path::new("/usr"), Mode::ReadOnly, "test");
        assert!(matches!(err, Err(Error::ReservedPath(_))));
    }

    #[test]
    fn add_expose_reserved_path_warns_once()
    {
        let mut planner = ExportsPlanner::new(HostRoot::real());
        let _ = planner.add_expose(Path::new("/usr"), Mode::ReadOnly, "test");
        assert!(!planner.already_warned.warn_once(Path::new("/usr")));
    }

    #[test]
    fn finalize_is_sorted_by_target()
    {
        let mut planner = ExportsPlanner::new(HostRoot::real());
        planner.add_dir(Path::new("/run/zzz"), "test").unwrap();
        planner.add_dir(Path::new("/run/aaa"), "test").unwrap();
        let ops = planner.finalize();
        let targets: Vec<_> = ops.iter().map(Op::target).collect();
        let mut sorted = targets.clone();
        sorted.sort();
        assert_eq!(targets, sorted);
    }

    #[test]
    fn mode_promotion_on_repeated_request()
    {
        let mut planner = ExportsPlanner::new(HostRoot::real());
        planner.add_tmpfs(Path::new("/run/overlay"), "first").unwrap();
        planner.add_dir(Path::new("/run/overlay"), "second").unwrap();
        let entry = &planner.entries[Path::new("/run/overlay")];
        assert_eq!(entry.mode, Mode::EnsureDir);
    }

    #[test]
    fn is_visible_hidden_by_default()
    {
        let planner = ExportsPlanner::new(HostRoot::real());
        assert_eq!(planner.is_visible(Path::new("/run/nothing")), Visibility::Hidden);
    }

    #[test]
    fn is_visible_reflects_tmpfs_then_dir_fallthrough()
    {
        let mut planner = ExportsPlanner::new(HostRoot::real());
        planner.add_tmpfs(Path::new("/run/a"), "test").unwrap();
        planner.add_dir(Path::new("/run/a/b"), "test").unwrap();
        assert_eq!(planner.is_visible(Path::new("/run/a/b/c")), Visibility::Hidden);
    }
}
