//! The error vocabulary shared by the exports planner, the preload
//! classifier, and the Adverb/Wrap supervisors (spec.md §7).
//!
//! Each variant here names one of the documented error kinds and
//! carries just enough context to produce both the log line and the
//! process exit status the kind implies. What happens to an error of a
//! given kind (dropped with an info log, warned once, or fatal with a
//! specific exit code) is a policy decision made by the caller, not by
//! this enum; see [`Kind::severity`].

use std::path::PathBuf;
use thiserror::Error;

/// An error produced while planning or carrying out a container launch.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error
{
    #[error("usage error: {0}")]
    Usage(String),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("refusing to expose reserved path: {0}")]
    ReservedPath(PathBuf),

    #[error("blocked by autofs mount: {0}")]
    AutofsBlocked(PathBuf),

    #[error("symlink loop while resolving: {0}")]
    Loop(PathBuf),

    #[error("ldconfig failed: {0}")]
    LdconfigFailed(String),

    #[error("locale generation failed: {0}")]
    LocaleGenFailed(String),

    #[error("failed to spawn child process: {0}")]
    ChildSpawnFailed(String),

    #[error("child process was killed by signal {0}")]
    ChildSignalled(i32),

    #[error("unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

/// Result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller should react to an [`Error`], per spec.md §7's error
/// handling table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity
{
    /// Log at info level and drop the offending item; processing
    /// continues.
    Info,

    /// Log a warning the first time; subsequent occurrences of the
    /// same condition are logged at info level instead (tracked via a
    /// caller-owned "already-warned" set, see
    /// [`crate::AlreadyWarned`]).
    WarnOnce,

    /// Log a warning and fall back to documented default behavior.
    Warn,

    /// Fatal; the process exits with the given status.
    Fatal(i32),
}

impl Error
{
    /// This error's documented severity and, for fatal kinds, exit
    /// status.
    pub fn severity(&self) -> Severity
    {
        match self {
            Error::Usage(_)            => Severity::Fatal(64),
            Error::Setup(_)            => Severity::Fatal(69),
            Error::PathNotFound(_)     => Severity::Info,
            Error::PermissionDenied(_) => Severity::Info,
            Error::ReservedPath(_)     => Severity::WarnOnce,
            Error::AutofsBlocked(_)    => Severity::Info,
            Error::Loop(_)             => Severity::Info,
            Error::LdconfigFailed(_)   => Severity::Warn,
            Error::LocaleGenFailed(_)  => Severity::Warn,
            Error::ChildSpawnFailed(_) => Severity::Fatal(127),
            Error::ChildSignalled(n)   => Severity::Fatal(128 + n),
            Error::Unexpected(_)       => Severity::Fatal(1),
        }
    }
}

/// The set of paths that have already produced a user-visible warning,
/// so that subsequent rejections of the same path are demoted to info
/// level (spec.md §7, `ReservedPath`).
#[derive(Debug, Default)]
pub struct AlreadyWarned(std::collections::HashSet<PathBuf>);

impl AlreadyWarned
{
    /// Construct an empty set.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record that `path` has now produced a warning, returning `true`
    /// if this is the first time (the caller should log at warn level)
    /// or `false` if it has been seen before (log at info level).
    pub fn warn_once(&mut self, path: &std::path::Path) -> bool
    {
        self.0.insert(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn severities_match_spec_table()
    {
        assert_eq!(Error::Usage("x".into()).severity(), Severity::Fatal(64));
        assert_eq!(Error::Setup("x".into()).severity(), Severity::Fatal(69));
        assert_eq!(
            Error::PathNotFound("/a".into()).severity(),
            Severity::Info,
        );
        assert_eq!(
            Error::ReservedPath("/usr".into()).severity(),
            Severity::WarnOnce,
        );
        assert_eq!(
            Error::ChildSpawnFailed("x".into()).severity(),
            Severity::Fatal(127),
        );
        assert_eq!(Error::ChildSignalled(9).severity(), Severity::Fatal(137));
    }

    #[test]
    fn already_warned_warns_once()
    {
        let mut warned = AlreadyWarned::new();
        let path = std::path::Path::new("/usr");

        assert!(warned.warn_once(path));
        assert!(!warned.warn_once(path));
    }
}
