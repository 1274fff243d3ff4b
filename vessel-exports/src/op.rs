//! The mount-operation stream produced by [`crate::ExportsPlanner::finalize`].

use std::path::PathBuf;

/// One operation against the container's filesystem view.
///
/// This is the planner's output format: a flat, ordered sequence that
/// the Wrap supervisor turns into a container-helper argument vector
/// (`--ro-bind`, `--bind`, `--tmpfs`, `--dir`, `--symlink`, ...).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Op
{
    /// Bind-mount `source` (on the host) at `target` (in the container).
    Bind
    {
        /// Whether the mount is read-only.
        ro: bool,
        /// The host path being exposed.
        source: PathBuf,
        /// Where it appears in the container.
        target: PathBuf,
    },

    /// Replace `target` with an empty writable tmpfs.
    Tmpfs
    {
        /// Where the tmpfs is mounted in the container.
        target: PathBuf,
    },

    /// Ensure `target` exists as a directory in the container.
    Dir
    {
        /// The directory to create.
        target: PathBuf,
    },

    /// Create a symbolic link at `target` pointing to `relative_target`,
    /// mirroring a link found on the host.
    Symlink
    {
        /// Where the link is created in the container.
        target: PathBuf,
        /// The link's contents, exactly as read from the host.
        relative_target: PathBuf,
    },
}

impl Op
{
    /// The container-side path this operation concerns, used to sort
    /// the finalized op stream deterministically by path string.
    pub fn target(&self) -> &PathBuf
    {
        match self {
            Op::Bind{target, ..}    => target,
            Op::Tmpfs{target}       => target,
            Op::Dir{target}        => target,
            Op::Symlink{target, ..} => target,
        }
    }
}
