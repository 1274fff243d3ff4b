//! The visibility mode of an export entry and its promotion order.

/// How a path is made visible inside the container.
///
/// Declaration order is the promotion order from spec.md §3:
/// `TMPFS_MASK < ENSURE_DIR < SYMLINK < READ_ONLY < READ_WRITE`. When
/// two requests name the same path, the entry keeps the higher of the
/// two modes.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Mode
{
    /// Replace the subtree with an empty writable tmpfs.
    TmpfsMask,
    /// Ensure the path exists as a directory; no content is mounted.
    EnsureDir,
    /// Create a symbolic link mirroring one found on the host.
    Symlink,
    /// Bind-mount the host subtree read-only.
    ReadOnly,
    /// Bind-mount the host subtree read-write.
    ReadWrite,
}

#[cfg(test)]
mod tests
{
    use super::Mode::*;

    #[test]
    fn promotion_order()
    {
        assert!(TmpfsMask < EnsureDir);
        assert!(EnsureDir < Symlink);
        assert!(Symlink < ReadOnly);
        assert!(ReadOnly < ReadWrite);
    }

    #[test]
    fn max_promotes()
    {
        assert_eq!(ReadOnly.max(ReadWrite), ReadWrite);
        assert_eq!(TmpfsMask.max(EnsureDir), EnsureDir);
    }
}
