//! The fixed set of host paths the container owns and refuses to
//! expose from outside (spec.md §6.1).
//!
//! A caller asking to expose `/usr` directly is refused because `/usr`
//! is itself reserved; a caller asking to expose `/` is *also* refused,
//! even though `/` is not itself in the reserved table, because
//! exposing it would transitively expose every reserved path beneath
//! it. [`is_reserved`] checks both directions.

#![warn(missing_docs)]

use std::path::{Path, PathBuf};

/// The paths the container owns, in the fixed order given by the spec.
///
/// This order has no behavioral significance; it is kept stable purely
/// so that diffs against the documented table stay easy to review.
pub const RESERVED: &[&str] = &[
    "/.flatpak-info",
    "/app",
    "/bin",
    "/dev",
    "/etc",
    "/overrides",
    "/lib",
    "/lib32",
    "/lib64",
    "/proc",
    "/run/flatpak",
    "/run/gfx",
    "/run/host",
    "/run/interpreter-host",
    "/run/parent",
    "/run/pressure-vessel",
    "/sbin",
    "/usr",
    "/var/pressure-vessel",
    "/var/cache/ldconfig",
];

/// Whether `path` is reserved: either it lies inside (or is exactly) a
/// reserved path, or it is an ancestor of one.
///
/// Both directions matter. Asking to expose `/usr/lib/foo` is refused
/// because it is inside the reserved `/usr`. Asking to expose `/` or
/// `/var` is refused because doing so would also expose `/usr` (or
/// `/var/cache/ldconfig`) as a side effect.
///
/// Comparison is component-wise (via [`Path::starts_with`]), not a
/// string prefix check, so `/usrx` does not match the reserved `/usr`.
pub fn is_reserved(path: &Path) -> bool
{
    RESERVED.iter().map(Path::new).any(|reserved| {
        path.starts_with(reserved) || reserved.starts_with(path)
    })
}

/// A copy of the reserved-path table as owned [`PathBuf`]s.
pub fn get_reserved() -> Vec<PathBuf>
{
    RESERVED.iter().map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn exact_reserved_path_is_reserved()
    {
        assert!(is_reserved(Path::new("/usr")));
        assert!(is_reserved(Path::new("/var/cache/ldconfig")));
    }

    #[test]
    fn path_inside_reserved_is_reserved()
    {
        assert!(is_reserved(Path::new("/usr/lib/x86_64-linux-gnu")));
        assert!(is_reserved(Path::new("/run/host/nvidia")));
    }

    #[test]
    fn ancestor_of_reserved_is_reserved()
    {
        assert!(is_reserved(Path::new("/")));
        assert!(is_reserved(Path::new("/var")));
        assert!(is_reserved(Path::new("/run")));
    }

    #[test]
    fn unrelated_path_is_not_reserved()
    {
        assert!(!is_reserved(Path::new("/usrx")));
        assert!(!is_reserved(Path::new("/home/user")));
        assert!(!is_reserved(Path::new("/run/media")));
    }

    #[test]
    fn get_reserved_matches_table_len()
    {
        assert_eq!(get_reserved().len(), RESERVED.len());
    }
}
