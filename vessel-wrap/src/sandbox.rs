//! Detecting the environment the Wrap supervisor itself is running in
//! (spec.md §4.5 steps 1-2).

use std::path::{Path, PathBuf};

use vessel_core::HostRoot;

/// Is `/.flatpak-info` present, meaning we're already inside an
/// application sandbox and must route through its subsandbox RPC
/// instead of calling the container helper directly?
pub fn is_flatpak_sandboxed(host_root: &HostRoot) -> bool
{
    host_root.exists(Path::new("/.flatpak-info"))
}

/// Where a binary translator's overlay rootfs lives, if the Wrap
/// supervisor is running under one (detected by the presence of a
/// known marker file at its root).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Translator
{
    /// Root of the translator's overlay view.
    pub rootfs: PathBuf,
    /// The real, untranslated root, for paths that must bypass the
    /// overlay (e.g. mounting the graphics driver stack).
    pub real_root: PathBuf,
}

const TRANSLATOR_MARKER: &str = "/run/translator-rootfs";

/// Detect a translator rootfs via [`TRANSLATOR_MARKER`].
pub fn detect_translator(host_root: &HostRoot) -> Option<Translator>
{
    if !host_root.exists(Path::new(TRANSLATOR_MARKER)) {
        return None;
    }

    Some(Translator{
        rootfs: PathBuf::from(TRANSLATOR_MARKER),
        real_root: PathBuf::from("/"),
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn flatpak_info_absent_by_default()
    {
        let dir = os_ext::mkdtemp(os_ext::cstr!("/tmp/vessel-wrap-test-XXXXXX").to_owned()).unwrap();
        let dir = PathBuf::from(dir.to_str().unwrap().to_string());
        let host_root = HostRoot::open_mock_dir(&dir).unwrap();
        assert!(!is_flatpak_sandboxed(&host_root));
        assert!(detect_translator(&host_root).is_none());
    }
}
