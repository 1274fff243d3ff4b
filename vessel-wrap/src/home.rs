//! Home-directory mode resolution (spec.md §4.5 step 3).

use std::path::{Path, PathBuf};

/// Which home directory the guest sees.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HomeMode
{
    /// The caller's real `$HOME`, exposed read-write as-is.
    Shared(PathBuf),
    /// A private, per-launcher subdirectory (e.g. `~/.var/app/<id>`),
    /// exposed in place of the real home.
    Private(PathBuf),
    /// A fresh tmpfs; nothing from the host is exposed at `/home/...`.
    Transient,
}

impl HomeMode
{
    /// The path that should be bind-mounted (or created as a tmpfs
    /// directory) as the guest's home, if any host path is involved.
    pub fn host_path(&self) -> Option<&Path>
    {
        match self {
            HomeMode::Shared(path) | HomeMode::Private(path) => Some(path),
            HomeMode::Transient => None,
        }
    }
}

/// Resolve the private-home path for a given launcher id, rooted at
/// the caller's real home directory (e.g. `~/.var/app/<id>`).
pub fn private_home_path(real_home: &Path, launcher_id: &str) -> PathBuf
{
    real_home.join(".var/app").join(launcher_id)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn private_home_is_namespaced_under_var_app()
    {
        let path = private_home_path(Path::new("/home/me"), "org.example.App");
        assert_eq!(path, PathBuf::from("/home/me/.var/app/org.example.App"));
    }

    #[test]
    fn transient_has_no_host_path()
    {
        assert_eq!(HomeMode::Transient.host_path(), None);
    }
}
