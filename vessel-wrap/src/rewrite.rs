//! Rewriting host paths when the Wrap supervisor is itself sandboxed
//! (spec.md §4.5 step 5).
//!
//! An outer application sandbox exposes the real host filesystem to the
//! Wrap supervisor at predictable, relocated mount points rather than
//! at its real path: a private per-app directory lands at
//! `~/.var/app/$ID/...`, and the rest of the host is visible read-only
//! under `/run/host/...`. Paths the Exports planner collected by
//! reading environment variables or `/proc` describe the real host
//! layout, so before they reach the container-helper argv they must be
//! translated back to paths the kernel can resolve from inside this
//! sandboxed process.

use std::path::{Path, PathBuf};

/// One relocation rule: a prefix as seen from inside the outer sandbox,
/// and the real host-side prefix it stands in for.
#[derive(Clone, Debug)]
pub struct Relocation
{
    /// Prefix as observed by this (sandboxed) process.
    pub sandboxed_prefix: PathBuf,
    /// The same location's real path on the host.
    pub real_prefix: PathBuf,
}

impl Relocation
{
    /// The relocation for a Flatpak-style private app directory.
    pub fn private_app(app_id: &str, real_home: &Path) -> Self
    {
        Self{
            sandboxed_prefix: PathBuf::from(format!("/home/{app_id}/.var/app/{app_id}")),
            real_prefix: real_home.join(".var/app").join(app_id),
        }
    }

    /// The relocation for the outer sandbox's read-only host view.
    pub fn run_host() -> Self
    {
        Self{
            sandboxed_prefix: PathBuf::from("/run/host"),
            real_prefix: PathBuf::from("/"),
        }
    }
}

/// Rewrite `path` against the first matching relocation, returning the
/// real host-side path. Paths matching none of `relocations` are
/// returned unchanged.
pub fn rewrite(path: &Path, relocations: &[Relocation]) -> PathBuf
{
    for relocation in relocations {
        if let Ok(suffix) = path.strip_prefix(&relocation.sandboxed_prefix) {
            return relocation.real_prefix.join(suffix);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn rewrites_run_host_prefix()
    {
        let relocations = vec![Relocation::run_host()];
        let rewritten = rewrite(Path::new("/run/host/usr/lib"), &relocations);
        assert_eq!(rewritten, PathBuf::from("/usr/lib"));
    }

    #[test]
    fn rewrites_private_app_prefix()
    {
        let relocations = vec![Relocation::private_app("org.example.App", Path::new("/home/me"))];
        let rewritten = rewrite(
            Path::new("/home/org.example.App/.var/app/org.example.App/config"),
            &relocations,
        );
        assert_eq!(rewritten, PathBuf::from("/home/me/.var/app/org.example.App/config"));
    }

    #[test]
    fn leaves_unmatched_paths_untouched()
    {
        let relocations = vec![Relocation::run_host()];
        let rewritten = rewrite(Path::new("/tmp/.X11-unix"), &relocations);
        assert_eq!(rewritten, PathBuf::from("/tmp/.X11-unix"));
    }
}
