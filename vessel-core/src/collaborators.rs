//! Interfaces to components that live outside the core (spec.md §6.3).
//!
//! Runtime provisioning, graphics driver selection, the container helper
//! binary, and the X-server identification helper are all out of scope
//! for this crate. What *is* in scope is the shape of the interface the
//! core calls through to reach them, so that the exports planner and the
//! preload classifier can be written, and tested with fakes, without
//! waiting on those other components to exist.

use std::path::{Path, PathBuf};

use crate::arch::Architecture;

/// The runtime-provisioning collaborator (spec.md §6.3, first bullet).
///
/// Implementations of this trait own a particular Steam Linux Runtime
/// (or similar) tree and answer questions the exports planner and the
/// preload classifier need about it: whether a library is already
/// present, where the writable overrides and modified `/usr`/`/app`
/// trees live, and how to extend a container helper invocation so the
/// Adverb can regenerate the linker cache inside the container.
pub trait RuntimeProvider
{
    /// Does the runtime already ship a library with this basename,
    /// for every known architecture it supports? `spec.md` §4.3a calls
    /// this before falling back to host library-search-path resolution.
    fn has_library(&self, basename: &str) -> bool;

    /// The directory the Adverb overlays on top of the runtime's own
    /// libraries (read-write, host-provided overrides).
    fn overrides_dir(&self) -> &Path;

    /// The runtime's modified `/usr`, bind-mounted read-only into the
    /// container at `/usr`.
    fn modified_usr(&self) -> &Path;

    /// The modified `/app` tree, if the runtime provides one (it does
    /// not when running outside of an app-specific runtime pin).
    fn modified_app(&self) -> Option<&Path>;

    /// Append whatever arguments the Adverb needs, appended to a
    /// container-helper argv under construction, in order to regenerate
    /// the dynamic linker cache once inside the container.
    fn adverb_args(&self, bwrap_argv: &mut Vec<String>);

    /// Resolve an ABI-dependent preload module template against this
    /// runtime's own library scanner (`spec.md` §4.3b), substituting
    /// `$LIB`/`$PLATFORM` however the runtime's own layout requires and
    /// returning the resolved, existing path for `arch`, if any.
    fn resolve_abi_dependent(&self, template: &str, arch: &Architecture)
        -> Option<PathBuf>;
}

/// The graphics-provider collaborator (spec.md §6.3, second bullet).
///
/// Exposes exactly one host path; the Wrap supervisor decides, based on
/// whether it is running nested inside a translator rootfs, which of
/// `/run/host`, `/run/gfx`, or a translator-relative path it is
/// bind-mounted at.
pub trait GraphicsProvider
{
    /// The host path containing the selected graphics driver stack.
    fn driver_path(&self) -> &Path;
}

/// Where a [`GraphicsProvider`]'s path should be bind-mounted, as
/// decided by the Wrap supervisor rather than the provider itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GraphicsMountPoint
{
    /// Mounted at `/run/host`, the common case.
    RunHost,
    /// Mounted at `/run/gfx`, used when `/run/host` is already claimed
    /// by an outer sandbox's own host mount.
    RunGfx,
    /// Mounted inside a translator rootfs at the given relative path.
    TranslatorRootfs(PathBuf),
}

#[cfg(test)]
mod tests
{
    use super::*;

    struct FakeRuntime
    {
        libraries: Vec<String>,
        overrides: PathBuf,
        usr: PathBuf,
    }

    impl RuntimeProvider for FakeRuntime
    {
        fn has_library(&self, basename: &str) -> bool
        {
            self.libraries.iter().any(|lib| lib == basename)
        }

        fn overrides_dir(&self) -> &Path { &self.overrides }

        fn modified_usr(&self) -> &Path { &self.usr }

        fn modified_app(&self) -> Option<&Path> { None }

        fn adverb_args(&self, bwrap_argv: &mut Vec<String>)
        {
            bwrap_argv.push("--ro-bind".into());
            bwrap_argv.push(self.overrides.display().to_string());
            bwrap_argv.push("/overrides".into());
        }

        fn resolve_abi_dependent(&self, template: &str, arch: &Architecture)
            -> Option<PathBuf>
        {
            if template.contains("$LIB") {
                Some(self.usr.join(&arch.lib).join("known.so"))
            } else {
                None
            }
        }
    }

    #[test]
    fn fake_runtime_has_library()
    {
        let runtime = FakeRuntime{
            libraries: vec!["libgallium.so".into()],
            overrides: PathBuf::from("/tmp/overrides"),
            usr:       PathBuf::from("/tmp/usr"),
        };

        assert!(runtime.has_library("libgallium.so"));
        assert!(!runtime.has_library("libmissing.so"));
        assert!(runtime.modified_app().is_none());
    }

    #[test]
    fn fake_runtime_adverb_args()
    {
        let runtime = FakeRuntime{
            libraries: vec![],
            overrides: PathBuf::from("/tmp/overrides"),
            usr:       PathBuf::from("/tmp/usr"),
        };

        let mut argv = vec![];
        runtime.adverb_args(&mut argv);
        assert_eq!(argv, vec!["--ro-bind", "/tmp/overrides", "/overrides"]);
    }
}
