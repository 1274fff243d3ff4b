//! Per-classification dispatch (spec.md §4.3a-d).

use std::path::{Path, PathBuf};

use vessel_core::{arch::ARCHITECTURES, Architecture, RuntimeProvider};

/// Resolves a library basename against the host's own dynamic-linker
/// search path, in the host ABI, for a given architecture.
///
/// This is a distinct collaborator from [`RuntimeProvider`]: basename
/// fallback resolution (`spec.md` §4.3a) consults the *host's* library
/// set, not the runtime's, when the runtime doesn't already ship a
/// same-named library.
pub trait HostLibraryResolver
{
    /// Resolve `basename` for `arch`, returning its absolute host path
    /// if the host's library search path contains one.
    fn resolve(&self, basename: &str, arch: &Architecture) -> Option<PathBuf>;
}

/// The result of dispatching one preload request: the in-container
/// literal(s) it expands to, and any host paths that must be exported
/// for those literals to resolve.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outcome
{
    /// Zero or more in-container `LD_AUDIT`/`LD_PRELOAD` entries.
    pub entries: Vec<String>,
    /// Host paths the exports planner must expose for `entries` to
    /// resolve inside the container.
    pub exports: Vec<PathBuf>,
}

impl Outcome
{
    fn one(entry: String) -> Self
    {
        Self{ entries: vec![entry], exports: vec![] }
    }
}

/// The architectures to try for a request, honoring an explicit ABI
/// hint if the caller supplied one.
fn archs_for(abi_hint: Option<Architecture>) -> Vec<Architecture>
{
    match abi_hint {
        Some(arch) => vec![arch],
        None       => ARCHITECTURES.to_vec(),
    }
}

/// §4.3a: dispatch a BASENAME entry.
pub fn basename(
    literal: &str,
    abi_hint: Option<Architecture>,
    runtime: &dyn RuntimeProvider,
    host_resolver: &dyn HostLibraryResolver,
) -> Outcome
{
    if runtime.has_library(literal) {
        return Outcome::one(literal.to_string());
    }

    let mut outcome = Outcome::default();

    for arch in archs_for(abi_hint) {
        if let Some(resolved) = host_resolver.resolve(literal, &arch) {
            outcome.entries.push(format!("{literal}:abi={}", arch.tuple));
            if let Some(parent) = resolved.parent() {
                outcome.exports.push(parent.to_path_buf());
            }
        }
    }

    outcome
}

/// §4.3b: dispatch an ABI_DEPENDENT entry.
pub fn abi_dependent(
    literal: &str,
    abi_hint: Option<Architecture>,
    runtime: &dyn RuntimeProvider,
) -> Outcome
{
    let mut outcome = Outcome::default();

    for arch in archs_for(abi_hint) {
        if let Some(resolved) = runtime.resolve_abi_dependent(literal, &arch) {
            outcome.entries.push(format!("{literal}:abi={}", arch.tuple));
            if let Some(parent) = resolved.parent() {
                outcome.exports.push(parent.to_path_buf());
            }
        }
    }

    outcome
}

/// The host path prefixes that get remounted under a container prefix,
/// and which prefix each maps to (`spec.md` §4.3c).
const REMOUNTED_PREFIXES: &[&str] = &["/usr", "/lib", "/lib32", "/lib64"];

/// Does `path` lie at or under `prefix`?
fn under_prefix(path: &str, prefix: &str) -> bool
{
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// The container prefix `path` should be rewritten under, if any.
/// `under_flatpak` is whether the launcher is itself running nested
/// inside a Flatpak sandbox, making `/app` a remounted prefix too.
fn container_prefix_for(path: &str, under_flatpak: bool) -> Option<&'static str>
{
    if REMOUNTED_PREFIXES.iter().any(|prefix| under_prefix(path, prefix)) {
        return Some("/run/host");
    }

    if under_flatpak && under_prefix(path, "/app") {
        return Some("/run/parent");
    }

    None
}

/// §4.3c: dispatch an ABSOLUTE_PLAIN entry.
pub fn absolute_plain(literal: &str, under_flatpak: bool) -> Outcome
{
    match container_prefix_for(literal, under_flatpak) {
        Some(prefix) => Outcome{
            entries: vec![format!("{prefix}{literal}")],
            exports: vec![PathBuf::from(literal)],
        },
        None => Outcome::one(literal.to_string()),
    }
}

/// §4.3d: dispatch a DYNAMIC_UNKNOWN entry.
///
/// The literal is passed through verbatim; if it is absolute, the
/// ancestor directory up to the rightmost `/` before the first `$` is
/// exported so the container's own expansion of the token has
/// somewhere to look. This is a heuristic, not a guarantee: a token
/// that is the first path component (`$ORIGIN/lib.so`) yields no
/// ancestor to export (open question, see DESIGN.md).
pub fn dynamic_unknown(literal: &str) -> Outcome
{
    let mut exports = Vec::new();

    if literal.starts_with('/') {
        if let Some(dollar) = literal.find('$') {
            if let Some(slash) = literal[.. dollar].rfind('/') {
                let ancestor = &literal[.. slash];
                let ancestor = if ancestor.is_empty() { "/" } else { ancestor };
                exports.push(PathBuf::from(ancestor));
            }
        }
    }

    Outcome{ entries: vec![literal.to_string()], exports }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use vessel_core::arch::{I386, X86_64};

    struct FakeRuntime
    {
        libraries: Vec<&'static str>,
    }

    impl RuntimeProvider for FakeRuntime
    {
        fn has_library(&self, basename: &str) -> bool
        {
            self.libraries.contains(&basename)
        }

        fn overrides_dir(&self) -> &Path { Path::new("/overrides") }

        fn modified_usr(&self) -> &Path { Path::new("/usr") }

        fn modified_app(&self) -> Option<&Path> { None }

        fn adverb_args(&self, _bwrap_argv: &mut Vec<String>) {}

        fn resolve_abi_dependent(&self, template: &str, arch: &Architecture)
            -> Option<PathBuf>
        {
            if template.contains("$LIB") {
                Some(PathBuf::from(arch.lib).join("known.so"))
            } else {
                None
            }
        }
    }

    struct FakeHostResolver;

    impl HostLibraryResolver for FakeHostResolver
    {
        fn resolve(&self, basename: &str, arch: &Architecture) -> Option<PathBuf>
        {
            if basename == "libMangoHud.so" {
                Some(PathBuf::from(arch.lib).join(basename))
            } else {
                None
            }
        }
    }

    #[test]
    fn basename_present_in_runtime_passes_through()
    {
        let runtime = FakeRuntime{ libraries: vec!["libgallium.so"] };
        let outcome = basename("libgallium.so", None, &runtime, &FakeHostResolver);
        assert_eq!(outcome.entries, vec!["libgallium.so"]);
        assert!(outcome.exports.is_empty());
    }

    #[test]
    fn basename_splits_per_architecture_when_absent()
    {
        let runtime = FakeRuntime{ libraries: vec![] };
        let outcome = basename("libMangoHud.so", None, &runtime, &FakeHostResolver);
        assert_eq!(outcome.entries.len(), 2);
        assert!(outcome.entries.iter().any(|e| e == "libMangoHud.so:abi=x86_64-linux-gnu"));
        assert!(outcome.entries.iter().any(|e| e == "libMangoHud.so:abi=i386-linux-gnu"));
        assert_eq!(outcome.exports.len(), 2);
    }

    #[test]
    fn basename_honors_abi_hint()
    {
        let runtime = FakeRuntime{ libraries: vec![] };
        let outcome = basename("libMangoHud.so", Some(I386), &runtime, &FakeHostResolver);
        assert_eq!(outcome.entries, vec!["libMangoHud.so:abi=i386-linux-gnu"]);
    }

    #[test]
    fn abi_dependent_resolves_per_arch()
    {
        let runtime = FakeRuntime{ libraries: vec![] };
        let outcome = abi_dependent("/opt/$LIB/mod.so", None, &runtime);
        assert_eq!(outcome.entries.len(), 2);
    }

    #[test]
    fn abi_dependent_yields_nothing_on_no_match()
    {
        let runtime = FakeRuntime{ libraries: vec![] };
        let outcome = abi_dependent("/opt/${PLATFORM}/mod.so", None, &runtime);
        assert!(outcome.entries.is_empty());
        assert!(outcome.exports.is_empty());
    }

    #[test]
    fn absolute_plain_rewrites_usr_and_exports()
    {
        let outcome = absolute_plain("/usr/lib/mod.so", false);
        assert_eq!(outcome.entries, vec!["/run/host/usr/lib/mod.so"]);
        assert_eq!(outcome.exports, vec![PathBuf::from("/usr/lib/mod.so")]);
    }

    #[test]
    fn absolute_plain_rewrites_app_only_under_flatpak()
    {
        let outside = absolute_plain("/app/lib/mod.so", false);
        assert_eq!(outside.entries, vec!["/app/lib/mod.so"]);

        let inside = absolute_plain("/app/lib/mod.so", true);
        assert_eq!(inside.entries, vec!["/run/parent/app/lib/mod.so"]);
    }

    #[test]
    fn absolute_plain_passes_through_unrelated_paths()
    {
        let outcome = absolute_plain("/opt/mod.so", false);
        assert_eq!(outcome.entries, vec!["/opt/mod.so"]);
        assert!(outcome.exports.is_empty());
    }

    #[test]
    fn dynamic_unknown_exports_ancestor_of_token()
    {
        let outcome = dynamic_unknown("/opt/game/$ORIGIN/../lib/mod.so");
        assert_eq!(outcome.entries, vec!["/opt/game/$ORIGIN/../lib/mod.so"]);
        assert_eq!(outcome.exports, vec![PathBuf::from("/opt/game")]);
    }

    #[test]
    fn dynamic_unknown_leading_token_exports_nothing()
    {
        let outcome = dynamic_unknown("$ORIGIN/mod.so");
        assert!(outcome.exports.is_empty());
    }
}
