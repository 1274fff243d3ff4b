//! Preload module classification and dispatch (spec.md §4.3).
//!
//! A caller-supplied `LD_AUDIT`/`LD_PRELOAD` entry is first checked
//! against a small table of special cases, then [`classify::classify`]d
//! into one of `BASENAME`/`ABSOLUTE_PLAIN`/`ABI_DEPENDENT`/
//! `DYNAMIC_UNKNOWN`/`INVALID`, and finally dispatched to the matching
//! function in [`dispatch`], which produces the in-container entries
//! the Adverb should set and any host paths the exports planner must
//! expose for them to resolve.

#![warn(missing_docs)]

use vessel_core::{Architecture, RuntimeProvider};

pub use self::{
    classify::Classification,
    dispatch::{HostLibraryResolver, Outcome},
    special::SpecialCase,
};

pub mod classify;
pub mod dispatch;
pub mod special;

/// Which environment variable a preload request came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VariableKind
{
    /// `LD_AUDIT`.
    Audit,
    /// `LD_PRELOAD`.
    Preload,
}

/// A single caller-supplied preload module request (spec.md §3, "Preload
/// module request").
#[derive(Clone, Debug)]
pub struct Request
{
    /// Which variable this entry is destined for.
    pub kind: VariableKind,
    /// The literal exactly as given by the caller.
    pub literal: String,
    /// An explicit architecture to dispatch for, from an `:abi=<tuple>`
    /// suffix on the command line, overriding the default of trying
    /// every known architecture.
    pub abi_hint: Option<Architecture>,
}

/// The final outcome of processing one [`Request`]: either it was
/// dropped (special case or invalid literal, with a reason to log), or
/// it dispatched to zero or more in-container entries.
#[derive(Clone, Debug)]
pub enum Processed
{
    /// The entry was dropped before or during classification.
    Dropped(&'static str),
    /// The entry dispatched successfully, possibly to zero entries
    /// (e.g. an ABI-dependent template that resolved on no
    /// architecture).
    Dispatched(Outcome),
}

/// Process one preload [`Request`] end to end: special cases,
/// classification, then dispatch.
pub fn process(
    request: &Request,
    under_flatpak: bool,
    remove_overlay: bool,
    runtime: &dyn RuntimeProvider,
    host_resolver: &dyn HostLibraryResolver,
) -> Processed
{
    if let SpecialCase::Drop(reason) = special::check(&request.literal, remove_overlay) {
        return Processed::Dropped(reason);
    }

    match classify::classify(&request.literal) {
        Classification::Invalid => Processed::Dropped("empty or malformed preload entry"),

        Classification::Basename => Processed::Dispatched(dispatch::basename(
            &request.literal,
            request.abi_hint,
            runtime,
            host_resolver,
        )),

        Classification::AbiDependent => Processed::Dispatched(dispatch::abi_dependent(
            &request.literal,
            request.abi_hint,
            runtime,
        )),

        Classification::AbsolutePlain =>
            Processed::Dispatched(dispatch::absolute_plain(&request.literal, under_flatpak)),

        Classification::DynamicUnknown =>
            Processed::Dispatched(dispatch::dynamic_unknown(&request.literal)),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::path::{Path, PathBuf};

    struct FakeRuntime;

    impl RuntimeProvider for FakeRuntime
    {
        fn has_library(&self, _basename: &str) -> bool { false }
        fn overrides_dir(&self) -> &Path { Path::new("/overrides") }
        fn modified_usr(&self) -> &Path { Path::new("/usr") }
        fn modified_app(&self) -> Option<&Path> { None }
        fn adverb_args(&self, _bwrap_argv: &mut Vec<String>) {}
        fn resolve_abi_dependent(&self, _template: &str, _arch: &Architecture)
            -> Option<PathBuf>
        {
            None
        }
    }

    struct FakeHostResolver;

    impl HostLibraryResolver for FakeHostResolver
    {
        fn resolve(&self, _basename: &str, _arch: &Architecture) -> Option<PathBuf>
        {
            None
        }
    }

    #[test]
    fn gtk3_nocsd_is_dropped_before_classification()
    {
        let request = Request{
            kind:     VariableKind::Preload,
            literal:  "gtk3-nocsd".to_string(),
            abi_hint: None,
        };

        let outcome = process(&request, false, false, &FakeRuntime, &FakeHostResolver);
        assert!(matches!(outcome, Processed::Dropped(_)));
    }

    #[test]
    fn invalid_literal_is_dropped()
    {
        let request = Request{
            kind:     VariableKind::Audit,
            literal:  String::new(),
            abi_hint: None,
        };

        let outcome = process(&request, false, false, &FakeRuntime, &FakeHostResolver);
        assert!(matches!(outcome, Processed::Dropped(_)));
    }

    #[test]
    fn absolute_plain_dispatches()
    {
        let request = Request{
            kind:     VariableKind::Preload,
            literal:  "/opt/mod.so".to_string(),
            abi_hint: None,
        };

        let outcome = process(&request, false, false, &FakeRuntime, &FakeHostResolver);
        match outcome {
            Processed::Dispatched(outcome) => assert_eq!(outcome.entries, vec!["/opt/mod.so"]),
            Processed::Dropped(reason) => panic!("unexpectedly dropped: {reason}"),
        }
    }
}
