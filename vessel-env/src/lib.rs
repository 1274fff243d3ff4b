//! A layered environment overlay (spec.md §4.6).
//!
//! An [`EnvOverlay`] records `set`/`unset`/`inherit` operations against
//! variable names. `inherit` is resolved late, against whatever base
//! environment [`EnvOverlay::apply`] is given, so the same overlay can
//! be built once by the Wrap supervisor and then applied against either
//! the outer process's own environment or a stripped-down one handed
//! back by a setuid container helper.

#![warn(missing_docs)]

use std::collections::BTreeMap;

use thiserror::Error;

/// What an overlay does to one variable name.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Action
{
    Set(String),
    Unset,
    Inherit,
}

/// Errors constructing or applying an [`EnvOverlay`].
#[derive(Debug, Error)]
pub enum Error
{
    /// The variable name contains `=` or a NUL byte, either of which
    /// would corrupt a `NAME=VALUE` record.
    #[error("invalid environment variable name: {0:?}")]
    InvalidName(String),
}

/// Result type for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

fn validate_name(name: &str) -> Result<()>
{
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A layered mapping of environment variable operations.
///
/// Operations are stored per name, so setting, unsetting, or inheriting
/// the same name twice simply replaces the earlier operation: within
/// one overlay, the last call wins. [`EnvOverlay::layer`] composes
/// several overlays the same way, one whole overlay at a time.
#[derive(Clone, Debug, Default)]
pub struct EnvOverlay
{
    ops: BTreeMap<String, Action>,
}

impl EnvOverlay
{
    /// An overlay with no operations.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record that `name` should be set to `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()>
    {
        let name = name.into();
        validate_name(&name)?;
        self.ops.insert(name, Action::Set(value.into()));
        Ok(())
    }

    /// Record that `name` should be removed from the environment.
    pub fn unset(&mut self, name: impl Into<String>) -> Result<()>
    {
        let name = name.into();
        validate_name(&name)?;
        self.ops.insert(name, Action::Unset);
        Ok(())
    }

    /// Record that `name` should take whatever value the base
    /// environment gives it at [`EnvOverlay::apply`] time (or be
    /// removed, if the base environment doesn't have it either).
    pub fn inherit(&mut self, name: impl Into<String>) -> Result<()>
    {
        let name = name.into();
        validate_name(&name)?;
        self.ops.insert(name, Action::Inherit);
        Ok(())
    }

    /// Does this overlay record any operation for `name`?
    pub fn contains(&self, name: &str) -> bool
    {
        self.ops.contains_key(name)
    }

    /// The literal value this overlay would set `name` to, if it
    /// records a `set` for it. Returns `None` for an unset, inherited,
    /// or unmentioned name — `inherit` has no value until applied.
    pub fn get(&self, name: &str) -> Option<&str>
    {
        match self.ops.get(name) {
            Some(Action::Set(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Merge `other`'s operations on top of this overlay's, so that
    /// `other`'s operations win wherever both mention the same name.
    pub fn layer(&mut self, other: &EnvOverlay)
    {
        for (name, action) in &other.ops {
            self.ops.insert(name.clone(), action.clone());
        }
    }

    /// Compose a sequence of overlays into one, later overlays winning
    /// over earlier ones for the same name.
    pub fn compose<'a>(layers: impl IntoIterator<Item = &'a EnvOverlay>) -> EnvOverlay
    {
        let mut merged = EnvOverlay::new();
        for layer in layers {
            merged.layer(layer);
        }
        merged
    }

    /// Apply this overlay's operations to `base`, producing the
    /// resulting environment. Iteration and serialization order are
    /// both by variable name, so the result is deterministic.
    pub fn apply(&self, base: &BTreeMap<String, String>) -> BTreeMap<String, String>
    {
        let mut out = base.clone();

        for (name, action) in &self.ops {
            match action {
                Action::Set(value) => { out.insert(name.clone(), value.clone()); },
                Action::Unset       => { out.remove(name); },
                Action::Inherit     => match base.get(name) {
                    Some(value) => { out.insert(name.clone(), value.clone()); },
                    None        => { out.remove(name); },
                },
            }
        }

        out
    }

    /// Serialize `self.apply(base)` as a conventional `NAME=VALUE`
    /// array, suitable for a direct `execve`, in name order.
    pub fn to_envp(&self, base: &BTreeMap<String, String>) -> Vec<String>
    {
        self.apply(base)
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect()
    }

    /// Serialize this overlay's own operations (not `inherit`, which
    /// has nothing to say until applied) as `--setenv`/`--unsetenv`
    /// arguments for a container-helper invocation that otherwise
    /// inherits the caller's environment unchanged.
    pub fn to_setenv_args(&self) -> Vec<String>
    {
        let mut args = Vec::new();

        for (name, action) in &self.ops {
            match action {
                Action::Set(value) => {
                    args.push("--setenv".to_string());
                    args.push(name.clone());
                    args.push(value.clone());
                },
                Action::Unset => {
                    args.push("--unsetenv".to_string());
                    args.push(name.clone());
                },
                Action::Inherit => {},
            }
        }

        args
    }

    /// Serialize `self.apply(base)` as a compact binary form: NUL-
    /// separated `NAME=VALUE` records, for passing over a file
    /// descriptor to a setuid container helper that otherwise filters
    /// the real environment before a less-privileged child sees it.
    pub fn to_binary(&self, base: &BTreeMap<String, String>) -> Vec<u8>
    {
        let mut buf = Vec::new();

        for (name, value) in self.apply(base) {
            buf.extend_from_slice(name.as_bytes());
            buf.push(b'=');
            buf.extend_from_slice(value.as_bytes());
            buf.push(0);
        }

        buf
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn base() -> BTreeMap<String, String>
    {
        BTreeMap::from([
            ("HOME".to_string(), "/home/me".to_string()),
            ("PWD".to_string(), "/home/me/project".to_string()),
        ])
    }

    #[test]
    fn rejects_invalid_names()
    {
        let mut overlay = EnvOverlay::new();
        assert!(overlay.set("BAD=NAME", "x").is_err());
        assert!(overlay.set("", "x").is_err());
        assert!(overlay.unset("bad\0name").is_err());
    }

    #[test]
    fn set_unset_and_inherit_compose_last_writer_wins()
    {
        let mut overlay = EnvOverlay::new();
        overlay.set("PWD", "/should/be/overwritten").unwrap();
        overlay.unset("PWD").unwrap();
        assert_eq!(overlay.get("PWD"), None);
        assert!(overlay.contains("PWD"));

        overlay.set("container", "vessel").unwrap();
        overlay.inherit("HOME").unwrap();

        let applied = overlay.apply(&base());
        assert_eq!(applied.get("container"), Some(&"vessel".to_string()));
        assert_eq!(applied.get("HOME"), Some(&"/home/me".to_string()));
        assert_eq!(applied.get("PWD"), None);
    }

    #[test]
    fn inherit_of_absent_variable_removes_it()
    {
        let mut overlay = EnvOverlay::new();
        overlay.inherit("LD_PRELOAD").unwrap();

        let applied = overlay.apply(&base());
        assert!(!applied.contains_key("LD_PRELOAD"));
    }

    #[test]
    fn to_envp_is_sorted_and_formatted()
    {
        let mut overlay = EnvOverlay::new();
        overlay.set("ZVAR", "z").unwrap();
        overlay.set("AVAR", "a").unwrap();

        let envp = overlay.to_envp(&BTreeMap::new());
        assert_eq!(envp, vec!["AVAR=a".to_string(), "ZVAR=z".to_string()]);
    }

    #[test]
    fn to_setenv_args_skips_inherit()
    {
        let mut overlay = EnvOverlay::new();
        overlay.set("A", "1").unwrap();
        overlay.unset("B").unwrap();
        overlay.inherit("C").unwrap();

        let args = overlay.to_setenv_args();
        assert_eq!(args, vec![
            "--setenv".to_string(), "A".to_string(), "1".to_string(),
            "--unsetenv".to_string(), "B".to_string(),
        ]);
    }

    #[test]
    fn to_binary_is_nul_separated()
    {
        let mut overlay = EnvOverlay::new();
        overlay.set("A", "1").unwrap();

        let bytes = overlay.to_binary(&BTreeMap::new());
        assert_eq!(bytes, b"A=1\0");
    }

    #[test]
    fn compose_layers_last_overlay_wins()
    {
        let mut first = EnvOverlay::new();
        first.set("A", "first").unwrap();
        first.set("B", "first").unwrap();

        let mut second = EnvOverlay::new();
        second.set("A", "second").unwrap();

        let merged = EnvOverlay::compose([&first, &second]);
        assert_eq!(merged.get("A"), Some("second"));
        assert_eq!(merged.get("B"), Some("first"));
    }
}
