//! Composing the environment overlay handed to the container helper
//! and, through it, to the Adverb and the guest (spec.md §4.5 step 6).

use std::{collections::BTreeMap, os::unix::fs::MetadataExt, path::Path};

use vessel_env::EnvOverlay;

/// Variables a setuid container helper's own setup code strips from the
/// environment before an unprivileged child ever sees it, because the
/// dynamic linker would otherwise honor them for a setuid binary.
const FILTERED_BY_SETUID_HELPER: &[&str] = &[
    "LD_LIBRARY_PATH",
    "LD_PRELOAD",
    "LD_AUDIT",
    "LD_ORIGIN_PATH",
    "LD_DEBUG",
];

/// Is the container helper at `path` setuid-root?
pub fn is_setuid_helper(path: &Path) -> std::io::Result<bool>
{
    let metadata = std::fs::metadata(path)?;
    Ok(metadata.mode() & libc::S_ISUID != 0)
}

/// Build the overlay for the container-helper invocation (spec.md §4.5
/// step 6): `container=<launcher-name>`, a cleared `PWD`, and the
/// graphics driver search path variables from the runtime-provisioning
/// collaborator. Variables the setuid helper would filter are left to
/// [`out_of_band_env`] instead of being set here.
pub fn build_overlay(launcher_name: &str, graphics_vars: &[(String, String)]) -> EnvOverlay
{
    let mut overlay = EnvOverlay::new();
    overlay.set("container", launcher_name).expect("launcher name is a valid env var value");
    overlay.unset("PWD").expect("PWD is a valid env var name");

    for (name, value) in graphics_vars {
        overlay.set(name.clone(), value.clone())
            .expect("collaborator-provided variable names are well-formed");
    }

    overlay
}

/// If the helper is setuid, split `overlay` into the part that is safe
/// to pass as ordinary `--setenv` arguments and the part that must
/// instead be re-provided out-of-band (spec.md §4.6c) because the
/// helper's own setup code would otherwise strip it.
///
/// Returns `(direct, out_of_band)`; `out_of_band` is `None` when the
/// helper is not setuid, in which case the full overlay is safe to pass
/// directly.
pub fn split_for_setuid_helper(overlay: &EnvOverlay, helper_is_setuid: bool)
    -> (EnvOverlay, Option<EnvOverlay>)
{
    if !helper_is_setuid {
        return (overlay.clone(), None);
    }

    let mut direct = overlay.clone();
    let mut out_of_band = EnvOverlay::new();

    for name in FILTERED_BY_SETUID_HELPER {
        if let Some(value) = overlay.get(name) {
            out_of_band.set(*name, value).expect("filtered variable names are well-formed");
            direct.unset(*name).expect("filtered variable names are well-formed");
        }
    }

    (direct, Some(out_of_band))
}

/// Serialize the out-of-band overlay as the binary form consumed over a
/// file descriptor by the setuid helper's privileged side (spec.md
/// §4.6c).
pub fn out_of_band_bytes(out_of_band: &EnvOverlay, base: &BTreeMap<String, String>) -> Vec<u8>
{
    out_of_band.to_binary(base)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn build_overlay_sets_container_and_clears_pwd()
    {
        let overlay = build_overlay("vessel", &[]);
        assert_eq!(overlay.get("container"), Some("vessel"));
        assert!(overlay.contains("PWD"));
        assert_eq!(overlay.apply(&BTreeMap::new()).get("PWD"), None);
    }

    #[test]
    fn split_is_noop_when_not_setuid()
    {
        let overlay = build_overlay("vessel", &[]);
        let (direct, out_of_band) = split_for_setuid_helper(&overlay, false);
        assert_eq!(direct.get("container"), Some("vessel"));
        assert!(out_of_band.is_none());
    }

    #[test]
    fn split_moves_filtered_vars_out_of_band()
    {
        let mut overlay = build_overlay("vessel", &[]);
        overlay.set("LD_PRELOAD", "/preload.so").unwrap();

        let (direct, out_of_band) = split_for_setuid_helper(&overlay, true);
        assert!(!direct.contains("LD_PRELOAD") || direct.get("LD_PRELOAD").is_none());
        let out_of_band = out_of_band.unwrap();
        assert_eq!(out_of_band.get("LD_PRELOAD"), Some("/preload.so"));
    }
}
