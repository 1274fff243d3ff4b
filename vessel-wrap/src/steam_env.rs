//! The fixed table of environment variables the Wrap supervisor scans
//! for host paths to export (spec.md §6.2).

use vessel_exports::Mode;

/// One row of the table: a variable name, the export mode its value(s)
/// should get, and whether the value is colon-split into multiple
/// paths.
#[derive(Clone, Copy, Debug)]
pub struct EnvPathVar
{
    /// The variable name.
    pub name: &'static str,
    /// `ReadWrite` or `ReadOnly`, per the table's "mode" column.
    pub mode: Mode,
    /// Whether the value is a `:`-separated list of paths rather than
    /// a single path.
    pub colon_split: bool,
    /// Whether this entry is deprecated (still honored, but logged at
    /// warning level instead of info when present).
    pub deprecated: bool,
    /// Only honored when the home-directory mode is "shared".
    pub shared_home_only: bool,
}

const fn rw(name: &'static str, colon_split: bool) -> EnvPathVar
{
    EnvPathVar{ name, mode: Mode::ReadWrite, colon_split, deprecated: false, shared_home_only: false }
}

const fn rw_deprecated(name: &'static str, colon_split: bool) -> EnvPathVar
{
    EnvPathVar{ name, mode: Mode::ReadWrite, colon_split, deprecated: true, shared_home_only: false }
}

const fn ro(name: &'static str, colon_split: bool) -> EnvPathVar
{
    EnvPathVar{ name, mode: Mode::ReadOnly, colon_split, deprecated: false, shared_home_only: false }
}

/// Like [`rw`], but only honored when the home-directory mode is
/// "shared" (spec.md §6.2, final row).
const fn rw_shared_home_only(name: &'static str) -> EnvPathVar
{
    EnvPathVar{
        name, mode: Mode::ReadWrite, colon_split: false, deprecated: false,
        shared_home_only: true,
    }
}

/// The table itself (spec.md §6.2), in the order given there.
pub const ENV_PATH_VARS: &[EnvPathVar] = &[
    ro("PRESSURE_VESSEL_FILESYSTEMS_RO", true),
    rw("PRESSURE_VESSEL_FILESYSTEMS_RW", true),
    rw("PROTON_LOG_DIR", false),
    rw_deprecated("STEAM_COMPAT_APP_LIBRARY_PATH", false),
    rw_deprecated("STEAM_COMPAT_APP_LIBRARY_PATHS", true),
    rw("STEAM_COMPAT_CLIENT_INSTALL_PATH", false),
    rw("STEAM_COMPAT_DATA_PATH", false),
    rw("STEAM_COMPAT_INSTALL_PATH", false),
    rw("STEAM_COMPAT_LIBRARY_PATHS", true),
    rw_deprecated("STEAM_COMPAT_MOUNT_PATHS", true),
    rw("STEAM_COMPAT_MOUNTS", true),
    rw("STEAM_COMPAT_SHADER_PATH", false),
    rw_deprecated("STEAM_COMPAT_TOOL_PATH", false),
    rw("STEAM_COMPAT_TOOL_PATHS", true),
    rw("STEAM_EXTRA_COMPAT_TOOLS_PATHS", true),
    rw_shared_home_only("XDG_CACHE_HOME"),
    rw_shared_home_only("XDG_CONFIG_HOME"),
    rw_shared_home_only("XDG_DATA_HOME"),
    rw_shared_home_only("XDG_STATE_HOME"),
];

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn table_has_expected_length()
    {
        assert_eq!(ENV_PATH_VARS.len(), 19);
    }

    #[test]
    fn deprecated_entries_are_flagged()
    {
        let entry = ENV_PATH_VARS.iter()
            .find(|var| var.name == "STEAM_COMPAT_TOOL_PATH")
            .unwrap();
        assert!(entry.deprecated);
        assert!(entry.colon_split == false);
    }

    #[test]
    fn only_xdg_vars_are_shared_home_only()
    {
        for var in ENV_PATH_VARS {
            let is_xdg = var.name.starts_with("XDG_");
            assert_eq!(var.shared_home_only, is_xdg, "{}", var.name);
        }
    }
}
