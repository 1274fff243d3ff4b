//! Populating the Exports planner (spec.md §4.5 step 4).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use vessel_exports::{ExportsPlanner, Mode};

use crate::{home::HomeMode, steam_env};

/// A caller-specified `--filesystem PATH[:ro|:rw]` request.
#[derive(Clone, Debug)]
pub struct FilesystemRequest
{
    /// The path to expose.
    pub path: PathBuf,
    /// Whether it should be read-write.
    pub mode: Mode,
}

/// Directories from other packaging frameworks, exposed read-only as a
/// convenience so that guest binaries built against them keep working
/// (spec.md §4.5 step 4, "other framework directories").
const OTHER_FRAMEWORK_DIRS: &[&str] = &["/nix", "/snap", "/var/lib/flatpak", "/var/lib/snapd"];

fn log_skip(origin: &str, path: &Path, err: &vessel_core::Error)
{
    use vessel_core::Error;
    match err {
        Error::PathNotFound(_) | Error::PermissionDenied(_) | Error::AutofsBlocked(_) =>
            log::info!("{origin}: skipping {} ({err})", path.display()),
        Error::ReservedPath(_) =>
            log::warn!("{origin}: refused to expose reserved path {}", path.display()),
        _ =>
            log::warn!("{origin}: failed to expose {} ({err})", path.display()),
    }
}

fn expose_best_effort(planner: &mut ExportsPlanner, path: &Path, mode: Mode, origin: &str)
{
    if let Err(err) = planner.add_expose(path, mode, origin) {
        log_skip(origin, path, &err);
    }
}

/// Populate `/usr`, the merged-usr symlinks, `/etc`, and the os-release
/// file (spec.md §4.5 step 4, first three bullets).
pub fn populate_usr_and_etc(planner: &mut ExportsPlanner, real_root: &Path)
{
    const ORIGIN: &str = "usr";
    expose_best_effort(planner, &real_root.join("usr"), Mode::ReadOnly, ORIGIN);

    for name in ["bin", "sbin", "lib", "lib32", "lib64"] {
        let host_path = real_root.join(name);
        expose_best_effort(planner, &host_path, Mode::ReadOnly, ORIGIN);
    }

    expose_best_effort(planner, &real_root.join("etc"), Mode::ReadOnly, "etc");

    let os_release = real_root.join("etc/os-release");
    let usr_os_release = real_root.join("usr/lib/os-release");
    if let Err(err) = planner.add_expose(&os_release, Mode::ReadOnly, "os-release") {
        log::info!("os-release: falling back to usr/lib/os-release ({err})");
        expose_best_effort(planner, &usr_os_release, Mode::ReadOnly, "os-release");
    }
}

/// Populate the guest's home directory, per the resolved [`HomeMode`]
/// (spec.md §4.5 step 4, fourth bullet).
pub fn populate_home(planner: &mut ExportsPlanner, mode: &HomeMode)
{
    match mode {
        HomeMode::Shared(path) =>
            expose_best_effort(planner, path, Mode::ReadWrite, "home"),
        HomeMode::Private(path) =>
            expose_best_effort(planner, path, Mode::ReadWrite, "home"),
        HomeMode::Transient => {},
    }
}

/// Populate well-known IPC rendezvous sockets found under the caller's
/// environment (spec.md §4.5 step 4, fifth bullet).
pub fn populate_ipc_sockets(planner: &mut ExportsPlanner, env: &BTreeMap<String, String>)
{
    const ORIGIN: &str = "ipc";

    expose_best_effort(planner, Path::new("/tmp/.X11-unix"), Mode::ReadWrite, ORIGIN);

    let runtime_dir = env.get("XDG_RUNTIME_DIR").map(PathBuf::from);

    if let (Some(runtime_dir), Some(display)) =
        (runtime_dir.as_ref(), env.get("WAYLAND_DISPLAY"))
    {
        expose_best_effort(planner, &runtime_dir.join(display), Mode::ReadWrite, ORIGIN);
    }

    if let Some(pulse_server) = env.get("PULSE_SERVER") {
        if let Some(path) = pulse_server.strip_prefix("unix:") {
            expose_best_effort(planner, Path::new(path), Mode::ReadWrite, ORIGIN);
        }
    } else if let Some(runtime_dir) = runtime_dir.as_ref() {
        expose_best_effort(planner, &runtime_dir.join("pulse/native"), Mode::ReadWrite, ORIGIN);
    }

    if let Some(runtime_dir) = runtime_dir.as_ref() {
        expose_best_effort(planner, &runtime_dir.join("pipewire-0"), Mode::ReadWrite, ORIGIN);

        for entry_name in discord_ipc_names() {
            expose_best_effort(planner, &runtime_dir.join(entry_name), Mode::ReadWrite, ORIGIN);
        }
    }

    if let Some(address) = env.get("DBUS_SESSION_BUS_ADDRESS") {
        if let Some(path) = parse_unix_bus_address(address) {
            expose_best_effort(planner, &path, Mode::ReadWrite, ORIGIN);
        }
    }

    expose_best_effort(
        planner,
        Path::new("/run/dbus/system_bus_socket"),
        Mode::ReadWrite,
        ORIGIN,
    );
}

/// Discord's IPC rendezvous sockets, `discord-ipc-0` through `-9`.
fn discord_ipc_names() -> impl Iterator<Item = String>
{
    (0..10).map(|n| format!("discord-ipc-{n}"))
}

/// Extract the socket path from a `unix:path=/...` (optionally with a
/// trailing `,guid=...`) D-Bus address; other transports are ignored.
fn parse_unix_bus_address(address: &str) -> Option<PathBuf>
{
    let rest = address.strip_prefix("unix:")?;
    for field in rest.split(',') {
        if let Some(path) = field.strip_prefix("path=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Populate the Steam/Proton/PressureVessel directories named by
/// environment variables (spec.md §4.5 step 4, sixth bullet; §6.2).
pub fn populate_steam_dirs(
    planner: &mut ExportsPlanner,
    env: &BTreeMap<String, String>,
    home_mode: &HomeMode,
)
{
    for var in steam_env::ENV_PATH_VARS {
        if var.shared_home_only && !matches!(home_mode, HomeMode::Shared(_)) {
            continue;
        }

        let Some(value) = env.get(var.name)
            else { continue };

        if var.deprecated {
            log::warn!("{} is deprecated but honored", var.name);
        }

        let paths: Vec<&str> = if var.colon_split {
            value.split(':').filter(|s| !s.is_empty()).collect()
        } else {
            vec![value.as_str()]
        };

        for path in paths {
            expose_best_effort(planner, Path::new(path), var.mode, var.name);
        }
    }
}

/// Populate the caller's current working directory, unless it is
/// already the home directory (spec.md §4.5 step 4, seventh bullet).
pub fn populate_cwd(planner: &mut ExportsPlanner, cwd: &Path, home_mode: &HomeMode)
{
    if home_mode.host_path() == Some(cwd) {
        return;
    }
    expose_best_effort(planner, cwd, Mode::ReadWrite, "cwd");
}

/// Populate caller-specified `--filesystem` requests (spec.md §4.5 step
/// 4, eighth bullet).
pub fn populate_caller_filesystems(planner: &mut ExportsPlanner, requests: &[FilesystemRequest])
{
    for request in requests {
        expose_best_effort(planner, &request.path, request.mode, "--filesystem");
    }
}

/// Populate other packaging frameworks' directories, read-only (spec.md
/// §4.5 step 4, final bullet).
pub fn populate_other_frameworks(planner: &mut ExportsPlanner)
{
    for dir in OTHER_FRAMEWORK_DIRS {
        expose_best_effort(planner, Path::new(dir), Mode::ReadOnly, "other-framework");
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn discord_ipc_names_covers_ten_slots()
    {
        let names: Vec<_> = discord_ipc_names().collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "discord-ipc-0");
        assert_eq!(names[9], "discord-ipc-9");
    }

    #[test]
    fn parse_unix_bus_address_extracts_path()
    {
        let address = "unix:path=/run/user/1000/bus,guid=abc123";
        assert_eq!(
            parse_unix_bus_address(address),
            Some(PathBuf::from("/run/user/1000/bus")),
        );
    }

    #[test]
    fn parse_unix_bus_address_rejects_other_transports()
    {
        assert_eq!(parse_unix_bus_address("tcp:host=localhost,port=1234"), None);
    }

    #[test]
    fn populate_cwd_skips_when_equal_to_home()
    {
        let mut planner = ExportsPlanner::new(vessel_core::HostRoot::real());
        let home = HomeMode::Shared(PathBuf::from("/home/me"));
        populate_cwd(&mut planner, Path::new("/home/me"), &home);
        assert_eq!(
            planner.is_visible(Path::new("/home/me")),
            vessel_exports::Visibility::Hidden,
        );
    }
}
