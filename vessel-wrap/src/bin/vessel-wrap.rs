//! Standalone entry point for the outer launcher.
//!
//! Option parsing, `--filesystem`/`--assign-fd`/`--ld-preload` flag
//! syntax, and help/version text are CLI plumbing outside this crate's
//! scope (the caller assembles a [`vessel_wrap::FilesystemRequest`]
//! list and hands it in); what's left here is wiring the planner,
//! environment overlay, and argv builders together and execve-ing the
//! container helper.

use std::{collections::BTreeMap, env, path::PathBuf};

use vessel_core::HostRoot;
use vessel_env::EnvOverlay;
use vessel_exports::ExportsPlanner;
use vessel_wrap::{
    argv::{build_adverb_argv, build_container_helper_argv},
    caps,
    env::build_overlay,
    exec::{exec_replace, to_cstrings},
    home::HomeMode,
    populate,
    sandbox,
};

const CONTAINER_HELPER: &str = "/usr/bin/bwrap";
const ADVERB_PATH: &str = "/usr/bin/vessel-adverb";

/// `SetupError` (spec.md §7).
const EX_UNAVAILABLE: i32 = 69;

fn main()
{
    env_logger::init();

    let base_env: BTreeMap<String, String> = env::vars().collect();
    let host_root = HostRoot::real();

    match std::ffi::CString::new(CONTAINER_HELPER).map(|helper| caps::supports_perms(&helper)) {
        Ok(Ok(true)) => {},
        Ok(Ok(false)) => {
            log::error!("{CONTAINER_HELPER} does not support --perms; refusing to continue");
            std::process::exit(EX_UNAVAILABLE);
        },
        Ok(Err(err)) => {
            log::error!("failed to probe {CONTAINER_HELPER}'s capabilities: {err}");
            std::process::exit(EX_UNAVAILABLE);
        },
        Err(_) => unreachable!("CONTAINER_HELPER is a fixed string with no NUL byte"),
    }

    if sandbox::is_flatpak_sandboxed(&host_root) {
        log::warn!("running inside an application sandbox; subsandbox RPC is not yet wired up here");
    }

    let real_root = match sandbox::detect_translator(&host_root) {
        Some(translator) => {
            log::info!("detected translator rootfs at {}", translator.rootfs.display());
            translator.rootfs
        },
        None => PathBuf::from("/"),
    };

    let home_mode = base_env.get("HOME")
        .map(|home| HomeMode::Shared(PathBuf::from(home)))
        .unwrap_or(HomeMode::Transient);

    let mut planner = ExportsPlanner::new(host_root);
    populate::populate_usr_and_etc(&mut planner, &real_root);
    populate::populate_home(&mut planner, &home_mode);
    populate::populate_ipc_sockets(&mut planner, &base_env);
    populate::populate_steam_dirs(&mut planner, &base_env, &home_mode);
    populate::populate_other_frameworks(&mut planner);

    if let Ok(cwd) = env::current_dir() {
        populate::populate_cwd(&mut planner, &cwd, &home_mode);
    }

    let ops = planner.finalize();

    let launcher_name = env::args().next().unwrap_or_else(|| "vessel".to_string());
    let overlay = build_overlay(&launcher_name, &[]);

    let guest_argv: Vec<String> = env::args().skip(1).collect();
    if guest_argv.is_empty() {
        log::error!("no guest command given");
        std::process::exit(64);
    }

    let adverb_argv = build_adverb_argv(&PathBuf::from(ADVERB_PATH), &[], &guest_argv);
    let chdir = home_mode.host_path().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"));
    let helper_argv = build_container_helper_argv(&ops, &overlay, &chdir, &adverb_argv);

    let program = match std::ffi::CString::new(CONTAINER_HELPER) {
        Ok(program) => program,
        Err(_) => {
            log::error!("container helper path contains a NUL byte");
            std::process::exit(64);
        },
    };

    let argv = match to_cstrings(&helper_argv) {
        Ok(argv) => argv,
        Err(err) => {
            log::error!("invalid argument for container helper: {err}");
            std::process::exit(64);
        },
    };

    let envp_strings = EnvOverlay::new().to_envp(&base_env);
    let envp = match to_cstrings(&envp_strings) {
        Ok(envp) => envp,
        Err(err) => {
            log::error!("invalid environment variable: {err}");
            std::process::exit(64);
        },
    };

    // SAFETY: all setup above has completed; nothing after this point
    // needs the current process image.
    let err = unsafe { exec_replace(&program, &argv, &envp) };
    log::error!("failed to execve {CONTAINER_HELPER}: {err}");
    std::process::exit(127);
}
