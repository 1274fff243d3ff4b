//! The in-container supervisor (spec.md §4.4).
//!
//! The Adverb runs as the Wrap supervisor's child, inside the
//! container's mount namespace. It resets signal dispositions,
//! acquires advisory locks, regenerates the dynamic linker cache,
//! optionally generates missing locales, sets up fd redirection, then
//! execve's the guest command and supervises its descendants as a
//! subreaper until they have all exited.

#![warn(missing_docs)]

use std::os::unix::io::OwnedFd;

use os_ext::cstr::IntoCStr;
use vessel_env::EnvOverlay;

pub use self::{
    options::{AdverbOptions, AssignFd, LdConfigRequest, LocaleGenRequest, LockRequest, PreloadSymlink, VariableKind},
    supervisor::{PrimaryOutcome, Supervisor, EXEC_FAILED, EX_SOFTWARE, EX_UNAVAILABLE, EX_USAGE},
};

pub mod exec;
pub mod fds;
pub mod ldconfig;
pub mod locale;
pub mod locks;
mod options;
pub mod signals;
pub mod supervisor;
pub mod symlinks;

/// Run the Adverb's setup sequence (spec.md §4.4 steps 1-7), fork,
/// and execve the guest in the child. Does not return on success in
/// the child; in the parent, hands back the primary child's pid so
/// the caller can drive [`Supervisor`]'s wait loop.
///
/// `env` is the environment overlay to apply before execve; `base_env`
/// is the environment `inherit` operations resolve against. `env` is
/// taken mutably because a successful ldconfig run or locale
/// generation folds `LD_LIBRARY_PATH`/`LOCPATH` into it before it is
/// serialized for execve.
pub fn setup_and_spawn(
    options: &AdverbOptions,
    env: &mut EnvOverlay,
    base_env: &std::collections::BTreeMap<String, String>,
) -> anyhow::Result<(libc::pid_t, Vec<OwnedFd>)>
{
    signals::setup(options.exit_with_parent)?;

    if options.wants_subreaper() {
        os_ext::set_child_subreaper(true)?;
    }

    let lock_fds = locks::acquire(&options.locks)?;

    if let Some(ldconfig_request) = &options.ldconfig {
        match ldconfig::regenerate(ldconfig_request) {
            Ok(_cache_path) => {
                let ld_library_path = ldconfig_request.extra_conf_lines.iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(":");
                env.set("LD_LIBRARY_PATH", ld_library_path)?;
            },
            Err(err) => log::warn!("ldconfig cache regeneration failed, keeping previous cache: {err}"),
        }
    }

    if let Some(locale_request) = &options.locale_gen {
        match locale::generate(locale_request) {
            Ok(outcome) => {
                if let locale::Outcome::Warning(status) = outcome {
                    log::warn!("locale generation exited with status {status}");
                }
                if locale::locales_were_generated(outcome) {
                    env.set("LOCPATH", locale_request.out_dir.display().to_string())?;
                }
            },
            Err(err) => log::warn!("failed to run locale generation helper: {err}"),
        }
    }

    if let Some(root) = &options.preload_symlink_root {
        let dirs = symlinks::AbiSymlinkDirs::create(
            root.clone(),
            &vessel_core::arch::ARCHITECTURES.iter().copied().collect::<Vec<_>>(),
        )?;

        for request in &options.preload_symlinks {
            dirs.link(request)?;
        }
    }

    let envp = env.to_envp(base_env);
    let envp_cstrs: Vec<_> = envp.iter()
        .map(|s| s.clone().into_cstr().expect("environment entries have no interior NUL"))
        .collect();

    let argv_cstrs: Vec<_> = options.argv.iter()
        .map(|s| s.clone().into_cstr().expect("argv entries have no interior NUL"))
        .collect();

    let program = options.argv.first()
        .ok_or_else(|| anyhow::anyhow!("empty argv"))?
        .clone()
        .into_cstr()?;

    // SAFETY: the child performs only fork-safe setup (signal
    // unblocking, fd manipulation, lock cloexec clearing) before
    // execve.
    match unsafe { os_ext::fork() }?
    {
        os_ext::ForkResult::Child => {
            let result = (|| -> anyhow::Result<()> {
                os_ext::unblock_all_signals()?;
                fds::redirect(&options.assign_fds, &options.pass_fds)?;
                locks::keep_across_exec(&lock_fds)?;

                let err = unsafe { exec::exec_replace(&program, &argv_cstrs, &envp_cstrs) };
                Err(anyhow::Error::from(err))
            })();

            if let Err(err) = result {
                log::error!("post-fork setup or execve failed: {err}");
                std::process::exit(EXEC_FAILED);
            }

            unreachable!("exec_replace either execve'd or returned an error handled above");
        },

        os_ext::ForkResult::Parent(child_pid) => {
            // The lock fds stay open in this process (the long-lived
            // supervisor) for as long as the Adverb runs; they are
            // never passed to an execve here, so their close-on-exec
            // bit is irrelevant to us.
            signals::set_primary_child(child_pid);
            Ok((child_pid, lock_fds))
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn wants_subreaper_follows_idle_timeout()
    {
        let mut options = AdverbOptions::default();
        assert!(!options.wants_subreaper());
        options.idle_timeout = Some(std::time::Duration::from_secs(1));
        assert!(options.wants_subreaper());
    }
}
