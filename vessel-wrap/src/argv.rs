//! Emitting the container-helper argument vector (spec.md §4.5 step 7).
//!
//! The finalized [`Op`] stream, the environment overlay's
//! `--setenv`/`--unsetenv` form, a `--chdir`, and finally the Adverb
//! invocation (with the guest command as *its* child argv) are
//! concatenated into one argv for the external container helper
//! (`bwrap`; spec.md §6.3).

use std::path::Path;

use vessel_env::EnvOverlay;
use vessel_exports::Op;

/// Append one [`Op`] as the container-helper flags it corresponds to
/// (spec.md §6.3's forwarded-unchanged flag set).
fn push_op(argv: &mut Vec<String>, op: &Op)
{
    match op {
        Op::Bind{ro, source, target} => {
            argv.push(if *ro { "--ro-bind".to_string() } else { "--bind".to_string() });
            argv.push(source.display().to_string());
            argv.push(target.display().to_string());
        },
        Op::Tmpfs{target} => {
            argv.push("--tmpfs".to_string());
            argv.push(target.display().to_string());
        },
        Op::Dir{target} => {
            argv.push("--dir".to_string());
            argv.push(target.display().to_string());
        },
        Op::Symlink{target, relative_target} => {
            argv.push("--symlink".to_string());
            argv.push(relative_target.display().to_string());
            argv.push(target.display().to_string());
        },
    }
}

/// Build the full container-helper argv: the finalized exports,
/// `--proc`/`--dev`/`--unshare-pid`/`--new-session`, the environment
/// overlay, a `--chdir`, then the Adverb path and its own argv (which
/// in turn ends with the guest command), appended verbatim.
pub fn build_container_helper_argv(
    ops: &[Op],
    env_overlay: &EnvOverlay,
    chdir: &Path,
    adverb_argv: &[String],
) -> Vec<String>
{
    let mut argv = Vec::new();

    for op in ops {
        push_op(&mut argv, op);
    }

    argv.push("--proc".to_string());
    argv.push("/proc".to_string());
    argv.push("--dev".to_string());
    argv.push("/dev".to_string());
    argv.push("--unshare-pid".to_string());
    argv.push("--new-session".to_string());

    argv.extend(env_overlay.to_setenv_args());

    argv.push("--chdir".to_string());
    argv.push(chdir.display().to_string());

    argv.extend(adverb_argv.iter().cloned());

    argv
}

/// Build the Adverb's own argv: its path, any flags the caller already
/// assembled (locks, preload symlinks, ldconfig, locale-gen, fd
/// assignments — built by the caller from [`vessel_adverb::AdverbOptions`]
/// equivalents), then the guest command, verbatim, as its trailing
/// arguments.
pub fn build_adverb_argv(adverb_path: &Path, adverb_flags: &[String], guest_argv: &[String])
    -> Vec<String>
{
    let mut argv = vec![adverb_path.display().to_string()];
    argv.extend(adverb_flags.iter().cloned());
    argv.extend(guest_argv.iter().cloned());
    argv
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn push_op_emits_ro_bind()
    {
        let mut argv = Vec::new();
        push_op(&mut argv, &Op::Bind{
            ro: true,
            source: PathBuf::from("/usr"),
            target: PathBuf::from("/run/host/usr"),
        });
        assert_eq!(argv, vec!["--ro-bind", "/usr", "/run/host/usr"]);
    }

    #[test]
    fn push_op_emits_symlink_with_relative_target_first()
    {
        let mut argv = Vec::new();
        push_op(&mut argv, &Op::Symlink{
            target: PathBuf::from("/lib"),
            relative_target: PathBuf::from("usr/lib"),
        });
        assert_eq!(argv, vec!["--symlink", "usr/lib", "/lib"]);
    }

    #[test]
    fn build_adverb_argv_appends_guest_command_last()
    {
        let argv = build_adverb_argv(
            Path::new("/usr/bin/vessel-adverb"),
            &["--idle-timeout".to_string(), "5".to_string()],
            &["/usr/bin/guest".to_string(), "--flag".to_string()],
        );
        assert_eq!(argv, vec![
            "/usr/bin/vessel-adverb", "--idle-timeout", "5", "/usr/bin/guest", "--flag",
        ]);
    }

    #[test]
    fn build_container_helper_argv_ends_with_adverb_argv()
    {
        let ops = vec![Op::Dir{ target: PathBuf::from("/run/user/1000") }];
        let overlay = EnvOverlay::new();
        let adverb_argv = vec!["/usr/bin/vessel-adverb".to_string(), "/usr/bin/guest".to_string()];

        let argv = build_container_helper_argv(&ops, &overlay, Path::new("/home/me"), &adverb_argv);
        assert_eq!(&argv[argv.len() - 2..], adverb_argv.as_slice());
    }
}
