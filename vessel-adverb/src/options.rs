//! Adverb invocation options (spec.md §4.4, input).

use std::{path::PathBuf, time::Duration};

use vessel_core::Architecture;

/// One `--lock` request.
#[derive(Clone, Debug)]
pub struct LockRequest
{
    /// The file to lock.
    pub path: PathBuf,
    /// Create the file if it does not exist.
    pub create: bool,
    /// Exclusive (`true`) or shared (`false`) lock.
    pub exclusive: bool,
    /// Block until the lock is available, rather than failing
    /// immediately if it is held.
    pub wait: bool,
}

/// One `--assign-fd target=source` request: dup `source` onto `target`
/// in the child before execve.
#[derive(Clone, Copy, Debug)]
pub struct AssignFd
{
    /// The fd number the guest program will see.
    pub target: i32,
    /// The fd number to duplicate onto `target`.
    pub source: i32,
}

/// Which environment variable a preload symlink request is destined
/// for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VariableKind
{
    /// `LD_AUDIT`.
    Audit,
    /// `LD_PRELOAD`.
    Preload,
}

/// A preload module already classified and dispatched (spec.md §4.3),
/// resolved to a concrete host path for one architecture, awaiting a
/// per-ABI symlink (spec.md §4.4 step 4).
#[derive(Clone, Debug)]
pub struct PreloadSymlink
{
    /// Which variable this entry is destined for.
    pub kind: VariableKind,
    /// The architecture this resolution is for.
    pub arch: Architecture,
    /// The host-side path the symlink should point to.
    pub host_path: PathBuf,
}

/// Linker cache regeneration input (spec.md §4.4 step 5).
#[derive(Clone, Debug)]
pub struct LdConfigRequest
{
    /// Caller-supplied extra entries, prepended to the runtime's own
    /// `ld.so.conf`. Each must be an absolute path with no newline or
    /// tab.
    pub extra_conf_lines: Vec<PathBuf>,
    /// The runtime's own `ld.so.conf`, appended after the extra lines.
    pub runtime_conf: PathBuf,
    /// Directory to write `ld.so.conf`/`ld.so.cache` into.
    pub out_dir: PathBuf,
    /// Pass `-v` to ldconfig.
    pub verbose: bool,
}

/// Locale generation input (spec.md §4.4 step 6).
#[derive(Clone, Debug)]
pub struct LocaleGenRequest
{
    /// Path to the locale-generation helper.
    pub helper: PathBuf,
    /// Directory to direct the helper's output into.
    pub out_dir: PathBuf,
}

/// Full set of options the Adverb acts on, in the order spec.md §4.4
/// describes.
#[derive(Clone, Debug, Default)]
pub struct AdverbOptions
{
    /// Arrange to receive SIGTERM when our parent exits.
    pub exit_with_parent: bool,
    /// Force subreaper mode even with no terminate timeout set.
    pub force_subreaper: bool,
    /// Lock requests, in order.
    pub locks: Vec<LockRequest>,
    /// Where to create the per-ABI preload symlink directories.
    pub preload_symlink_root: Option<PathBuf>,
    /// Preload modules awaiting per-ABI symlinks.
    pub preload_symlinks: Vec<PreloadSymlink>,
    /// Linker cache regeneration request, if any.
    pub ldconfig: Option<LdConfigRequest>,
    /// Locale generation request, if any.
    pub locale_gen: Option<LocaleGenRequest>,
    /// `--assign-fd` requests.
    pub assign_fds: Vec<AssignFd>,
    /// `--pass-fd` requests: fd numbers to keep open (not close-on-exec).
    pub pass_fds: Vec<i32>,
    /// Time after the primary child exits before sending SIGTERM to
    /// remaining descendants. `None` disables the idle timer.
    pub idle_timeout: Option<Duration>,
    /// Time after SIGTERM before sending SIGKILL to survivors. Zero
    /// skips the SIGTERM step and kills immediately.
    pub terminate_timeout: Duration,
    /// The program to execve, and its arguments (argv[0] included).
    pub argv: Vec<String>,
}

impl AdverbOptions
{
    /// Whether subreaper mode is implied: explicitly requested, or a
    /// non-negative terminate timeout was given (spec.md §4.4 step 2).
    pub fn wants_subreaper(&self) -> bool
    {
        self.force_subreaper || self.idle_timeout.is_some()
    }
}
