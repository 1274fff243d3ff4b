//! A single accumulated export request (spec.md §3, "Export entry").

use std::path::PathBuf;

use crate::mode::Mode;

/// One path the planner has been asked to make visible, at the highest
/// mode requested for it so far.
#[derive(Clone, Debug)]
pub struct Entry
{
    /// Absolute, lexically canonical path, as it will appear inside
    /// the container.
    pub path: PathBuf,

    /// The promoted mode; see [`Mode`]'s ordering.
    pub mode: Mode,

    /// Where this entry's request(s) came from, for diagnostics only
    /// (e.g. `"--filesystem flag"`, `"runtime /usr"`).
    pub origin: String,

    /// The host-side source to bind-mount from, when `mode` is
    /// [`Mode::ReadOnly`] or [`Mode::ReadWrite`].
    pub source: Option<PathBuf>,

    /// The link target to recreate, when `mode` is [`Mode::Symlink`].
    /// Stored exactly as read off the host (relative form).
    pub symlink_target: Option<PathBuf>,
}

impl Entry
{
    /// Promote this entry in place to `mode`, keeping the higher of
    /// the two. `source`/`symlink_target` are replaced only when the
    /// incoming mode strictly wins, so a later, lower-mode request
    /// never clobbers the data a higher mode needs.
    pub fn promote(
        &mut self,
        mode: Mode,
        origin: &str,
        source: Option<PathBuf>,
        symlink_target: Option<PathBuf>,
    )
    {
        if mode > self.mode {
            self.mode = mode;
            self.origin = origin.to_owned();
            self.source = source;
            self.symlink_target = symlink_target;
        }
    }
}
