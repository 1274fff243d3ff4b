//! Special cases applied before classification (spec.md §4.3, "Special
//! cases").

/// The outcome of checking a literal against the special-case table,
/// before it ever reaches [`crate::classify::classify`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SpecialCase
{
    /// The entry survives; classify and dispatch it normally.
    None,
    /// The entry is dropped. Carries a human-readable reason for the
    /// caller to log.
    Drop(&'static str),
}

/// Basename of a preload literal, for matching against the special-case
/// table. Works the same whether or not the literal contains a `/`.
fn basename(literal: &str) -> &str
{
    literal.rsplit('/').next().unwrap_or(literal)
}

/// Check `literal` against the special-case table.
///
/// `remove_overlay` reflects whether the caller asked for Steam overlay
/// modules to be stripped; when set, `gameoverlayrenderer.so` entries
/// are dropped silently rather than consolidated by the Adverb.
pub fn check(literal: &str, remove_overlay: bool) -> SpecialCase
{
    let name = basename(literal);

    if name == "gtk3-nocsd" {
        return SpecialCase::Drop("gtk3-nocsd is known to crash under this container's libc");
    }

    if remove_overlay && name.ends_with("gameoverlayrenderer.so") {
        return SpecialCase::Drop("overlay removal requested");
    }

    SpecialCase::None
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn drops_gtk3_nocsd()
    {
        assert_eq!(check("gtk3-nocsd", false), SpecialCase::Drop(
            "gtk3-nocsd is known to crash under this container's libc"));
        assert_eq!(check("/usr/lib/gtk3-nocsd", false), SpecialCase::Drop(
            "gtk3-nocsd is known to crash under this container's libc"));
    }

    #[test]
    fn drops_overlay_only_when_requested()
    {
        assert_eq!(check("/opt/steam/gameoverlayrenderer.so", false), SpecialCase::None);
        assert_eq!(
            check("/opt/steam/gameoverlayrenderer.so", true),
            SpecialCase::Drop("overlay removal requested"),
        );
    }

    #[test]
    fn leaves_ordinary_entries_alone()
    {
        assert_eq!(check("libsomething.so", false), SpecialCase::None);
    }
}
