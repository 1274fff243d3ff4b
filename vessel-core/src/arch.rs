//! The fixed table of known architectures (ABIs).
//!
//! An architecture is identified by its multiarch tuple (e.g.
//! `x86_64-linux-gnu`) and carries the two values the dynamic linker
//! substitutes for `$LIB` and `$PLATFORM` on that architecture. These
//! values are used both to resolve ABI-dependent preload module paths
//! (`spec.md` §4.3b) and to build the per-ABI symlink directories the
//! Adverb creates for `gameoverlayrenderer.so`-style consolidation
//! (`spec.md` §4.4 step 4).

use std::fmt;

/// A single known architecture (ABI).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Architecture
{
    /// The multiarch tuple, e.g. `x86_64-linux-gnu`.
    ///
    /// Used as the `abi=` selector value on dispatched preload entries
    /// and as the subdirectory name under the Adverb's per-ABI directory.
    pub tuple: &'static str,

    /// The value the dynamic linker substitutes for `$PLATFORM`
    /// on this architecture (e.g. `x86_64`).
    pub platform: &'static str,

    /// The value the dynamic linker substitutes for `$LIB`
    /// on this architecture (e.g. `lib/x86_64-linux-gnu`).
    pub lib: &'static str,
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        f.write_str(self.tuple)
    }
}

/// The 64-bit x86 architecture.
pub const X86_64: Architecture = Architecture{
    tuple:    "x86_64-linux-gnu",
    platform: "x86_64",
    lib:      "lib/x86_64-linux-gnu",
};

/// The 32-bit x86 architecture.
pub const I386: Architecture = Architecture{
    tuple:    "i386-linux-gnu",
    platform: "i686",
    lib:      "lib/i386-linux-gnu",
};

/// All architectures known to the core, in a fixed, deterministic order.
///
/// This order is load-bearing: it determines iteration order whenever
/// per-architecture dispatch must produce deterministic output
/// (`spec.md` §8, determinism property).
pub const ARCHITECTURES: &[Architecture] = &[X86_64, I386];

/// Look up a known architecture by its multiarch tuple.
pub fn by_tuple(tuple: &str) -> Option<Architecture>
{
    ARCHITECTURES.iter().copied().find(|arch| arch.tuple == tuple)
}

/// Substitute `$LIB` and `$PLATFORM` (in `$X` or `${X}` form) in `template`
/// for the values appropriate to `arch`.
///
/// This performs no other token expansion; `$ORIGIN` and unknown tokens
/// are left untouched, matching the scope of ABI-dependent dispatch
/// (`spec.md` §4.3b), which only ever sees templates free of those tokens.
pub fn substitute(template: &str, arch: &Architecture) -> String
{
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            out.push(bytes[i] as char);
            i += 1;
            continue;
        }

        if let Some((name, consumed)) = token_at(&template[i ..]) {
            match name {
                "LIB"      => out.push_str(arch.lib),
                "PLATFORM" => out.push_str(arch.platform),
                _          => out.push_str(&template[i .. i + consumed]),
            }
            i += consumed;
        } else {
            out.push('$');
            i += 1;
        }
    }

    out
}

/// If `s` begins with a dynamic-string token (`$NAME` or `${NAME}`),
/// return the token's name and how many bytes of `s` it occupies.
pub fn token_at(s: &str) -> Option<(&str, usize)>
{
    let rest = s.strip_prefix('$')?;

    if let Some(braced) = rest.strip_prefix('{') {
        let end = braced.find('}')?;
        Some((&braced[.. end], end + 3)) // '$' + '{' + name + '}'
    } else {
        let end = rest
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        Some((&rest[.. end], end + 1)) // '$' + name
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn substitute_lib_and_platform()
    {
        let out = substitute("/host/$LIB/mod.so:${PLATFORM}", &X86_64);
        assert_eq!(out, "/host/lib/x86_64-linux-gnu/mod.so:x86_64");
    }

    #[test]
    fn substitute_leaves_origin_alone()
    {
        let out = substitute("$ORIGIN/../$LIB/mod.so", &I386);
        assert_eq!(out, "$ORIGIN/../lib/i386-linux-gnu/mod.so");
    }

    #[test]
    fn token_at_braced_and_bare()
    {
        assert_eq!(token_at("${LIB}/x"), Some(("LIB", 6)));
        assert_eq!(token_at("$LIB/x"), Some(("LIB", 4)));
        assert_eq!(token_at("$ORIGIN"), Some(("ORIGIN", 7)));
        assert_eq!(token_at("no-token"), None);
        assert_eq!(token_at("$"), None);
    }

    #[test]
    fn by_tuple_known_and_unknown()
    {
        assert_eq!(by_tuple("x86_64-linux-gnu"), Some(X86_64));
        assert_eq!(by_tuple("sparc64-linux-gnu"), None);
    }
}
