//! Per-ABI preload symlink directories (spec.md §4.4 step 4).
//!
//! A single `LD_PRELOAD` entry can only name one path, but a container
//! may run guest code built for more than one ABI. The trick is a
//! directory tree shaped exactly like the dynamic linker's own `$LIB`
//! substitution values (e.g. `<root>/lib/x86_64-linux-gnu`), so that
//! one entry of the form `<root>/$LIB/gameoverlayrenderer.so` resolves
//! to a different symlink per architecture without any cooperation
//! from the guest.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use os_ext::cstr::IntoCStr;
use vessel_core::Architecture;

use crate::options::{PreloadSymlink, VariableKind};

/// The per-ABI symlink directories created under one temp root.
pub struct AbiSymlinkDirs
{
    root: PathBuf,
    dirs: BTreeMap<&'static str, PathBuf>,
}

/// Create `path` and all of its missing ancestors, tolerating a path
/// that already exists in full or in part.
fn create_dir_all(path: &Path) -> io::Result<()>
{
    let mut built = PathBuf::new();

    for component in path.components() {
        built.push(component);
        let pathname = built.clone().into_cstr()
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        match os_ext::mkdir(&pathname, 0o755) {
            Ok(())                                                        => {},
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists         => {},
            Err(err)                                                      => return Err(err),
        }
    }

    Ok(())
}

impl AbiSymlinkDirs
{
    /// Create one subdirectory per known architecture under `root`,
    /// at the path the dynamic linker's `$LIB` substitution would
    /// produce for that architecture.
    pub fn create(root: PathBuf, architectures: &[Architecture]) -> io::Result<Self>
    {
        create_dir_all(&root)?;

        let mut dirs = BTreeMap::new();

        for arch in architectures {
            let dir = root.join(arch.lib);
            create_dir_all(&dir)?;
            dirs.insert(arch.tuple, dir);
        }

        Ok(Self{ root, dirs })
    }

    /// The `$LIB`-token template that, once substituted by the
    /// container's own dynamic linker, resolves to the right
    /// per-architecture directory under this root.
    pub fn lib_token_template(&self, basename: &str) -> String
    {
        format!("{}/$LIB/{basename}", self.root.display())
    }

    /// Create a symlink for one preload module inside the directory
    /// matching its architecture, replacing any existing entry at the
    /// same basename (the "consolidation" spec.md mentions for
    /// repeated `gameoverlayrenderer.so` entries).
    pub fn link(&self, request: &PreloadSymlink) -> io::Result<()>
    {
        let dir = self.dirs.get(request.arch.tuple).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "unknown architecture")
        })?;

        let basename = request.host_path
            .file_name()
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;

        let link_path = dir.join(basename);

        let target = request.host_path.clone().into_cstr()
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        match os_ext::symlink(&target, &link_path) {
            Ok(())                                                => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                // Consolidate: an earlier request already linked this
                // basename for this architecture. Last one wins.
                std::fs::remove_file(&link_path)?;
                os_ext::symlink(&target, &link_path)
            },
            Err(err) => Err(err),
        }
    }

    /// Rewrite a dispatched preload request's literal into the
    /// `$LIB`-token form for its variable's environment.
    pub fn rewrite(&self, request: &PreloadSymlink) -> io::Result<(VariableKind, String)>
    {
        let basename = request.host_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;

        Ok((request.kind, self.lib_token_template(basename)))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use os_ext::cstr;
    use vessel_core::arch::{I386, X86_64};

    fn tempdir() -> PathBuf
    {
        let dir = os_ext::mkdtemp(cstr!("/tmp/vessel-adverb-test-XXXXXX").to_owned()).unwrap();
        PathBuf::from(dir.to_str().unwrap().to_string())
    }

    #[test]
    fn creates_one_dir_per_architecture()
    {
        let root = tempdir();
        let dirs = AbiSymlinkDirs::create(root.clone(), &[X86_64, I386]).unwrap();
        assert!(root.join(X86_64.lib).is_dir());
        assert!(root.join(I386.lib).is_dir());
        assert_eq!(dirs.lib_token_template("foo.so"), format!("{}/$LIB/foo.so", root.display()));
    }

    #[test]
    fn link_creates_symlink_and_consolidates_repeats()
    {
        let root = tempdir();
        let dirs = AbiSymlinkDirs::create(root.clone(), &[X86_64]).unwrap();

        let module_a = {
            let mut p = root.clone();
            p.push("gameoverlayrenderer.so.a");
            std::fs::write(&p, b"").unwrap();
            p
        };
        let module_b = {
            let mut p = root.clone();
            p.push("gameoverlayrenderer.so");
            std::fs::write(&p, b"").unwrap();
            p
        };

        let first = PreloadSymlink{
            kind:      VariableKind::Preload,
            arch:      X86_64,
            host_path: module_a,
        };
        let second = PreloadSymlink{
            kind:      VariableKind::Preload,
            arch:      X86_64,
            host_path: module_b.clone(),
        };

        // Different basenames land as distinct symlinks.
        dirs.link(&first).unwrap();
        dirs.link(&second).unwrap();
        dirs.link(&second).unwrap(); // Repeat: must not fail.

        let link_path = root.join(X86_64.lib).join("gameoverlayrenderer.so");
        let target = std::fs::read_link(&link_path).unwrap();
        assert_eq!(target, module_b);
    }
}
