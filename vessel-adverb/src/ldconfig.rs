//! Dynamic linker cache regeneration (spec.md §4.4 step 5, §6.4).

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use os_ext::cstr::IntoCStr;
use thiserror::Error;

use crate::{exec, options::LdConfigRequest};

/// Errors specific to cache regeneration. Per spec.md §4.4, a failure
/// here is never fatal to the Adverb: the caller falls back to a
/// pre-assembled `LD_LIBRARY_PATH` instead.
#[derive(Debug, Error)]
pub enum Error
{
    /// A conf line was not an absolute path, or contained a newline or
    /// tab, either of which would corrupt the conf file's line-based
    /// format.
    #[error("invalid ld.so.conf entry: {0:?}")]
    InvalidConfLine(PathBuf),

    /// The `ldconfig` invocation itself failed (spawn or wait error).
    #[error("failed to run ldconfig: {0}")]
    Spawn(#[source] io::Error),

    /// `ldconfig` ran but exited with a non-zero status.
    #[error("ldconfig exited with status {0}")]
    ExitStatus(i32),

    /// Writing the conf file or replacing the cache failed.
    #[error("ldconfig cache i/o failed: {0}")]
    Io(#[from] io::Error),
}

fn validate_conf_line(path: &Path) -> Result<(), Error>
{
    if !path.is_absolute() {
        return Err(Error::InvalidConfLine(path.to_path_buf()));
    }

    let text = path.to_string_lossy();
    if text.contains('\n') || text.contains('\t') {
        return Err(Error::InvalidConfLine(path.to_path_buf()));
    }

    Ok(())
}

/// Write the combined `ld.so.conf`, run `/sbin/ldconfig` against it,
/// and atomically replace the previous cache on success.
///
/// Returns the path to the new cache on success.
pub fn regenerate(request: &LdConfigRequest) -> Result<PathBuf, Error>
{
    for line in &request.extra_conf_lines {
        validate_conf_line(line)?;
    }

    let mut conf_text = String::new();
    for line in &request.extra_conf_lines {
        conf_text.push_str(&line.to_string_lossy());
        conf_text.push('\n');
    }
    conf_text.push_str(&fs::read_to_string(&request.runtime_conf)?);

    let conf_path = request.out_dir.join("ld.so.conf");
    fs::write(&conf_path, conf_text)?;

    let new_cache_path = request.out_dir.join("ld.so.cache.new");
    let cache_path = request.out_dir.join("ld.so.cache");

    let mut argv = vec![
        "ldconfig".to_string(),
        "-f".to_string(), conf_path.display().to_string(),
        "-C".to_string(), new_cache_path.display().to_string(),
        "-X".to_string(),
    ];
    if request.verbose {
        argv.push("-v".to_string());
    }

    let argv_cstrs: Vec<_> = argv.iter()
        .map(|s| s.clone().into_cstr().expect("argv entries have no interior NUL"))
        .collect();

    let status = exec::run_to_completion(os_ext::cstr!("/sbin/ldconfig"), &argv_cstrs)
        .map_err(Error::Spawn)?;

    let code = exec::exit_code_of(&status);
    if code != 0 {
        return Err(Error::ExitStatus(code));
    }

    let new_cache_cstr = new_cache_path.clone().into_cstr()
        .map_err(|_| Error::InvalidConfLine(new_cache_path.clone()))?;
    let cache_cstr = cache_path.clone().into_cstr()
        .map_err(|_| Error::InvalidConfLine(cache_path.clone()))?;

    os_ext::renameat2(None, &new_cache_cstr, None, &cache_cstr, 0)?;

    Ok(cache_path)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn rejects_relative_conf_line()
    {
        assert!(validate_conf_line(Path::new("relative/path")).is_err());
    }

    #[test]
    fn rejects_newline_and_tab()
    {
        assert!(validate_conf_line(Path::new("/has\nnewline")).is_err());
        assert!(validate_conf_line(Path::new("/has\ttab")).is_err());
    }

    #[test]
    fn accepts_plain_absolute_path()
    {
        assert!(validate_conf_line(Path::new("/usr/lib/x86_64-linux-gnu")).is_ok());
    }
}
