//! Locale generation (spec.md §4.4 step 6).

use std::io;

use os_ext::cstr::IntoCStr;

use crate::{exec, options::LocaleGenRequest};

/// The locale-generation helper's exit-status ABI.
const STATUS_ALL_PRESENT: i32 = 0;
const STATUS_CORRECTED: i32 = 72;

/// Outcome of running the locale-generation helper.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome
{
    /// Exit status 0: every requested locale was already present.
    AllPresent,
    /// Exit status 72: missing locales were generated into the output
    /// directory.
    Corrected,
    /// Any other non-zero status: non-fatal, logged as a warning by
    /// the caller.
    Warning(i32),
}

/// Run the locale-generation helper, directing its output into
/// `request.out_dir`.
pub fn generate(request: &LocaleGenRequest) -> io::Result<Outcome>
{
    let helper = request.helper.clone().into_cstr()
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

    let argv = vec![
        request.helper.display().to_string(),
        "--output".to_string(),
        request.out_dir.display().to_string(),
    ];
    let argv_cstrs: Vec<_> = argv.iter()
        .map(|s| s.clone().into_cstr().expect("argv entries have no interior NUL"))
        .collect();

    let status = exec::run_to_completion(&helper, &argv_cstrs)?;
    let code = exec::exit_code_of(&status);

    Ok(match code {
        STATUS_ALL_PRESENT => Outcome::AllPresent,
        STATUS_CORRECTED   => Outcome::Corrected,
        other               => Outcome::Warning(other),
    })
}

/// Whether `outcome` means `LOCPATH` should be set to the output
/// directory.
pub fn locales_were_generated(outcome: Outcome) -> bool
{
    matches!(outcome, Outcome::Corrected)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn only_corrected_implies_generation()
    {
        assert!(!locales_were_generated(Outcome::AllPresent));
        assert!(locales_were_generated(Outcome::Corrected));
        assert!(!locales_were_generated(Outcome::Warning(1)));
    }
}
