/// Whether `remote` should replace `local`.
///
/// This is an ordinal, byte-wise comparison (`remote > local`), not semantic
/// version ordering. It gives the expected answer while every component has
/// the same number of digits (`1.2.0` vs `1.1.9`) and the wrong one when the
/// widths differ: `"10.0"` sorts before `"9.0"`, so that upgrade is never
/// offered. Changing the comparison changes which installations update, so
/// the behavior is kept as is.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::upgrade::version_check::is_newer;
///
/// assert!(is_newer("1.2.0", "1.1.9"));
/// assert!(!is_newer("1.1.9", "1.2.0"));
/// assert!(!is_newer("10.0", "9.0"));
/// ```
#[must_use]
pub fn is_newer(remote: &str, local: &str) -> bool {
    remote.as_bytes() > local.as_bytes()
}

/// Format the installed/latest pair for terminal output.
#[must_use]
pub fn format_version_info(current: &str, latest: Option<&str>) -> String {
    match latest {
        Some(v) if is_newer(v, current) => {
            format!("Current version: {current}\nLatest version:  {v} (update available)")
        }
        _ => format!("Current version: {current} (up to date)"),
    }
}
