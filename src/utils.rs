use std::{fs, path::Path};

use crate::error::Result;

pub fn create_folder_if_not_exists(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Write `bytes` next to `path` and rename into place, so readers only ever see a
/// complete file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_folder_if_not_exists(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

/// Index of the `width`-wide bucket nearest to `value`, rounding halves to even.
pub fn bin_index(value: f64, width: f64) -> i64 {
    (value / width).round_ties_even() as i64
}

/// Percent change from `start` to `end`
pub fn percent_change(start: f64, end: f64) -> f64 {
    (end - start) / start * 100.0
}
