//! Output writers: Cloud-Optimized GeoTIFF, NetCDF-4 time series, and the
//! metadata embedded in both. Every writer renders into a hidden temporary file
//! in the destination directory and renames it into place, so an interrupted
//! run never leaves a partial output under its final name.
use std::path::{Path, PathBuf};

use tempfile::TempPath;

pub mod cog;
pub mod metadata;
pub mod netcdf;

/// Reserve a temporary sibling of `final_path` with the same extension.
pub(crate) fn staging_path(final_path: &Path) -> std::io::Result<TempPath> {
    let dir = match final_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let suffix = final_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    Ok(tempfile::Builder::new()
        .prefix(".hls-super-")
        .suffix(&suffix)
        .tempfile_in(dir)?
        .into_temp_path())
}

/// Move a finished temporary file to its final name.
pub(crate) fn publish(staged: TempPath, final_path: &Path) -> std::io::Result<()> {
    staged.persist(final_path).map_err(|e| e.error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_file_is_hidden_until_published() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.subset.tif");
        let staged = staging_path(&target).unwrap();
        assert!(staged.to_string_lossy().ends_with(".tif"));
        assert!(!target.exists());
        std::fs::write(&staged, b"data").unwrap();
        publish(staged, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[test]
    fn dropped_staging_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.nc4");
        let staged = staging_path(&target).unwrap();
        let staged_name = staged.to_path_buf();
        drop(staged);
        assert!(!staged_name.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
