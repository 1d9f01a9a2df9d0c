use memc_loader_core::HANDLED_MARKER;
use std::{
    io,
    path::{Path, PathBuf},
};

/// Marks `path` as handled by renaming it in place with a `.` prefix, e.g.
/// `data/a.tsv.gz` becomes `data/.a.tsv.gz`. Returns the new path.
///
/// # Errors
///
/// Fails if `path` has no file name or the rename fails.
pub fn mark_handled(path: &Path) -> io::Result<PathBuf> {
    let target = handled_path(path)?;
    std::fs::rename(path, &target)?;
    Ok(target)
}

fn handled_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;

    let mut hidden = std::ffi::OsString::from(HANDLED_MARKER.to_string());
    hidden.push(name);
    Ok(path.with_file_name(hidden))
}
