use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::HarvestError;

/// Unpacks `archive_path` into `destination`, overwriting same-named files.
///
/// Every entry is read and checksummed before anything is written, so a bad
/// archive leaves the destination as it was. Returns the number of files written.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<usize, HarvestError> {
    validate_zip(archive_path)?;

    let mut archive = open_zip(archive_path)?;
    create_dir(destination)?;
    let mut written = 0usize;
    for_each_entry(&mut archive, |entry, is_dir, relative| {
        let target = destination.join(relative);
        if is_dir {
            return create_dir(&target);
        }
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        let mut outfile = fs::File::create(&target)
            .map_err(|err| extract_error(format!("write {}", target.display()), err))?;
        io::copy(entry, &mut outfile)
            .map_err(|err| extract_error(format!("write {}", target.display()), err))?;
        written += 1;
        Ok(())
    })?;
    Ok(written)
}

/// Reads every entry to the end so the zip reader checks its CRC.
pub fn validate_zip(zip_path: &Path) -> Result<(), HarvestError> {
    let mut archive = open_zip(zip_path)?;
    for_each_entry(&mut archive, |entry, is_dir, relative| {
        if is_dir {
            return Ok(());
        }
        io::copy(entry, &mut io::sink()).map_err(|err| {
            extract_error(format!("corrupt entry {}", relative.display()), err)
        })?;
        Ok(())
    })
}

/// Visits entries in archive order with their destination-relative path.
/// Entries that would land outside the destination abort the walk.
fn for_each_entry<F>(archive: &mut ZipArchive<fs::File>, mut visit: F) -> Result<(), HarvestError>
where
    F: FnMut(&mut dyn Read, bool, PathBuf) -> Result<(), HarvestError>,
{
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| extract_error(format!("entry #{index}"), err))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(HarvestError::Extract(format!(
                "entry {} escapes the destination directory",
                entry.name()
            )));
        };
        let is_dir = entry.is_dir();
        visit(&mut entry, is_dir, relative)?;
    }
    Ok(())
}

// The archive handle is dropped, and the file closed, when the caller's scope ends.
fn open_zip(zip_path: &Path) -> Result<ZipArchive<fs::File>, HarvestError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| extract_error(format!("open {}", zip_path.display()), err))?;
    ZipArchive::new(file).map_err(|err| {
        extract_error(format!("{} is not a valid zip archive", zip_path.display()), err)
    })
}

fn create_dir(path: &Path) -> Result<(), HarvestError> {
    fs::create_dir_all(path)
        .map_err(|err| extract_error(format!("create {}", path.display()), err))
}

fn extract_error(context: String, err: impl std::fmt::Display) -> HarvestError {
    HarvestError::Extract(format!("{context}: {err}"))
}
