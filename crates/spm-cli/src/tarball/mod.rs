//! Packing a project directory into the gzip tarball the registry expects

use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use spm_core::error::{SpmError, SpmResult};
use tar::Builder;
use walkdir::{DirEntry, WalkDir};

/// Directories never shipped in a package
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "_site", "sea-modules"];

fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| IGNORED_DIRS.contains(&name))
}

/// Write a gzip tarball of `source_dir` to `writer`
pub fn create_tarball<W: Write>(writer: W, source_dir: &Path) -> SpmResult<()> {
    let gz_encoder = GzEncoder::new(writer, Compression::default());
    let mut tar_builder = Builder::new(gz_encoder);

    let walker = WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source_dir).to_path_buf();
            let source = e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop")
            });
            SpmError::io_at(path, source)
        })?;
        let path = entry.path();
        let relative_path = match path.strip_prefix(source_dir) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => continue,
        };

        if entry.file_type().is_file() {
            tar_builder
                .append_path_with_name(path, relative_path)
                .map_err(|e| SpmError::io_at(path, e))?;
        } else if entry.file_type().is_dir() {
            tar_builder
                .append_dir(relative_path, path)
                .map_err(|e| SpmError::io_at(path, e))?;
        }
        // symlinks are skipped
    }

    tar_builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| SpmError::io("Failed to finish tarball".to_string(), e))?;

    Ok(())
}

/// Pack `source_dir` into a new file at `target`
pub fn create_tarball_file(source_dir: &Path, target: &Path) -> SpmResult<u64> {
    let file = File::create(target).map_err(|e| SpmError::io_at(target, e))?;
    create_tarball(file, source_dir)?;

    let size = std::fs::metadata(target)
        .map_err(|e| SpmError::io_at(target, e))?
        .len();
    Ok(size)
}
