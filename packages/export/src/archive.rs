//! ZIP bundling of saved images.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::ExportError;

/// Writes every existing file in `paths` to a new archive at `dest`, each
/// as a deflated entry named by its file name.
///
/// Missing files and repeated entry names are skipped with a warning.
/// Returns the number of entries written.
///
/// # Errors
///
/// Returns [`ExportError`] if the archive cannot be created or a file
/// cannot be copied into it.
pub fn zip_files(paths: &[PathBuf], dest: &Path) -> Result<usize, ExportError> {
    let file = File::create(dest)?;
    let mut zip_writer = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut names = BTreeSet::new();
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping {}: no usable file name", path.display());
            continue;
        };
        if !path.is_file() {
            log::warn!("Skipping {}: not found", path.display());
            continue;
        }
        if !names.insert(name.to_owned()) {
            log::warn!("Skipping {}: duplicate entry name", path.display());
            continue;
        }

        zip_writer.start_file(name, options)?;
        let mut source = File::open(path)?;
        std::io::copy(&mut source, &mut zip_writer)?;
    }
    zip_writer.finish()?;

    log::info!("Archived {} file(s) to {}", names.len(), dest.display());
    Ok(names.len())
}
