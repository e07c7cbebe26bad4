use std::path::{Path, PathBuf};

use crate::assets::manifest::{ImageManifest, MANIFEST_FILE_NAME};
use crate::foundation::error::{SlideError, SlideResult};

/// Images found in a job directory, before ordering.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSet {
    /// Plain directory listing in filesystem order. Order comes from file names.
    Listed(Vec<PathBuf>),
    /// Rows from an explicit manifest, as `(index, path)`.
    Manifest(Vec<(u32, PathBuf)>),
}

impl ImageSet {
    /// Number of candidate images.
    pub fn len(&self) -> usize {
        match self {
            Self::Listed(v) => v.len(),
            Self::Manifest(v) => v.len(),
        }
    }

    /// Return `true` when no candidate images were found.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// List the images of a job directory, leaving out the audio track.
///
/// A `manifest.json` in the directory takes precedence over the listing. Entries whose
/// extension is not a known image format are skipped.
pub fn load_image_set(job_dir: &Path, audio_file_name: &str) -> SlideResult<ImageSet> {
    let manifest_path = job_dir.join(MANIFEST_FILE_NAME);
    if manifest_path.is_file() {
        let manifest = ImageManifest::from_path(&manifest_path)?;
        let rows = manifest.resolve(job_dir)?;
        tracing::debug!(dir = %job_dir.display(), images = rows.len(), "loaded image manifest");
        return Ok(ImageSet::Manifest(rows));
    }

    let rd = std::fs::read_dir(job_dir).map_err(|e| SlideError::io(job_dir, e))?;
    let mut paths = Vec::new();
    for entry in rd {
        let entry = entry.map_err(|e| SlideError::io(job_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(audio_file_name) {
            continue;
        }
        if !is_image_path(&path) {
            tracing::debug!(path = %path.display(), "skipping non-image entry");
            continue;
        }
        paths.push(path);
    }

    tracing::debug!(dir = %job_dir.display(), images = paths.len(), "listed job directory");
    Ok(ImageSet::Listed(paths))
}

/// Return `true` when the extension names an image format.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(image::ImageFormat::from_extension)
        .is_some()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
