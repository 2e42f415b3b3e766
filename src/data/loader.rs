// ============================================================
// Layer 4 - Paired Directory Loader
// ============================================================
// Finds image pairs in two sibling directories:
//
//   <clean_dir>/<id>.<ext>   the clean (normal) image
//   <hazy_dir>/<id>.<ext>    the hazy image of the same scene
//
// Ids come from the clean directory; the hazy partner must carry
// the same file name, extension case included. Hidden files (leading '.')
// and files with another extension are ignored. A clean image
// without a hazy partner is skipped with a warning so one stray
// file does not abort a whole training run.
//
// Reference: Rust Book §9 (Error Handling), std::fs::read_dir

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::image_pair::ImagePair;
use crate::domain::traits::PairSource;

/// Loads hazy/clean pairs from two directories.
pub struct PairedDirLoader {
    clean_dir: PathBuf,
    hazy_dir:  PathBuf,
    extension: String,
}

impl PairedDirLoader {
    pub fn new(
        clean_dir: impl Into<PathBuf>,
        hazy_dir:  impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        let extension: String = extension.into();
        Self {
            clean_dir: clean_dir.into(),
            hazy_dir:  hazy_dir.into(),
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    fn file_id(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        if name.starts_with('.') {
            return None;
        }
        let ext = path.extension()?.to_str()?.to_lowercase();
        if ext != self.extension {
            return None;
        }
        path.file_stem()?.to_str().map(str::to_string)
    }
}

impl PairSource for PairedDirLoader {
    fn load_pairs(&self) -> Result<Vec<ImagePair>> {
        let entries = fs::read_dir(&self.clean_dir).with_context(|| {
            format!("Cannot read clean image directory '{}'", self.clean_dir.display())
        })?;

        // (id, file name as found on disk)
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(id) = self.file_id(&path) {
                files.push((id, entry.file_name()));
            }
        }
        files.sort();

        let mut pairs = Vec::with_capacity(files.len());
        for (id, file) in files {
            let clean = self.clean_dir.join(&file);
            let hazy  = self.hazy_dir.join(&file);

            if !hazy.is_file() {
                tracing::warn!("Skipping '{}': no hazy partner at '{}'", id, hazy.display());
                continue;
            }
            pairs.push(ImagePair::new(id, hazy, clean));
        }

        tracing::info!(
            "Found {} image pairs in '{}' / '{}'",
            pairs.len(),
            self.clean_dir.display(),
            self.hazy_dir.display()
        );
        Ok(pairs)
    }
}
