// ============================================================
// Layer 2 - Data Configuration
// ============================================================
// Where the image pairs live and how they are preprocessed.
// Shared by the train and preview commands, and saved inside
// the training config so predict resizes with the same scale.
//
// Reference: serde documentation (derive)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{loader::PairedDirLoader, preprocessor::Preprocessor};

/// Location of the paired images and the preprocessing scale.
///
///   <data_dir>/<clean_subdir>/<id>.<extension>
///   <data_dir>/<hazy_subdir>/<id>.<extension>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir:     String,
    pub clean_subdir: String,
    pub hazy_subdir:  String,
    pub extension:    String,
    /// Resize factor in (0, 1]
    pub scale:        f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir:     "data".to_string(),
            clean_subdir: "normal".to_string(),
            hazy_subdir:  "hazy".to_string(),
            extension:    "png".to_string(),
            scale:        0.5,
        }
    }
}

impl DataConfig {
    pub fn clean_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.clean_subdir)
    }

    pub fn hazy_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.hazy_subdir)
    }

    pub fn loader(&self) -> PairedDirLoader {
        PairedDirLoader::new(self.clean_dir(), self.hazy_dir(), self.extension.clone())
    }

    pub fn preprocessor(&self) -> Result<Preprocessor> {
        Preprocessor::new(self.scale)
    }
}
