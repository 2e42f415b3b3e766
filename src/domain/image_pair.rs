// ============================================================
// Layer 3 - ImagePair Domain Type
// ============================================================
// One training example as it exists on disk: a hazy image and
// the clean image of the same scene. Both files share a stem
// (the id) and live in two sibling directories:
//
//   data/
//     hazy/0001.png     <- network input
//     normal/0001.png   <- reconstruction target
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A filename-matched pair of images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePair {
    /// File stem shared by both images
    pub id: String,

    /// Path of the hazy image fed to the network
    pub hazy: PathBuf,

    /// Path of the clean image the network should reproduce
    pub clean: PathBuf,
}

impl ImagePair {
    pub fn new(id: impl Into<String>, hazy: impl Into<PathBuf>, clean: impl Into<PathBuf>) -> Self {
        Self {
            id:    id.into(),
            hazy:  hazy.into(),
            clean: clean.into(),
        }
    }
}
