// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer asks a PairSource for image pairs and
// never learns where they came from. PairedDirLoader is the
// only implementation today (two sibling directories).
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::image_pair::ImagePair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can enumerate hazy/clean image pairs.
pub trait PairSource {
    /// List every usable pair, in a stable order.
    fn load_pairs(&self) -> Result<Vec<ImagePair>>;
}
