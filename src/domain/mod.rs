// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system
// works with: image pairs on disk and the CHW patches they
// become after preprocessing.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A hazy/clean pair of files on disk
pub mod image_pair;

// A normalised channels x height x width pixel buffer
pub mod patch;

// Core abstractions (traits) that other layers implement
pub mod traits;
