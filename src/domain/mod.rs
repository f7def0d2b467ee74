// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the trainer works with:
// which dataset layout is in use, what a "pair" of images is,
// and the trait every pair source implements.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO image decoding
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The three supported dataset directory layouts
pub mod dataset_kind;

// Two image paths that share a semantic label
pub mod pair;

// Core abstractions (traits) that other layers implement
pub mod traits;
