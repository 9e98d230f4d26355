// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the corpus and the
// training signal. Nothing in here touches Burn, the tokenizer
// or the filesystem, so every type is usable from tests without
// a GPU or a network connection.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled newsgroup message and the corpus that owns it
pub mod document;

// A sampled same-class / different-class document pair
pub mod pair;

// Core abstractions (traits) that other layers implement
pub mod traits;
