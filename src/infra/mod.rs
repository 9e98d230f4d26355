// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   artifact.rs        — Saving and loading a finished run
//                        Manifest JSON plus CompactRecorder
//                        records for the model and probe.
//
//   tokenizer_store.rs — Pretrained tokenizer wrapper
//                        Truncation / padding to max_seq_len,
//                        copied into every artifact.
//
//   metrics.rs         — Training metrics logging
//                        Writes epoch-level metrics (loss,
//                        accuracy) to a CSV file.
//
//   report.rs          — Test-set classification report
//                        Precision / recall / F1 per class,
//                        printed and saved as JSON.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Artifact directory: manifest and module records
pub mod artifact;

/// Pretrained tokenizer loading, encoding and saving
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

/// Precision / recall / F1 report
pub mod report;
