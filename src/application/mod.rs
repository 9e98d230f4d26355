// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (fine-tuning or prediction).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Pipeline A: BERT sequence classifier
pub mod classifier_use_case;

// Pipeline B: sentence encoder + linear probe
pub mod embedding_use_case;

// Reload a saved model and classify text
pub mod predict_use_case;
