// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw corpus to tensor batches:
//
//   CorpusSource (hub / local dir)
//       │
//       ▼
//   MetadataStripper  → drops headers, signatures, quoted lines
//       │
//       ▼
//   stratified_split  → seeded 80/20 split, per-class quotas
//       │
//       ▼
//   take_subset       → caps train/test sizes
//       │
//       ├──────────────────────────┐
//       ▼                          ▼
//   ClassificationDataset      PairSampler → PairDataset
//       │                          │
//       ▼                          ▼
//   ClassificationBatcher      PairBatcher
//       │                          │
//       ▼                          ▼
//   DataLoader → training loops (Layer 5)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Hub and local-directory corpus loaders
pub mod loader;

/// Header / footer / quote stripping for raw messages
pub mod preprocessor;

/// Seeded stratified train/test split and subsetting
pub mod splitter;

/// Shared load → split → subset step
pub mod prepare;

/// Rejection sampling of same-class / different-class pairs
pub mod pairs;

/// Implements Burn's Dataset trait for both sample kinds
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
