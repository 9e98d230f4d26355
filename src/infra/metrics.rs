// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean loss over all training batches
//   - train_acc:  correct / training-set size (classifier only;
//                 left empty for contrastive fine-tuning)
//
// Output file: <output_dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,train_acc
//   1,2.631200,0.214000
//   2,1.402300,0.688000
//
// Each run starts a fresh file; an artifact directory holds the
// metrics of the run that produced it.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const METRICS_FILE: &str = "metrics.csv";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average loss over all training batches
    pub train_loss: f64,

    /// Fraction of training samples classified correctly, if the
    /// objective is a classification one
    pub train_acc: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, train_acc: Option<f64>) -> Self {
        Self { epoch, train_loss, train_acc }
    }

    fn to_csv_row(&self) -> String {
        let acc = self.train_acc.map(|a| format!("{a:.6}")).unwrap_or_default();
        format!("{},{:.6},{}", self.epoch, self.train_loss, acc)
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create `dir` if needed and start a new CSV with its header row.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join(METRICS_FILE);
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,train_acc")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.to_csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}",
            m.epoch,
            m.train_loss,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
