// ============================================================
// Layer 6 — Classification Report
// ============================================================
// Per-class precision / recall / F1 / support plus accuracy and
// macro / weighted averages, computed over the classes present
// in the ground truth:
//
//   precision_c = TP_c / (TP_c + FP_c)
//   recall_c    = TP_c / (TP_c + FN_c)
//   f1_c        = 2 · p · r / (p + r)
//
// Any ratio with a zero denominator is reported as 0. A predicted
// label outside the ground-truth class set only counts against the
// recall of the true class.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, fs, path::Path};

use crate::domain::document::label_name;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label:     usize,
    pub name:      String,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes:      Vec<ClassMetrics>,
    pub accuracy:     f64,
    pub macro_avg:    AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total:        usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) }
}

impl ClassificationReport {
    pub fn compute(y_true: &[usize], y_pred: &[usize], label_names: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            bail!("y_true has {} entries but y_pred has {}", y_true.len(), y_pred.len());
        }
        if y_true.is_empty() {
            bail!("Cannot build a classification report from zero samples");
        }

        let labels: BTreeSet<usize> = y_true.iter().copied().collect();
        let total   = y_true.len();
        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .map(|&label| {
                let tp      = y_true.iter().zip(y_pred).filter(|(t, p)| **t == label && **p == label).count();
                let support = y_true.iter().filter(|&&t| t == label).count();
                let predicted = y_pred.iter().filter(|&&p| p == label).count();

                let precision = ratio(tp, predicted);
                let recall    = ratio(tp, support);
                ClassMetrics {
                    label,
                    name: label_name(label_names, label),
                    precision,
                    recall,
                    f1: f1_score(precision, recall),
                    support,
                }
            })
            .collect();

        let n_classes = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall:    classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1:        classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        };
        let weight = |c: &ClassMetrics| c.support as f64 / total as f64;
        let weighted_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall:    classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1:        classes.iter().map(|c| c.f1 * weight(c)).sum(),
        };

        Ok(Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
            total,
        })
    }

    pub fn labels(&self) -> Vec<usize> {
        self.classes.iter().map(|c| c.label).collect()
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(REPORT_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write report to '{}'", path.display()))?;
        tracing::debug!("Saved classification report to '{}'", path.display());
        Ok(())
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.name, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.total)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.total
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_per_class_and_averages() {
        let y_true = [0, 0, 1, 1, 1, 2];
        let y_pred = [0, 1, 1, 1, 0, 2];
        let r = ClassificationReport::compute(&y_true, &y_pred, &names()).unwrap();

        assert!(close(r.accuracy, 4.0 / 6.0));
        let a = &r.classes[0];
        assert!(close(a.precision, 0.5) && close(a.recall, 0.5) && a.support == 2);
        let b = &r.classes[1];
        assert!(close(b.precision, 2.0 / 3.0) && close(b.recall, 2.0 / 3.0));
        let c = &r.classes[2];
        assert!(close(c.f1, 1.0));

        assert!(close(r.macro_avg.recall, (0.5 + 2.0 / 3.0 + 1.0) / 3.0));
        // weighted recall equals accuracy when every prediction is in-set
        assert!(close(r.weighted_avg.recall, r.accuracy));
    }

    #[test]
    fn test_class_list_is_ground_truth_labels() {
        let y_true = [2, 0, 2];
        let y_pred = [1, 0, 2];
        let r = ClassificationReport::compute(&y_true, &y_pred, &names()).unwrap();
        assert_eq!(r.labels(), vec![0, 2]);
        assert_eq!(r.classes[1].name, "c");
        assert!(close(r.classes[1].recall, 0.5));
        assert!(close(r.classes[1].precision, 1.0));
    }

    #[test]
    fn test_zero_division_is_zero() {
        let r = ClassificationReport::compute(&[0, 1], &[1, 1], &names()).unwrap();
        assert_eq!(r.classes[0].precision, 0.0);
        assert_eq!(r.classes[0].f1, 0.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(ClassificationReport::compute(&[], &[], &names()).is_err());
        assert!(ClassificationReport::compute(&[0], &[0, 1], &names()).is_err());
    }

    #[test]
    fn test_render_and_save() {
        let r = ClassificationReport::compute(&[0, 1], &[0, 1], &names()).unwrap();
        let text = r.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("accuracy"));

        let dir = tempfile::tempdir().unwrap();
        r.save(dir.path()).unwrap();
        let json = fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
        let back: ClassificationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
