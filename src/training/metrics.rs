use std::fmt;

use serde::Serialize;

pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    correct as f64 / y_true.len() as f64
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
/// `None` when only one class is present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let positives = y_true.iter().filter(|&&l| l == 1).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(y_true)
        .filter(|(_, l)| **l == 1)
        .map(|(r, _)| r)
        .sum();
    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 with macro and weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
}

impl ClassificationReport {
    pub fn new(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut labels: Vec<u8> = y_true.iter().chain(y_pred).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .map(|&label| {
                let pairs = || y_true.iter().zip(y_pred);
                let tp = pairs().filter(|(t, p)| **t == label && **p == label).count() as f64;
                let predicted = y_pred.iter().filter(|&&p| p == label).count() as f64;
                let support = y_true.iter().filter(|&&t| t == label).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support as f64);
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1: ratio(2.0 * precision * recall, precision + recall),
                    support,
                }
            })
            .collect();

        let total = y_true.len() as f64;
        let macro_f1 = ratio(classes.iter().map(|c| c.f1).sum(), classes.len() as f64);
        let weighted_f1 = ratio(
            classes.iter().map(|c| c.f1 * c.support as f64).sum(),
            total,
        );

        Self {
            classes,
            accuracy: accuracy(y_true, y_pred),
            macro_f1,
            weighted_f1,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        let support: usize = self.classes.iter().map(|c| c.support).sum();
        writeln!(f)?;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, support)?;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "macro f1", "", "", self.macro_f1, support)?;
        write!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "weighted f1", "", "", self.weighted_f1, support)
    }
}

/// Zero when the denominator is zero, matching the usual report convention.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
