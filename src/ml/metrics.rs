//! Binary classification metrics over pooled held-out predictions

use serde::Serialize;

use super::MlError;

/// Held-out classification metrics; the first four are computed at a 0.5
/// probability threshold, ROC-AUC on the raw probabilities.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub mcc: f64,
    pub roc_auc: f64,
}

/// Probability threshold separating the predicted classes
pub const THRESHOLD: f64 = 0.5;

/// Compute all metrics for one set of labels and predicted probabilities
pub fn classification_metrics(
    labels: &[u8],
    probabilities: &[f64],
) -> Result<Metrics, MlError> {
    debug_assert_eq!(labels.len(), probabilities.len());

    let (tp, tn, fp, fn_) = confusion(labels, probabilities);
    let n = (tp + tn + fp + fn_) as f64;

    let accuracy = if n > 0.0 { (tp + tn) as f64 / n } else { 0.0 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let mcc = matthews(tp, tn, fp, fn_);
    let roc_auc = roc_auc(labels, probabilities)?;

    Ok(Metrics {
        accuracy,
        precision,
        recall,
        mcc,
        roc_auc,
    })
}

/// Confusion counts (tp, tn, fp, fn) at the fixed threshold
fn confusion(labels: &[u8], probabilities: &[f64]) -> (u64, u64, u64, u64) {
    let mut tp = 0;
    let mut tn = 0;
    let mut fp = 0;
    let mut fn_ = 0;

    for (&label, &p) in labels.iter().zip(probabilities.iter()) {
        let predicted = if p > THRESHOLD { 1 } else { 0 };
        match (label, predicted) {
            (1, 1) => tp += 1,
            (0, 0) => tn += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => unreachable!("labels are validated to be 0 or 1"),
        }
    }

    (tp, tn, fp, fn_)
}

fn ratio(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Matthews correlation coefficient; zero when any marginal is empty
fn matthews(tp: u64, tn: u64, fp: u64, fn_: u64) -> f64 {
    let denom = ((tp + fp) as f64
        * (tp + fn_) as f64
        * (tn + fp) as f64
        * (tn + fn_) as f64)
        .sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (tp as f64 * tn as f64 - fp as f64 * fn_ as f64) / denom
}

/// Area under the ROC curve by the rank-sum (Mann-Whitney) statistic, with
/// tied probabilities assigned their average rank.
pub fn roc_auc(labels: &[u8], probabilities: &[f64]) -> Result<f64, MlError> {
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(MlError::SingleClass);
    }

    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        probabilities[a]
            .partial_cmp(&probabilities[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks over ties, accumulate ranks of the positive class
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len()
            && probabilities[order[j + 1]] == probabilities[order[i]]
        {
            j += 1;
        }

        // Ranks are 1-based; tied entries share the average rank
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Ok(u / (n_pos * n_neg) as f64)
}
