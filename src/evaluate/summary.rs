//! Per-method accuracy and coverage summaries of a result table.

use crate::data::ResultTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Significance level used for the rejection rate.
pub const REJECTION_ALPHA: f64 = 0.05;

/// Accuracy summary for one method across experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub method: String,
    /// Number of experiments with a result.
    pub count: usize,
    /// Mean of `estimate - true_effect`.
    pub mean_error: f64,
    pub mean_absolute_error: f64,
    pub rmse: f64,
    /// Sample standard deviation of the estimates.
    pub estimate_std: f64,
    /// Share of intervals containing the true effect.
    pub coverage: f64,
    /// Share of p-values below [`REJECTION_ALPHA`].
    pub rejection_rate: f64,
}

/// Summarize every method in `results`, sorted by method name.
pub fn summarize(results: &ResultTable) -> Vec<MethodSummary> {
    results
        .methods()
        .into_iter()
        .map(|method| {
            let rows: Vec<_> = results.for_method(&method).collect();
            let n = rows.len() as f64;
            let errors: Vec<f64> = rows.iter().map(|r| r.error()).collect();

            let mean_estimate = rows.iter().map(|r| r.estimate).sum::<f64>() / n;
            let estimate_std = if rows.len() > 1 {
                (rows
                    .iter()
                    .map(|r| (r.estimate - mean_estimate).powi(2))
                    .sum::<f64>()
                    / (n - 1.0))
                    .sqrt()
            } else {
                0.0
            };

            MethodSummary {
                count: rows.len(),
                mean_error: errors.iter().sum::<f64>() / n,
                mean_absolute_error: errors.iter().map(|e| e.abs()).sum::<f64>() / n,
                rmse: (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt(),
                estimate_std,
                coverage: rows.iter().filter(|r| r.effect().covers(r.true_effect)).count() as f64
                    / n,
                rejection_rate: rows
                    .iter()
                    .filter(|r| r.effect().is_significant_at(REJECTION_ALPHA))
                    .count() as f64
                    / n,
                method,
            }
        })
        .collect()
}

/// Render summaries as an aligned text table.
pub fn format_summaries(summaries: &[MethodSummary]) -> String {
    let mut out = format!(
        "{:<28} {:>6} {:>10} {:>10} {:>10} {:>10} {:>9} {:>9}\n",
        "method", "n", "bias", "mae", "rmse", "sd", "coverage", "reject"
    );
    for s in summaries {
        out.push_str(&s.to_string());
        out.push('\n');
    }
    out
}

impl fmt::Display for MethodSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<28} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>9.3} {:>9.3}",
            self.method,
            self.count,
            self.mean_error,
            self.mean_absolute_error,
            self.rmse,
            self.estimate_std,
            self.coverage,
            self.rejection_rate
        )
    }
}
