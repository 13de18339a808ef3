//! Statistics engine
//!
//! Correlation, reliability and error measures consumed by the labelling
//! and training steps. The pipeline only depends on [`StatisticsEngine`];
//! [`BuiltinStatistics`] is the in-process implementation.

use crate::error::StatsError;
use crate::models::RegressionMetrics;

/// Correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMethod {
    /// Rank correlation, average ranks for ties
    Spearman,
    Pearson,
}

pub trait StatisticsEngine: Send + Sync {
    /// Correlation between two equally long series
    fn correlate(&self, a: &[f64], b: &[f64], method: CorrelationMethod) -> Result<f64, StatsError>;

    /// Cronbach's alpha over item columns (`items[item][case]`)
    fn reliability(&self, items: &[Vec<f64>]) -> Result<f64, StatsError>;

    /// Error measures of `predicted` against `expected`
    fn regression_metrics(&self, expected: &[f64], predicted: &[f64]) -> Result<RegressionMetrics, StatsError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinStatistics;

impl StatisticsEngine for BuiltinStatistics {
    fn correlate(&self, a: &[f64], b: &[f64], method: CorrelationMethod) -> Result<f64, StatsError> {
        if a.len() != b.len() {
            return Err(StatsError::LengthMismatch(a.len(), b.len()));
        }
        match method {
            CorrelationMethod::Pearson => pearson(a, b),
            CorrelationMethod::Spearman => pearson(&ranks(a), &ranks(b)),
        }
    }

    fn reliability(&self, items: &[Vec<f64>]) -> Result<f64, StatsError> {
        let k = items.len();
        if k < 2 {
            return Err(StatsError::InsufficientData { required: 2, found: k });
        }
        let n = items[0].len();
        if let Some(item) = items.iter().find(|i| i.len() != n) {
            return Err(StatsError::LengthMismatch(n, item.len()));
        }
        if n < 2 {
            return Err(StatsError::InsufficientData { required: 2, found: n });
        }

        let item_variance: f64 = items.iter().map(|i| sample_variance(i)).sum();
        let totals: Vec<f64> = (0..n).map(|case| items.iter().map(|i| i[case]).sum()).collect();
        let total_variance = sample_variance(&totals);
        if total_variance == 0.0 {
            return Err(StatsError::ZeroVariance);
        }

        let k = k as f64;
        Ok(k / (k - 1.0) * (1.0 - item_variance / total_variance))
    }

    fn regression_metrics(&self, expected: &[f64], predicted: &[f64]) -> Result<RegressionMetrics, StatsError> {
        if expected.len() != predicted.len() {
            return Err(StatsError::LengthMismatch(expected.len(), predicted.len()));
        }
        if expected.is_empty() {
            return Err(StatsError::InsufficientData { required: 1, found: 0 });
        }

        let n = expected.len() as f64;
        let mean = expected.iter().sum::<f64>() / n;

        let mut abs_error = 0.0;
        let mut sq_error = 0.0;
        let mut abs_baseline = 0.0;
        let mut sq_baseline = 0.0;
        for (e, p) in expected.iter().zip(predicted) {
            abs_error += (e - p).abs();
            sq_error += (e - p).powi(2);
            abs_baseline += (e - mean).abs();
            sq_baseline += (e - mean).powi(2);
        }

        Ok(RegressionMetrics {
            mae: abs_error / n,
            rmse: (sq_error / n).sqrt(),
            rae_percent: 100.0 * ratio(abs_error, abs_baseline),
            rrse_percent: 100.0 * ratio(sq_error, sq_baseline).sqrt(),
        })
    }
}

/// NaN when the baseline is zero
fn ratio(numerator: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        f64::NAN
    } else {
        numerator / baseline
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0)
}

fn pearson(a: &[f64], b: &[f64]) -> Result<f64, StatsError> {
    if a.len() < 2 {
        return Err(StatsError::InsufficientData { required: 2, found: a.len() });
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return Err(StatsError::ZeroVariance);
    }
    Ok((cov / (va.sqrt() * vb.sqrt())).clamp(-1.0, 1.0))
}

/// 1-based ranks, tied values share their average rank
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = average;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_spearman_monotonic_is_one() {
        let stats = BuiltinStatistics;
        let rho = stats
            .correlate(&[1.0, 2.0, 3.0, 4.0], &[1.0, 4.0, 9.0, 16.0], CorrelationMethod::Spearman)
            .unwrap();
        assert!((rho - 1.0).abs() < EPS);

        let pearson = stats
            .correlate(&[1.0, 2.0, 3.0, 4.0], &[1.0, 4.0, 9.0, 16.0], CorrelationMethod::Pearson)
            .unwrap();
        assert!(pearson < 1.0 && pearson > 0.95);
    }

    #[test]
    fn test_average_ranks_for_ties() {
        assert_eq!(ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_correlation_errors() {
        let stats = BuiltinStatistics;
        assert_eq!(
            stats.correlate(&[1.0, 2.0], &[1.0], CorrelationMethod::Spearman),
            Err(StatsError::LengthMismatch(2, 1))
        );
        assert_eq!(
            stats.correlate(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0], CorrelationMethod::Spearman),
            Err(StatsError::ZeroVariance)
        );
    }

    #[test]
    fn test_cronbach_alpha() {
        // Three perfectly parallel items
        let items = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1.0, 2.0, 3.0, 4.0],
        ];
        let alpha = BuiltinStatistics.reliability(&items).unwrap();
        assert!((alpha - 1.0).abs() < EPS);

        assert_eq!(
            BuiltinStatistics.reliability(&items[..1]),
            Err(StatsError::InsufficientData { required: 2, found: 1 })
        );
    }

    #[test]
    fn test_regression_metrics() {
        let expected = [0.0, 1.0, 2.0, 1.0];
        let predicted = [0.0, 2.0, 2.0, 0.0];
        let m = BuiltinStatistics.regression_metrics(&expected, &predicted).unwrap();

        assert!((m.mae - 0.5).abs() < EPS);
        assert!((m.rmse - 0.5f64.sqrt()).abs() < EPS);
        // Baseline: mean 1.0, sum |e - mean| = 2, sum (e - mean)^2 = 2
        assert!((m.rae_percent - 100.0).abs() < EPS);
        assert!((m.rrse_percent - 100.0).abs() < EPS);
    }

    #[test]
    fn test_constant_expected_gives_nan_relative_errors() {
        let m = BuiltinStatistics
            .regression_metrics(&[1.0, 1.0], &[1.0, 2.0])
            .unwrap();
        assert!((m.mae - 0.5).abs() < EPS);
        assert!(m.rae_percent.is_nan());
        assert!(m.rrse_percent.is_nan());
    }
}
