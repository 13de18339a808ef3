//! Instance matrices, label arrays and the train/test split

use serde::{Deserialize, Serialize};

/// Number of ordinal label classes (Low / Medium / High)
pub const NUM_CLASSES: usize = 3;

/// Per-entity instance matrix, row-major by instance
///
/// Shape is `[num_instances][columns.len()]`. A matrix with zero columns is
/// legal and means the entity cannot be trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMatrix {
    /// Observable name of each column
    pub columns: Vec<String>,
    /// One row per instance
    pub rows: Vec<Vec<f64>>,
}

impl InstanceMatrix {
    /// Matrix with no columns and no instances
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Transpose per-observable series into per-instance rows
    ///
    /// Every series must have the same length; callers validate this first.
    pub fn from_columns(columns: Vec<String>, series: &[&[f64]]) -> Self {
        debug_assert_eq!(columns.len(), series.len());
        let num_instances = series.first().map(|s| s.len()).unwrap_or(0);
        let rows = (0..num_instances)
            .map(|instance| series.iter().map(|col| col[instance]).collect())
            .collect();
        Self { columns, rows }
    }

    pub fn num_instances(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when nothing can be trained on this matrix
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// Copy of one column
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// All columns, each as its own vector
    pub fn columns_as_series(&self) -> Vec<Vec<f64>> {
        (0..self.num_columns()).map(|j| self.column(j)).collect()
    }

    /// New matrix without the given column indices
    pub fn without_columns(&self, drop: &[usize]) -> Self {
        let keep: Vec<usize> = (0..self.num_columns())
            .filter(|j| !drop.contains(j))
            .collect();
        Self {
            columns: keep.iter().map(|&j| self.columns[j].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&j| row[j]).collect())
                .collect(),
        }
    }

    /// Columns whose value never changes within `rows[range]`
    pub fn constant_columns(&self, range: std::ops::Range<usize>) -> Vec<usize> {
        let rows = &self.rows[range];
        (0..self.num_columns())
            .filter(|&j| match rows.first() {
                Some(first) => rows.iter().all(|row| row[j] == first[j]),
                None => false,
            })
            .collect()
    }

    pub fn all_finite(&self) -> bool {
        self.rows.iter().flatten().all(|v| v.is_finite())
    }
}

/// Integer class label per instance, aligned with an instance matrix
///
/// Values are expected in {0, 1, 2}; the classifier validates this before
/// training.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelArray {
    pub labels: Vec<i32>,
}

impl LabelArray {
    pub fn new(labels: Vec<i32>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count of labels equal to 0, 1 and 2 (other values are not counted)
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for &label in &self.labels {
            if (0..NUM_CLASSES as i32).contains(&label) {
                counts[label as usize] += 1;
            }
        }
        counts
    }

    /// Labels as f64, for the statistics engine
    pub fn as_f64(&self) -> Vec<f64> {
        self.labels.iter().map(|&l| l as f64).collect()
    }
}

impl From<Vec<i32>> for LabelArray {
    fn from(labels: Vec<i32>) -> Self {
        Self::new(labels)
    }
}

/// Ordered train/test partition sizes
///
/// Rows `[0, train_size)` train, rows `[train_size, N)` test; instance order
/// is load order, never shuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train_size: usize,
    pub test_size: usize,
}

impl TrainTestSplit {
    /// `train_size = round(n * percent / 100)`, `test_size = n - train_size`
    ///
    /// `percent` is clamped to 0-100.
    pub fn from_percent(num_instances: usize, percent: f64) -> Self {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let train_size = ((num_instances as f64 * percent / 100.0).round() as usize)
            .min(num_instances);
        Self {
            train_size,
            test_size: num_instances - train_size,
        }
    }

    pub fn total(&self) -> usize {
        self.train_size + self.test_size
    }

    pub fn train_range(&self) -> std::ops::Range<usize> {
        0..self.train_size
    }

    pub fn test_range(&self) -> std::ops::Range<usize> {
        self.train_size..self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_transposes() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        let matrix =
            InstanceMatrix::from_columns(vec!["a".to_string(), "b".to_string()], &[&a, &b]);

        assert_eq!(matrix.num_instances(), 3);
        assert_eq!(matrix.rows[1], vec![2.0, 4.0]);
        assert_eq!(matrix.column(1), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_without_columns_keeps_order() {
        let matrix = InstanceMatrix {
            columns: vec!["a".into(), "b".into(), "c".into()],
            rows: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        };
        let reduced = matrix.without_columns(&[1]);
        assert_eq!(reduced.columns, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(reduced.rows, vec![vec![1.0, 3.0], vec![4.0, 6.0]]);
    }

    #[test]
    fn test_constant_columns_within_range() {
        let matrix = InstanceMatrix {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 7.0]],
        };
        assert_eq!(matrix.constant_columns(0..2), vec![1]);
        assert!(matrix.constant_columns(0..3).is_empty());
    }

    #[test]
    fn test_class_counts_ignore_out_of_range() {
        let labels = LabelArray::new(vec![0, 0, 2, 1, 5, -1]);
        assert_eq!(labels.class_counts(), [2, 1, 1]);
    }

    #[test]
    fn test_split_percent_66_of_100() {
        let split = TrainTestSplit::from_percent(100, 66.0);
        assert_eq!(split.train_size, 66);
        assert_eq!(split.test_size, 34);
        assert_eq!(split.test_range(), 66..100);
    }

    #[test]
    fn test_split_extremes() {
        assert_eq!(TrainTestSplit::from_percent(10, 0.0).train_size, 0);
        assert_eq!(TrainTestSplit::from_percent(10, 100.0).test_size, 0);
        assert_eq!(TrainTestSplit::from_percent(0, 50.0).total(), 0);
    }
}
