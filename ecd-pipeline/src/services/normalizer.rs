//! Min-max normalization per observable column
//!
//! `v' = (v - min) / (max - min)` over all instances of the entity (no
//! train-only fit). A constant column has no range: its values become NaN
//! and its index is reported so the caller can drop or zero-fill it.

use crate::models::InstanceMatrix;
use serde::{Deserialize, Serialize};

/// Normalized matrix plus its degenerate (constant) columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMatrix {
    pub matrix: InstanceMatrix,
    /// Column indices whose max equals min (values are NaN)
    pub degenerate_columns: Vec<usize>,
}

impl NormalizedMatrix {
    pub fn degenerate_names(&self) -> Vec<String> {
        self.degenerate_columns
            .iter()
            .map(|&j| self.matrix.columns[j].clone())
            .collect()
    }

    /// Matrix with the degenerate columns removed
    pub fn without_degenerate(&self) -> InstanceMatrix {
        self.matrix.without_columns(&self.degenerate_columns)
    }
}

pub struct Normalizer;

impl Normalizer {
    pub fn normalize(matrix: &InstanceMatrix) -> NormalizedMatrix {
        let mut normalized = matrix.clone();
        let mut degenerate_columns = Vec::new();

        if matrix.num_instances() == 0 {
            return NormalizedMatrix {
                matrix: normalized,
                degenerate_columns,
            };
        }

        for j in 0..matrix.num_columns() {
            let (min, max) = matrix
                .rows
                .iter()
                .map(|row| row[j])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            let range = max - min;

            if range == 0.0 || !range.is_finite() {
                degenerate_columns.push(j);
                for row in &mut normalized.rows {
                    row[j] = f64::NAN;
                }
                continue;
            }
            for row in &mut normalized.rows {
                row[j] = (row[j] - min) / range;
            }
        }

        NormalizedMatrix {
            matrix: normalized,
            degenerate_columns,
        }
    }

    /// Alternative policy: degenerate columns set to 0 instead of dropped
    pub fn zero_fill(normalized: &NormalizedMatrix) -> InstanceMatrix {
        let mut matrix = normalized.matrix.clone();
        for row in &mut matrix.rows {
            for &j in &normalized.degenerate_columns {
                row[j] = 0.0;
            }
        }
        matrix
    }
}
