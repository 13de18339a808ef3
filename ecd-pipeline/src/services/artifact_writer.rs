//! Per-entity artifacts and the run summary
//!
//! Every entity owns its own files, derived from its key:
//! - `<stem>.arff`: instance file, with a nominal `class {0,1,2}` attribute
//!   once labelled
//! - `<stem>.report.json`: entity result (performance, reliability, outcome)
//!
//! plus one `summary.json` per run. Files are overwritten whole.

use crate::models::{AssessmentSession, EntityResult, InstanceMatrix, LabelArray, NUM_CLASSES};
use anyhow::{Context, Result};
use ecd_common::EntityKey;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Run summary written at the end of every session
#[derive(Debug, Serialize)]
pub struct SessionSummary<'a> {
    pub session: &'a AssessmentSession,
    pub entities: &'a [EntityResult],
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })
    }

    pub fn arff_path(&self, key: &EntityKey) -> PathBuf {
        self.output_dir.join(format!("{}.arff", key.file_stem()))
    }

    pub fn report_path(&self, key: &EntityKey) -> PathBuf {
        self.output_dir.join(format!("{}.report.json", key.file_stem()))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("summary.json")
    }

    pub fn write_arff(
        &self,
        key: &EntityKey,
        matrix: &InstanceMatrix,
        labels: Option<&LabelArray>,
    ) -> Result<PathBuf> {
        let path = self.arff_path(key);
        let content = render_arff(&key.file_stem(), matrix, labels);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_report(&self, result: &EntityResult) -> Result<PathBuf> {
        let path = self.report_path(&result.key);
        write_json(&path, result)?;
        Ok(path)
    }

    pub fn write_summary(&self, summary: &SessionSummary<'_>) -> Result<PathBuf> {
        let path = self.summary_path();
        write_json(&path, summary)?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// ARFF text for one entity; NaN and missing labels are written as `?`
pub fn render_arff(relation: &str, matrix: &InstanceMatrix, labels: Option<&LabelArray>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "@relation {}", quote(relation));
    out.push('\n');
    for column in &matrix.columns {
        let _ = writeln!(out, "@attribute {} numeric", quote(column));
    }
    if labels.is_some() {
        let classes: Vec<String> = (0..NUM_CLASSES).map(|c| c.to_string()).collect();
        let _ = writeln!(out, "@attribute class {{{}}}", classes.join(","));
    }
    out.push_str("\n@data\n");

    for (i, row) in matrix.rows.iter().enumerate() {
        let mut cells: Vec<String> = row
            .iter()
            .map(|v| if v.is_finite() { v.to_string() } else { "?".to_string() })
            .collect();
        if let Some(labels) = labels {
            let label = labels
                .labels
                .get(i)
                .filter(|&&l| (0..NUM_CLASSES as i32).contains(&l))
                .map_or_else(|| "?".to_string(), |l| l.to_string());
            cells.push(label);
        }
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn quote(name: &str) -> String {
    format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
}
