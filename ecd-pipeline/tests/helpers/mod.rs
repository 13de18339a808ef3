//! Shared fixtures for ecd-pipeline integration tests

#![allow(dead_code)]

use ecd_common::config::ProjectConfig;
use ecd_pipeline::models::InstanceMatrix;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Build a matrix from column names and rows
pub fn matrix(columns: &[&str], rows: Vec<Vec<f64>>) -> InstanceMatrix {
    InstanceMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

/// One-column matrix
pub fn column_matrix(values: &[f64]) -> InstanceMatrix {
    matrix(&["x"], values.iter().map(|&v| vec![v]).collect())
}

/// Telemetry table with a clear three-level structure
///
/// Instance `i` belongs to level `i % 3`, so every level shows up early in
/// load order. `Planning` is a ground-truth column for the facet of that
/// name; `flat` never changes.
pub fn telemetry_csv(instances: usize) -> String {
    let mut csv = String::from("moves,pauses,retries,time_on_task,flat,Planning\n");
    for i in 0..instances {
        let level = (i % 3) as f64;
        let moves = level * 10.0 + (i % 7) as f64 * 0.3;
        let pauses = level * 5.0 + (i % 4) as f64 * 0.2;
        let retries = (2.0 - level) * 3.0 + (i % 5) as f64 * 0.1;
        let time_on_task = 30.0 + (i % 6) as f64 * 10.0;
        let _ = writeln!(
            csv,
            "{},{},{},{},1,{}",
            moves, pauses, retries, time_on_task, level
        );
    }
    csv
}

pub const PROJECT_TOML: &str = r#"
[project]
name = "demo"
observables = "telemetry.csv"
output_dir = "out"

[algorithm]
selected = "naive_bayes"

[algorithm.naive_bayes]
tolerance = 0.0001
percent_split = 66.0

[[competencies]]
name = "ProblemSolving"

[[competencies.facets]]
name = "Planning"
observables = ["moves", "pauses"]

[[competencies.facets]]
name = "Monitoring"
observables = ["retries", "flat"]

[[competencies.facets]]
name = "Reflection"
observables = []

[[competencies]]
name = "Orphan"

[[competencies.facets]]
name = "Ghost"
observables = ["missing_column"]

[[uni_competencies]]
name = "Persistence"
observables = ["retries", "time_on_task"]
"#;

/// Write the demo project into `dir` and load it
pub fn write_project(dir: &Path, project_toml: &str, csv: &str) -> ProjectConfig {
    std::fs::write(dir.join("telemetry.csv"), csv).unwrap();
    let path = project_path(dir);
    std::fs::write(&path, project_toml).unwrap();
    ProjectConfig::load(&path).unwrap()
}

pub fn project_path(dir: &Path) -> PathBuf {
    dir.join("ecd.toml")
}
