//! Project file loading and path resolution tests
//!
//! Tests that touch ECD_PROJECT are marked #[serial] so they never race
//! on the process environment.

use ecd_common::config::{resolve_project_path, AlgorithmKind, ProjectConfig, PROJECT_ENV_VAR};
use ecd_common::events::{LogSeverity, PipelineEvent};
use ecd_common::{EntityKey, Error};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

const FULL_PROJECT: &str = r#"
[project]
name = "ecology"
observables = "telemetry.csv"
delimiter = ";"
decimal_separator = "comma"

[algorithm]
selected = "decision_trees"

[algorithm.decision_trees]
percent_split = 70
confidence_factor = 0.2
min_num_obj = 3

[[competencies]]
name = "ProblemSolving"

[[competencies.facets]]
name = "Planning"
observables = ["moves", "pauses"]

[[competencies.facets]]
name = "Reflection"

[[uni_competencies]]
name = "Persistence"
observables = ["retries"]

[logging]
level = "debug"
"#;

#[test]
fn test_load_full_project_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.toml");
    std::fs::write(&path, FULL_PROJECT).unwrap();

    let config = ProjectConfig::load(&path).unwrap();

    assert_eq!(config.project.name, "ecology");
    assert_eq!(config.project.delimiter, Some(';'));
    assert_eq!(config.algorithm.selected, AlgorithmKind::DecisionTrees);
    assert_eq!(config.algorithm.percent_split(), 70.0);
    assert_eq!(config.algorithm.decision_trees.min_num_obj, 3);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.observables_path(), dir.path().join("telemetry.csv"));

    // Facet without an observable list is legal and empty
    let competency = config.competencies.competency("ProblemSolving").unwrap();
    assert!(competency.facet("Reflection").unwrap().observables.is_empty());

    let keys = config.competencies.entity_keys();
    assert_eq!(keys[0], EntityKey::competency("ProblemSolving"));
    assert_eq!(keys.len(), 3);
    assert_eq!(
        config.uni_competencies.entity_keys(),
        vec![EntityKey::uni("Persistence")]
    );
}

#[test]
fn test_missing_project_file_is_config_error() {
    let result = ProjectConfig::load(Path::new("/nonexistent/ecd/project.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let result = ProjectConfig::from_toml_str("[project\nname=", PathBuf::from("."));
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn test_empty_facet_name_rejected() {
    let toml = r#"
        [project]
        name = "demo"
        observables = "data.csv"

        [[competencies]]
        name = "C"

        [[competencies.facets]]
        name = "  "
    "#;
    let result = ProjectConfig::from_toml_str(toml, PathBuf::from("."));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_zero_tolerance_rejected() {
    let toml = r#"
        [project]
        name = "demo"
        observables = "data.csv"

        [algorithm.naive_bayes]
        tolerance = 0.0
    "#;
    assert!(ProjectConfig::from_toml_str(toml, PathBuf::from(".")).is_err());
}

#[test]
fn test_clustering_defaults_and_overrides() {
    let base = r#"
        [project]
        name = "demo"
        observables = "data.csv"
    "#;
    let config = ProjectConfig::from_toml_str(base, PathBuf::from(".")).unwrap();
    assert_eq!(config.algorithm.clustering.max_iterations, 300);
    assert_eq!(config.algorithm.clustering.n_init, 10);

    let tuned = format!("{}\n[algorithm.clustering]\nmax_iterations = 50\nn_init = 3\n", base);
    let config = ProjectConfig::from_toml_str(&tuned, PathBuf::from(".")).unwrap();
    assert_eq!(config.algorithm.clustering.max_iterations, 50);
    assert_eq!(config.algorithm.clustering.n_init, 3);

    let zero = format!("{}\n[algorithm.clustering]\nn_init = 0\n", base);
    assert!(matches!(
        ProjectConfig::from_toml_str(&zero, PathBuf::from(".")),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_duplicate_entity_names_rejected() {
    // Given: the same facet declared twice under one competency
    let toml = r#"
        [project]
        name = "demo"
        observables = "data.csv"

        [[competencies]]
        name = "C"

        [[competencies.facets]]
        name = "F"

        [[competencies.facets]]
        name = "F"
    "#;

    // Then: rejected before any entity is processed
    let err = ProjectConfig::from_toml_str(toml, PathBuf::from(".")).unwrap_err();
    assert!(err.to_string().contains("declared more than once"), "{}", err);
}

#[test]
fn test_names_sharing_output_files_rejected() {
    // Given: two competencies whose file names differ only by case
    let toml = r#"
        [project]
        name = "demo"
        observables = "data.csv"

        [[competencies]]
        name = "Grit"

        [[competencies]]
        name = "grit"
    "#;

    let err = ProjectConfig::from_toml_str(toml, PathBuf::from(".")).unwrap_err();
    assert!(err.to_string().contains("share output files"), "{}", err);
}

#[test]
fn test_same_name_across_entity_kinds_allowed() {
    // Given: names a lossy file naming would fold together
    let toml = r#"
        [project]
        name = "demo"
        observables = "data.csv"

        [[competencies]]
        name = "A_B"

        [[competencies]]
        name = "A"

        [[competencies.facets]]
        name = "B"

        [[competencies]]
        name = "uni_Grit"

        [[uni_competencies]]
        name = "Grit"
    "#;

    let config = ProjectConfig::from_toml_str(toml, PathBuf::from(".")).unwrap();
    assert_eq!(config.competencies.entity_keys().len(), 4);
}

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(PROJECT_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_project_path(Some(Path::new("/tmp/from-cli.toml")), PROJECT_ENV_VAR).unwrap();
    env::remove_var(PROJECT_ENV_VAR);

    assert_eq!(resolved, PathBuf::from("/tmp/from-cli.toml"));
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    env::set_var(PROJECT_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_project_path(None, PROJECT_ENV_VAR).unwrap();
    env::remove_var(PROJECT_ENV_VAR);

    assert_eq!(resolved, PathBuf::from("/tmp/from-env.toml"));
}

#[test]
fn test_log_entry_event_serializes_with_type_tag() {
    let event = PipelineEvent::LogEntry {
        session_id: uuid::Uuid::nil(),
        severity: LogSeverity::Warning,
        entity: Some("ProblemSolving/Planning".to_string()),
        message: "attribute is constant".to_string(),
        timestamp: chrono::Utc::now(),
    };

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "LogEntry");
    assert_eq!(json["severity"], "WARNING");
    assert_eq!(json["entity"], "ProblemSolving/Planning");
}
