//! Project file loading and path resolution
//!
//! A project is described by one TOML file holding the observable source,
//! the competency models and the algorithm options selected by the user.
//!
//! # Resolution Priority
//! Project file:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `ecd.toml` in the user configuration directory
//!
//! Output directory:
//! 1. Command-line argument
//! 2. `[project] output_dir` (relative to the project file)
//! 3. OS-dependent data directory (fallback)

use crate::model::{CompetencyModel, EntityKey, UniCompetencyModel};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the project file
pub const PROJECT_ENV_VAR: &str = "ECD_PROJECT";

/// Project file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,

    /// Active algorithm configuration
    #[serde(default)]
    pub algorithm: AlgorithmSettings,

    /// Multi-dimensional model
    #[serde(default)]
    pub competencies: CompetencyModel,

    /// Uni-dimensional model
    #[serde(default)]
    pub uni_competencies: UniCompetencyModel,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory of the project file, used to resolve relative paths
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// `[project]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Project name, used for output folder naming
    pub name: String,

    /// Delimited text export of the logging spreadsheet
    pub observables: PathBuf,

    /// Output directory for artifacts (optional)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Column delimiter; auto-detected from the header row when absent
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Decimal separator used by the numeric cells
    #[serde(default)]
    pub decimal_separator: DecimalSeparator,
}

/// Fixed numeric format of the observable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    /// `1.5`
    #[default]
    Point,
    /// `1,5`
    Comma,
}

/// Model family used for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    #[default]
    NaiveBayes,
    DecisionTrees,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::NaiveBayes => "NaiveBayes",
            AlgorithmKind::DecisionTrees => "DecisionTrees",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[algorithm]` section: one options block per algorithm plus the selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlgorithmSettings {
    #[serde(default)]
    pub selected: AlgorithmKind,

    #[serde(default)]
    pub naive_bayes: NaiveBayesSettings,

    #[serde(default)]
    pub decision_trees: DecisionTreesSettings,

    /// K-Means options for entities without ground truth
    #[serde(default)]
    pub clustering: ClusteringSettings,
}

impl AlgorithmSettings {
    /// Convergence tolerance of the selected algorithm
    ///
    /// Shared with the K-Means step: clustering uses whatever tolerance the
    /// selected classifier is configured with.
    pub fn tolerance(&self) -> f64 {
        match self.selected {
            AlgorithmKind::NaiveBayes => self.naive_bayes.tolerance,
            AlgorithmKind::DecisionTrees => self.decision_trees.tolerance,
        }
    }

    /// Training percentage (0-100) of the selected algorithm
    pub fn percent_split(&self) -> f64 {
        match self.selected {
            AlgorithmKind::NaiveBayes => self.naive_bayes.percent_split,
            AlgorithmKind::DecisionTrees => self.decision_trees.percent_split,
        }
    }

    /// Override the training percentage of the selected algorithm
    pub fn set_percent_split(&mut self, percent: f64) {
        match self.selected {
            AlgorithmKind::NaiveBayes => self.naive_bayes.percent_split = percent,
            AlgorithmKind::DecisionTrees => self.decision_trees.percent_split = percent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_common("naive_bayes", self.naive_bayes.tolerance, self.naive_bayes.percent_split)?;
        validate_common(
            "decision_trees",
            self.decision_trees.tolerance,
            self.decision_trees.percent_split,
        )?;

        let cf = self.decision_trees.confidence_factor;
        if !(cf > 0.0 && cf <= 0.5) {
            return Err(Error::Config(format!(
                "decision_trees.confidence_factor must be in (0, 0.5], got {}",
                cf
            )));
        }
        if self.decision_trees.min_num_obj == 0 {
            return Err(Error::Config(
                "decision_trees.min_num_obj must be at least 1".to_string(),
            ));
        }
        if self.clustering.max_iterations == 0 || self.clustering.n_init == 0 {
            return Err(Error::Config(
                "clustering.max_iterations and clustering.n_init must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_common(section: &str, tolerance: f64, percent_split: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(Error::Config(format!(
            "{}.tolerance must be a positive number, got {}",
            section, tolerance
        )));
    }
    if !(0.0..=100.0).contains(&percent_split) {
        return Err(Error::Config(format!(
            "{}.percent_split must be within 0-100, got {}",
            section, percent_split
        )));
    }
    Ok(())
}

/// Gaussian Naive Bayes options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesSettings {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_percent_split")]
    pub percent_split: f64,
}

/// C4.5 decision tree options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreesSettings {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_percent_split")]
    pub percent_split: f64,

    /// Pruning confidence (default: 0.25)
    #[serde(default = "default_confidence_factor")]
    pub confidence_factor: f64,

    /// Minimum instances per branch (default: 2)
    #[serde(default = "default_min_num_obj")]
    pub min_num_obj: usize,

    /// Skip pessimistic-error pruning
    #[serde(default)]
    pub unpruned: bool,
}

/// K-Means options; k and the seed are fixed, the tolerance follows the
/// selected algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringSettings {
    /// Lloyd iterations per restart (default: 300)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Seeded restarts, lowest inertia kept (default: 10)
    #[serde(default = "default_n_init")]
    pub n_init: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_tolerance() -> f64 {
    0.001
}

fn default_percent_split() -> f64 {
    66.0
}

fn default_confidence_factor() -> f64 {
    0.25
}

fn default_min_num_obj() -> usize {
    2
}

fn default_max_iterations() -> usize {
    300
}

fn default_n_init() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NaiveBayesSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            percent_split: default_percent_split(),
        }
    }
}

impl Default for DecisionTreesSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            percent_split: default_percent_split(),
            confidence_factor: default_confidence_factor(),
            min_num_obj: default_min_num_obj(),
            unpruned: false,
        }
    }
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            n_init: default_n_init(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProjectConfig {
    /// Load and validate a project file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read project file {}: {}", path.display(), e))
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let config = Self::from_toml_str(&content, base_dir)?;
        info!(
            project = %config.project.name,
            competencies = config.competencies.competencies.len(),
            uni_competencies = config.uni_competencies.uni_competencies.len(),
            "Project file loaded from {}",
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate project TOML; relative paths resolve against `base_dir`
    pub fn from_toml_str(content: &str, base_dir: PathBuf) -> Result<Self> {
        let mut config: ProjectConfig = toml::from_str(content)?;
        config.base_dir = base_dir;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(Error::Config("project.name must not be empty".to_string()));
        }
        self.algorithm.validate()?;

        for competency in &self.competencies.competencies {
            if competency.name.trim().is_empty() {
                return Err(Error::Config("Competency with empty name".to_string()));
            }
            for facet in &competency.facets {
                if facet.name.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "Competency '{}' has a facet with empty name",
                        competency.name
                    )));
                }
            }
        }
        for uni in &self.uni_competencies.uni_competencies {
            if uni.name.trim().is_empty() {
                return Err(Error::Config("Uni-competency with empty name".to_string()));
            }
        }
        self.validate_entity_identity()
    }

    /// Every entity must have its own key and its own artifact files
    ///
    /// Stems are compared case-insensitively so that two entities never share
    /// a file on case-insensitive file systems either.
    fn validate_entity_identity(&self) -> Result<()> {
        let mut keys = self.competencies.entity_keys();
        keys.extend(self.uni_competencies.entity_keys());

        let mut seen_keys: HashSet<&EntityKey> = HashSet::new();
        let mut seen_stems: HashMap<String, &EntityKey> = HashMap::new();
        for key in &keys {
            if !seen_keys.insert(key) {
                return Err(Error::Config(format!("Entity '{}' is declared more than once", key)));
            }
            if let Some(other) = seen_stems.insert(key.file_stem().to_lowercase(), key) {
                return Err(Error::Config(format!(
                    "Entities '{}' and '{}' would share output files",
                    other, key
                )));
            }
        }
        Ok(())
    }

    /// Absolute path of the observable file
    pub fn observables_path(&self) -> PathBuf {
        self.base_dir.join(&self.project.observables)
    }

    /// Resolve the artifact output directory
    pub fn resolve_output_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Some(dir) = &self.project.output_dir {
            return self.base_dir.join(dir);
        }
        default_output_root().join(&self.project.name)
    }
}

/// Resolve the project file path
pub fn resolve_project_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: user configuration directory
    let candidate = dirs::config_dir()
        .map(|d| d.join("ecd-pipeline").join("ecd.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    debug!("Looking for project file at {}", candidate.display());
    if candidate.exists() {
        Ok(candidate)
    } else {
        Err(Error::NotFound(format!(
            "No project file given and {} does not exist",
            candidate.display()
        )))
    }
}

/// OS-dependent default artifact root
fn default_output_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ecd-pipeline"))
        .unwrap_or_else(|| PathBuf::from("./ecd_output"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [project]
        name = "demo"
        observables = "data.csv"
    "#;

    #[test]
    fn test_minimal_project_uses_defaults() {
        let config = ProjectConfig::from_toml_str(MINIMAL, PathBuf::from("/proj")).unwrap();

        assert_eq!(config.algorithm.selected, AlgorithmKind::NaiveBayes);
        assert_eq!(config.algorithm.percent_split(), 66.0);
        assert_eq!(config.algorithm.tolerance(), 0.001);
        assert_eq!(config.project.decimal_separator, DecimalSeparator::Point);
        assert_eq!(config.logging.level, "info");
        assert!(config.competencies.is_empty());
        assert_eq!(config.observables_path(), PathBuf::from("/proj/data.csv"));
    }

    #[test]
    fn test_tolerance_follows_selected_algorithm() {
        let toml = r#"
            [project]
            name = "demo"
            observables = "data.csv"

            [algorithm]
            selected = "decision_trees"

            [algorithm.naive_bayes]
            tolerance = 0.5

            [algorithm.decision_trees]
            tolerance = 0.01
            percent_split = 80
        "#;
        let config = ProjectConfig::from_toml_str(toml, PathBuf::from(".")).unwrap();
        assert_eq!(config.algorithm.tolerance(), 0.01);
        assert_eq!(config.algorithm.percent_split(), 80.0);
    }

    #[test]
    fn test_percent_split_out_of_range_rejected() {
        let toml = r#"
            [project]
            name = "demo"
            observables = "data.csv"

            [algorithm.naive_bayes]
            percent_split = 120
        "#;
        let result = ProjectConfig::from_toml_str(toml, PathBuf::from("."));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_output_dir_priority() {
        let mut config = ProjectConfig::from_toml_str(MINIMAL, PathBuf::from("/proj")).unwrap();
        assert_eq!(
            config.resolve_output_dir(Some(Path::new("/cli"))),
            PathBuf::from("/cli")
        );

        config.project.output_dir = Some(PathBuf::from("out"));
        assert_eq!(config.resolve_output_dir(None), PathBuf::from("/proj/out"));
    }
}
