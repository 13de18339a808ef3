//! Competency model and observable data
//!
//! The multi-dimensional model is an explicit tree:
//! `Competency { facets: [Facet { observables: [name, ...] }] }`.
//! The uni-dimensional model skips the facet level.
//!
//! Observables are the named numeric series loaded from the logging
//! spreadsheet. Names are unique within an [`ObservableSet`]; the set keeps
//! load order and a name → index map built once per run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Observables
// ============================================================================

/// A named series of numeric measurements, one value per logged instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    /// Column name (unique within the set)
    pub name: String,
    /// One value per instance, in load order
    pub values: Vec<f64>,
}

impl Observable {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Number of instances in this series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered set of observables with name lookup
///
/// Insertion keeps the first observable for a given name; later duplicates
/// are rejected so lookups are unambiguous.
#[derive(Debug, Clone, Default)]
pub struct ObservableSet {
    observables: Vec<Observable>,
    index: HashMap<String, usize>,
}

impl ObservableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list, returning the names of rejected duplicates
    pub fn from_observables(observables: Vec<Observable>) -> (Self, Vec<String>) {
        let mut set = Self::new();
        let mut duplicates = Vec::new();
        for observable in observables {
            let name = observable.name.clone();
            if !set.insert(observable) {
                duplicates.push(name);
            }
        }
        (set, duplicates)
    }

    /// Insert an observable. Returns `false` (and drops it) if the name exists.
    pub fn insert(&mut self, observable: Observable) -> bool {
        if self.index.contains_key(&observable.name) {
            return false;
        }
        self.index
            .insert(observable.name.clone(), self.observables.len());
        self.observables.push(observable);
        true
    }

    /// Exact-name lookup
    pub fn get(&self, name: &str) -> Option<&Observable> {
        self.index.get(name).map(|&i| &self.observables[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.observables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observable> {
        self.observables.iter()
    }

    /// Observable names in load order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.observables.iter().map(|o| o.name.as_str())
    }
}

// ============================================================================
// Multi-dimensional model
// ============================================================================

/// A facet of a competency, evidenced by a list of observable names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub name: String,
    /// Statistical submodel: observable names in declaration order (may be empty)
    #[serde(default)]
    pub observables: Vec<String>,
}

/// A competency decomposed into facets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub name: String,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

impl Competency {
    pub fn facet(&self, name: &str) -> Option<&Facet> {
        self.facets.iter().find(|f| f.name == name)
    }

    /// Observable names across all facets, first occurrence wins
    pub fn observable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for facet in &self.facets {
            for name in &facet.observables {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// Ordered sequence of competencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetencyModel {
    pub competencies: Vec<Competency>,
}

impl CompetencyModel {
    pub fn new(competencies: Vec<Competency>) -> Self {
        Self { competencies }
    }

    pub fn competency(&self, name: &str) -> Option<&Competency> {
        self.competencies.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.competencies.is_empty()
    }

    /// Entity keys in processing order: each competency followed by its facets
    pub fn entity_keys(&self) -> Vec<EntityKey> {
        let mut keys = Vec::new();
        for competency in &self.competencies {
            keys.push(EntityKey::competency(&competency.name));
            for facet in &competency.facets {
                keys.push(EntityKey::facet(&competency.name, &facet.name));
            }
        }
        keys
    }

    /// Declared observable references that are missing from `observables`
    pub fn unknown_references(&self, observables: &ObservableSet) -> Vec<(EntityKey, String)> {
        let mut unknown = Vec::new();
        for competency in &self.competencies {
            for facet in &competency.facets {
                for name in &facet.observables {
                    if !observables.contains(name) {
                        unknown.push((EntityKey::facet(&competency.name, &facet.name), name.clone()));
                    }
                }
            }
        }
        unknown
    }
}

// ============================================================================
// Uni-dimensional model
// ============================================================================

/// A competency modelled directly over observables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniCompetency {
    pub name: String,
    #[serde(default)]
    pub observables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniCompetencyModel {
    pub uni_competencies: Vec<UniCompetency>,
}

impl UniCompetencyModel {
    pub fn new(uni_competencies: Vec<UniCompetency>) -> Self {
        Self { uni_competencies }
    }

    pub fn uni_competency(&self, name: &str) -> Option<&UniCompetency> {
        self.uni_competencies.iter().find(|u| u.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.uni_competencies.is_empty()
    }

    pub fn entity_keys(&self) -> Vec<EntityKey> {
        self.uni_competencies
            .iter()
            .map(|u| EntityKey::uni(&u.name))
            .collect()
    }

    pub fn unknown_references(&self, observables: &ObservableSet) -> Vec<(EntityKey, String)> {
        let mut unknown = Vec::new();
        for uni in &self.uni_competencies {
            for name in &uni.observables {
                if !observables.contains(name) {
                    unknown.push((EntityKey::uni(&uni.name), name.clone()));
                }
            }
        }
        unknown
    }
}

// ============================================================================
// Entity identity
// ============================================================================

/// Identifies one trainable entity of the model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKey {
    Competency { competency: String },
    Facet { competency: String, facet: String },
    Uni { competency: String },
}

impl EntityKey {
    pub fn competency(name: &str) -> Self {
        EntityKey::Competency {
            competency: name.to_string(),
        }
    }

    pub fn facet(competency: &str, facet: &str) -> Self {
        EntityKey::Facet {
            competency: competency.to_string(),
            facet: facet.to_string(),
        }
    }

    pub fn uni(name: &str) -> Self {
        EntityKey::Uni {
            competency: name.to_string(),
        }
    }

    /// The entity's own name; a ground-truth column carries this name
    pub fn name(&self) -> &str {
        match self {
            EntityKey::Competency { competency } => competency,
            EntityKey::Facet { facet, .. } => facet,
            EntityKey::Uni { competency } => competency,
        }
    }

    /// File stem for per-entity artifacts, unique per entity
    ///
    /// `c__<competency>`, `f__<competency>__<facet>` or `u__<uni>`. Name
    /// parts are escaped (see [`escape_name`]) and never contain `__`, so
    /// distinct keys never share a stem.
    pub fn file_stem(&self) -> String {
        match self {
            EntityKey::Competency { competency } => format!("c__{}", escape_name(competency)),
            EntityKey::Facet { competency, facet } => {
                format!("f__{}__{}", escape_name(competency), escape_name(facet))
            }
            EntityKey::Uni { competency } => format!("u__{}", escape_name(competency)),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Competency { competency } => write!(f, "{}", competency),
            EntityKey::Facet { competency, facet } => write!(f, "{}/{}", competency, facet),
            EntityKey::Uni { competency } => write!(f, "uni:{}", competency),
        }
    }
}

/// File-name-safe form of a name
///
/// ASCII letters, digits and `-` are kept; every other byte becomes `_`
/// followed by two uppercase hex digits (`"Tool Use"` → `"Tool_20Use"`).
/// The mapping is injective and its output never contains `__`.
pub fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("_{:02X}", byte));
        }
    }
    escaped
}
