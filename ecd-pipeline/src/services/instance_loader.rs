//! Instance matrix construction
//!
//! Joins the competency model against the loaded observables and transposes
//! each entity's observable series into per-instance rows:
//! `matrix[instance][column] = observable[column].values[instance]`.
//!
//! Entities come back in processing order (each competency followed by its
//! facets; uni-competencies in declaration order). A competency's columns
//! are its facets' observables in facet order, first occurrence kept.

use crate::error::EntityBuildError;
use crate::models::InstanceMatrix;
use ecd_common::{CompetencyModel, EntityKey, ObservableSet, UniCompetencyModel};

/// Instance matrix (or build error) for one entity
#[derive(Debug, Clone)]
pub struct EntityInstances {
    pub key: EntityKey,
    pub result: Result<InstanceMatrix, EntityBuildError>,
    /// Declared columns removed because they carry the entity's own name
    pub excluded: Vec<String>,
}

/// Builds instance matrices from one observable set
pub struct InstanceLoader<'a> {
    observables: &'a ObservableSet,
}

impl<'a> InstanceLoader<'a> {
    pub fn new(observables: &'a ObservableSet) -> Self {
        Self { observables }
    }

    /// One matrix per competency and per facet
    pub fn load_instances(&self, model: &CompetencyModel) -> Vec<EntityInstances> {
        let mut entities = Vec::new();
        for competency in &model.competencies {
            let key = EntityKey::competency(&competency.name);
            entities.push(self.build(key, &competency.observable_names()));

            for facet in &competency.facets {
                let key = EntityKey::facet(&competency.name, &facet.name);
                let names: Vec<&str> = facet.observables.iter().map(String::as_str).collect();
                entities.push(self.build(key, &names));
            }
        }
        entities
    }

    /// One matrix per uni-competency
    pub fn load_instances_uni(&self, model: &UniCompetencyModel) -> Vec<EntityInstances> {
        model
            .uni_competencies
            .iter()
            .map(|uni| {
                let names: Vec<&str> = uni.observables.iter().map(String::as_str).collect();
                self.build(EntityKey::uni(&uni.name), &names)
            })
            .collect()
    }

    /// Build the matrix for one entity from its declared observable names
    ///
    /// - no declared name matches: empty matrix (entity cannot be trained)
    /// - some names missing: `MissingObservables`
    /// - series of different lengths: `LengthMismatch`
    pub fn build(&self, key: EntityKey, declared: &[&str]) -> EntityInstances {
        let mut names: Vec<&str> = Vec::new();
        let mut excluded = Vec::new();
        for &name in declared {
            if name == key.name() {
                if !excluded.iter().any(|e: &String| e == name) {
                    excluded.push(name.to_string());
                }
            } else if !names.contains(&name) {
                names.push(name);
            }
        }

        let result = self.assemble(&names);
        if let Err(e) = &result {
            tracing::debug!(entity = %key, error = %e, "Instance matrix not built");
        }

        EntityInstances {
            key,
            result,
            excluded,
        }
    }

    fn assemble(&self, names: &[&str]) -> Result<InstanceMatrix, EntityBuildError> {
        let found: Vec<_> = names.iter().filter_map(|n| self.observables.get(n)).collect();
        if found.is_empty() {
            return Ok(InstanceMatrix::empty());
        }
        if found.len() < names.len() {
            let missing = names
                .iter()
                .filter(|n| !self.observables.contains(n))
                .map(|n| n.to_string())
                .collect();
            return Err(EntityBuildError::MissingObservables { names: missing });
        }

        let expected = found[0].len();
        if let Some(ragged) = found.iter().find(|o| o.len() != expected) {
            return Err(EntityBuildError::LengthMismatch {
                column: ragged.name.clone(),
                expected,
                found: ragged.len(),
            });
        }

        let columns = found.iter().map(|o| o.name.clone()).collect();
        let series: Vec<&[f64]> = found.iter().map(|o| o.values.as_slice()).collect();
        Ok(InstanceMatrix::from_columns(columns, &series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecd_common::{Competency, Facet, Observable, UniCompetency};

    fn observables() -> ObservableSet {
        let (set, _) = ObservableSet::from_observables(vec![
            Observable::new("moves", vec![1.0, 2.0, 3.0]),
            Observable::new("pauses", vec![4.0, 5.0, 6.0]),
            Observable::new("retries", vec![7.0, 8.0, 9.0]),
            Observable::new("short", vec![1.0]),
        ]);
        set
    }

    fn facet(name: &str, observables: &[&str]) -> Facet {
        Facet {
            name: name.to_string(),
            observables: observables.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_processing_order_and_concatenation() {
        let model = CompetencyModel::new(vec![Competency {
            name: "Planning".to_string(),
            facets: vec![facet("A", &["moves", "pauses"]), facet("B", &["pauses", "retries"])],
        }]);
        let obs = observables();
        let built = InstanceLoader::new(&obs).load_instances(&model);

        let keys: Vec<String> = built.iter().map(|e| e.key.to_string()).collect();
        assert_eq!(keys, vec!["Planning", "Planning/A", "Planning/B"]);

        let competency = built[0].result.as_ref().unwrap();
        assert_eq!(competency.columns, vec!["moves", "pauses", "retries"]);
        assert_eq!(competency.rows[0], vec![1.0, 4.0, 7.0]);
        assert_eq!(competency.num_instances(), 3);
    }

    #[test]
    fn test_zero_matched_observables_gives_empty_matrix() {
        let obs = observables();
        let built = InstanceLoader::new(&obs).build(EntityKey::facet("C", "F"), &["nope", "nada"]);
        let matrix = built.result.unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.num_columns(), 0);
    }

    #[test]
    fn test_partially_missing_observables_fail() {
        let obs = observables();
        let built = InstanceLoader::new(&obs).build(EntityKey::facet("C", "F"), &["moves", "nope"]);
        assert_eq!(
            built.result.unwrap_err(),
            EntityBuildError::MissingObservables {
                names: vec!["nope".to_string()]
            }
        );
    }

    #[test]
    fn test_length_mismatch_fails() {
        let obs = observables();
        let built = InstanceLoader::new(&obs).build(EntityKey::uni("U"), &["moves", "short"]);
        assert_eq!(
            built.result.unwrap_err(),
            EntityBuildError::LengthMismatch {
                column: "short".to_string(),
                expected: 3,
                found: 1
            }
        );
    }

    #[test]
    fn test_own_label_column_excluded() {
        let (obs, _) = ObservableSet::from_observables(vec![
            Observable::new("moves", vec![1.0, 2.0]),
            Observable::new("Grit", vec![0.0, 2.0]),
        ]);
        let model = UniCompetencyModel::new(vec![UniCompetency {
            name: "Grit".to_string(),
            observables: vec!["moves".to_string(), "Grit".to_string()],
        }]);
        let built = InstanceLoader::new(&obs).load_instances_uni(&model);

        assert_eq!(built[0].excluded, vec!["Grit".to_string()]);
        assert_eq!(built[0].result.as_ref().unwrap().columns, vec!["moves"]);
    }
}
