//! Ground-truth label extraction
//!
//! Copies the observable named after the entity and coerces each value to an
//! integer class id by rounding (half away from zero). Values are not checked
//! against {0, 1, 2} here; the classifier rejects out-of-range labels.

use crate::models::LabelArray;
use ecd_common::{CompetencyModel, EntityKey, ObservableSet, UniCompetencyModel};

pub struct LabelExtractor;

impl LabelExtractor {
    /// Labels of every labelled competency and facet, in processing order
    pub fn get_labelled_data(
        model: &CompetencyModel,
        observables: &ObservableSet,
    ) -> Vec<(EntityKey, LabelArray)> {
        model
            .entity_keys()
            .into_iter()
            .filter_map(|key| Self::extract(&key, observables).map(|labels| (key, labels)))
            .collect()
    }

    /// Labels of every labelled uni-competency
    pub fn get_labelled_data_uni(
        model: &UniCompetencyModel,
        observables: &ObservableSet,
    ) -> Vec<(EntityKey, LabelArray)> {
        model
            .entity_keys()
            .into_iter()
            .filter_map(|key| Self::extract(&key, observables).map(|labels| (key, labels)))
            .collect()
    }

    /// Labels for one entity, None when no observable carries its name
    pub fn extract(key: &EntityKey, observables: &ObservableSet) -> Option<LabelArray> {
        let observable = observables.get(key.name())?;
        let labels = observable.values.iter().map(|&v| coerce_label(v)).collect();
        Some(LabelArray::new(labels))
    }
}

fn coerce_label(value: f64) -> i32 {
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecd_common::{Competency, Facet, Observable};

    fn observables() -> ObservableSet {
        let (set, _) = ObservableSet::from_observables(vec![
            Observable::new("moves", vec![3.0, 1.0, 2.0, 9.0]),
            Observable::new("Planning", vec![0.0, 1.4, 1.5, 2.0]),
        ]);
        set
    }

    #[test]
    fn test_values_rounded_to_class_ids() {
        let labels = LabelExtractor::extract(&EntityKey::facet("PS", "Planning"), &observables()).unwrap();
        assert_eq!(labels.labels, vec![0, 1, 2, 2]);
    }

    #[test]
    fn test_out_of_range_values_kept() {
        let (obs, _) = ObservableSet::from_observables(vec![Observable::new("X", vec![-1.0, 5.0])]);
        let labels = LabelExtractor::extract(&EntityKey::uni("X"), &obs).unwrap();
        assert_eq!(labels.labels, vec![-1, 5]);
    }

    #[test]
    fn test_only_labelled_entities_returned() {
        let model = CompetencyModel::new(vec![Competency {
            name: "PS".to_string(),
            facets: vec![
                Facet {
                    name: "Planning".to_string(),
                    observables: vec!["moves".to_string()],
                },
                Facet {
                    name: "Monitoring".to_string(),
                    observables: vec!["moves".to_string()],
                },
            ],
        }]);
        let labelled = LabelExtractor::get_labelled_data(&model, &observables());

        assert_eq!(labelled.len(), 1);
        assert_eq!(labelled[0].0, EntityKey::facet("PS", "Planning"));
    }
}
