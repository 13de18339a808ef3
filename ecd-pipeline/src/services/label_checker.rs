//! Ground-truth label detection
//!
//! An entity is labelled when an observable carries exactly the entity's own
//! name. Name lookup only.

use ecd_common::{CompetencyModel, EntityKey, ObservableSet, UniCompetencyModel};
use serde::{Deserialize, Serialize};

/// Labelled / unlabelled decision per entity, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPresenceFlags {
    pub entries: Vec<(EntityKey, bool)>,
}

impl LabelPresenceFlags {
    /// False for entities that were never checked
    pub fn is_labelled(&self, key: &EntityKey) -> bool {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or(false, |(_, labelled)| *labelled)
    }

    pub fn labelled_count(&self) -> usize {
        self.entries.iter().filter(|(_, l)| *l).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: LabelPresenceFlags) {
        self.entries.extend(other.entries);
    }
}

pub struct LabelChecker;

impl LabelChecker {
    /// Flags for every competency and facet
    pub fn check_labelling(observables: &ObservableSet, model: &CompetencyModel) -> LabelPresenceFlags {
        let entries = model
            .entity_keys()
            .into_iter()
            .map(|key| {
                let labelled = observables.contains(key.name());
                (key, labelled)
            })
            .collect();
        LabelPresenceFlags { entries }
    }

    /// Flags for every uni-competency
    pub fn check_labelling_uni(
        observables: &ObservableSet,
        model: &UniCompetencyModel,
    ) -> LabelPresenceFlags {
        let entries = model
            .entity_keys()
            .into_iter()
            .map(|key| {
                let labelled = observables.contains(key.name());
                (key, labelled)
            })
            .collect();
        LabelPresenceFlags { entries }
    }
}
