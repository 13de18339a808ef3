//! # ECD Common Library
//!
//! Shared code for the Evidence-Centered-Design assessment pipeline:
//! - Error type shared by all crates
//! - Project file configuration (TOML) and path resolution
//! - Competency model (competency → facet → observable) and the observable set
//! - Event types and the EventBus used for step progress notification

pub mod config;
pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
pub use model::{
    Competency, CompetencyModel, EntityKey, Facet, Observable, ObservableSet, UniCompetency,
    UniCompetencyModel,
};
