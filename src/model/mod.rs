mod config;
mod index;
mod model;
mod warning;

pub use config::{DemographicBound, IsolatedUnitPolicy, ModelConfig, ObjectiveMode, ToleranceBand};
pub use index::{AssignKey, EdgeKey, ModelIndex};
pub use model::{DistrictingModel, ModelContext};
pub use warning::ModelWarning;
