#![doc = "Districtor public API"]
//! Partition a region's units into contiguous, population-balanced districts
//! with a mixed-integer program.
//!
//! The pipeline runs in one direction:
//! [`UnitRegistry`] → [`AdjacencyGraph`] → [`DistrictingModel`] → [`Solver`] → [`Plan`].

pub mod config;
mod error;
pub mod graph;
pub mod io;
pub mod map;
pub mod model;
pub mod plan;
pub mod solve;

#[doc(inline)]
pub use error::{DistrictError, Result};

#[doc(inline)]
pub use map::{Exclusions, Unit, UnitId, UnitRecord, UnitRegistry};

#[doc(inline)]
pub use graph::{AdjacencyBuilder, AdjacencyGraph, AdjacencyRow};

#[doc(inline)]
pub use model::{DistrictingModel, ModelConfig, ModelWarning, ObjectiveMode, ToleranceBand};

#[doc(inline)]
pub use solve::{SolveOutcome, SolveStatus, Solver, StoppingPolicy};

#[doc(inline)]
pub use plan::{DistrictAssignment, DistrictLabel, DistrictStats, Plan};

#[doc(inline)]
pub use config::ScenarioConfig;
