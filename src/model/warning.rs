use std::fmt;

use crate::map::UnitId;

/// A structurally suspicious but non-fatal condition found while building a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelWarning {
    /// An optimized unit (free or pinned) has no neighbors, so contiguity support cannot hold for it.
    /// `exempted` is true when the unit was left out of that constraint.
    IsolatedUnit { unit: UnitId, exempted: bool },
    /// Adjacency-based constraints were requested over a graph with no edges.
    EmptyGraph,
    /// There are fewer units able to populate districts than districts.
    MoreDistrictsThanUnits { districts: u32, units: usize },
}

impl fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsolatedUnit { unit, exempted: true } =>
                write!(f, "unit {unit} has no neighbors; exempted from contiguity support"),
            Self::IsolatedUnit { unit, exempted: false } =>
                write!(f, "unit {unit} has no neighbors; contiguity support makes the model infeasible"),
            Self::EmptyGraph =>
                write!(f, "adjacency graph has no edges; cut-edge and contiguity constraints are vacuous"),
            Self::MoreDistrictsThanUnits { districts, units } =>
                write!(f, "{districts} districts requested but only {units} units can fill them"),
        }
    }
}
