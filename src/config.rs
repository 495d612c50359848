//! Scenario configuration loaded from TOML.
//!
//! A scenario collects everything one districting run needs besides the two
//! input tables: district count, balance band, objective, pinned and held-out
//! units, exclusions, how to read the inputs, and when the solver may stop.
//!
//! ```
//! use districtor::config::ScenarioConfig;
//!
//! let config = ScenarioConfig::from_toml_str(r#"
//!     districts = 4
//!     objective = "minimize_cut_edges"
//!
//!     [tolerance]
//!     lower = 0.95
//!     upper = 1.05
//! "#).unwrap();
//!
//! assert_eq!(config.districts, 4);
//! assert_eq!(config.stopping_policy().relative_gap, Some(0.02));
//! ```

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    graph::{AdjacencyBuilder, IdentifierKey, RegionFilter, Symmetry},
    io::csv::UnitColumns,
    map::Exclusions,
    model::{DemographicBound, IsolatedUnitPolicy, ModelConfig, ObjectiveMode, ToleranceBand},
    solve::StoppingPolicy,
};

/// Default district count (Indiana's congressional delegation).
pub const DEFAULT_DISTRICTS: u32 = 9;

/// A unit dropped before any processing, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub id: String,
    pub reason: String,
}

/// Restrict adjacency rows to one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// State FIPS code, e.g. "18".
    pub fips: String,
    /// State postal abbreviation, e.g. "IN".
    pub abbrev: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    #[default]
    Code,
    Name,
}

/// How the adjacency table is matched against the unit records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjacencyConfig {
    pub key: KeyKind,
    /// Suffix stripped from adjacency names when `key = "name"`, e.g. ", IN".
    pub name_suffix: Option<String>,
    pub symmetry: Symmetry,
}

/// One districting scenario. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub districts: u32,
    pub objective: ObjectiveMode,
    pub track_cut_edges: bool,
    pub contiguity_support: bool,
    pub isolated_units: IsolatedUnitPolicy,
    /// Units left out of optimization and reported as unassigned.
    pub held_out: Vec<String>,
    pub tolerance: ToleranceBand,
    pub demographic_bound: Option<DemographicBound>,
    /// Unit id → district (0-based).
    pub pinned: BTreeMap<String, u32>,
    pub exclusions: Vec<ExclusionEntry>,
    pub region: Option<RegionConfig>,
    pub units: UnitColumns,
    pub adjacency: AdjacencyConfig,
    /// Falls back to [`StoppingPolicy::default_for`] the objective when absent.
    pub stopping: Option<StoppingPolicy>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            districts: DEFAULT_DISTRICTS,
            objective: ObjectiveMode::default(),
            track_cut_edges: false,
            contiguity_support: true,
            isolated_units: IsolatedUnitPolicy::default(),
            held_out: Vec::new(),
            tolerance: ToleranceBand::default(),
            demographic_bound: None,
            pinned: BTreeMap::new(),
            exclusions: Vec::new(),
            region: None,
            units: UnitColumns::default(),
            adjacency: AdjacencyConfig::default(),
            stopping: None,
        }
    }
}

impl ScenarioConfig {
    /// Load a scenario from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read scenario file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("[config] Invalid scenario file: {}", path.display()))
    }

    /// Parse a scenario from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("[config] Failed to parse scenario TOML")
    }

    /// Load `path` if given and present, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "scenario file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn exclusions(&self) -> Exclusions {
        self.exclusions.iter()
            .fold(Exclusions::new(), |acc, e| acc.exclude(e.id.as_str(), e.reason.as_str()))
    }

    pub fn adjacency_builder(&self) -> AdjacencyBuilder {
        let filter = self.region.as_ref()
            .map(|r| RegionFilter::state(&r.fips, &r.abbrev))
            .unwrap_or_default();
        let key = match self.adjacency.key {
            KeyKind::Code => IdentifierKey::Code,
            KeyKind::Name => IdentifierKey::Name { suffix: self.adjacency.name_suffix.clone() },
        };
        AdjacencyBuilder::new().region(filter).key(key).symmetry(self.adjacency.symmetry)
    }

    pub fn model_config(&self) -> ModelConfig {
        let mut config = ModelConfig::new(self.districts)
            .tolerance(self.tolerance)
            .objective(self.objective)
            .track_cut_edges(self.track_cut_edges)
            .contiguity_support(self.contiguity_support)
            .isolated_units(self.isolated_units);
        config.demographic_bound = self.demographic_bound.clone();
        let config = self.pinned.iter()
            .fold(config, |acc, (unit, &district)| acc.pin(unit.as_str(), district));
        self.held_out.iter()
            .fold(config, |acc, unit| acc.hold_out(unit.as_str()))
    }

    pub fn stopping_policy(&self) -> StoppingPolicy {
        self.stopping.unwrap_or_else(|| StoppingPolicy::default_for(self.objective))
    }
}
