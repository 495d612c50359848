use std::{collections::{BTreeMap, HashMap}, sync::Arc};

use tracing::{debug, info};

use crate::error::{ensure_data, DistrictError, Result};
use super::unit::{Unit, UnitId, UnitRecord};

/// A unit dropped before registry construction, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub id: UnitId,
    pub reason: String,
}

/// Explicit, identifier-keyed exclusion list applied before any downstream
/// component sees the data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions(Vec<Exclusion>);

impl Exclusions {
    pub fn new() -> Self { Self::default() }

    /// Exclude a unit, recording why.
    pub fn exclude(mut self, id: impl Into<UnitId>, reason: impl Into<String>) -> Self {
        self.0.push(Exclusion { id: id.into(), reason: reason.into() });
        self
    }

    #[inline] pub fn len(&self) -> usize { self.0.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }
    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Exclusion> { self.0.iter() }

    #[inline]
    pub fn contains(&self, id: &UnitId) -> bool { self.0.iter().any(|e| &e.id == id) }
}

/// The set of validated units taking part in a districting run.
/// Units are stored in identifier order; `index` maps ids to positions.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    index: HashMap<UnitId, u32>,
    names: HashMap<Arc<str>, Vec<u32>>,
    series: Vec<String>,
    excluded: Exclusions,
}

impl UnitRegistry {
    /// Validate raw records and build the registry, applying `exclusions` first.
    pub fn build(records: impl IntoIterator<Item = UnitRecord>, exclusions: &Exclusions) -> Result<Self> {
        let records = records.into_iter().collect::<Vec<_>>();

        // Every exclusion must name a record that actually exists.
        for exclusion in exclusions.iter() {
            ensure_data!(
                records.iter().any(|r| UnitId::new(&r.id) == exclusion.id),
                "[map::registry] Excluded unit {} not present in records", exclusion.id
            );
            info!(unit = %exclusion.id, reason = %exclusion.reason, "excluding unit");
        }

        let mut units = records.into_iter()
            .filter(|record| !exclusions.contains(&UnitId::new(&record.id)))
            .map(validate_record)
            .collect::<Result<Vec<_>>>()?;
        units.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = HashMap::with_capacity(units.len());
        let mut names = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            ensure_data!(index.insert(unit.id.clone(), i as u32).is_none(), "[map::registry] Duplicate unit id {}", unit.id);
            names.entry(unit.name.clone()).or_insert_with(Vec::new).push(i as u32);
        }

        // Every unit must carry the same set of sub-population series.
        let series = units.first()
            .map(|u| u.subpopulations.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        for unit in &units {
            ensure_data!(
                unit.subpopulations.len() == series.len() && series.iter().all(|s| unit.subpopulations.contains_key(s)),
                "[map::registry] Unit {} does not report the same sub-population series as the others", unit.id
            );
        }

        debug!(units = units.len(), series = ?series, "built unit registry");
        Ok(Self { units, index, names, series, excluded: exclusions.clone() })
    }

    /// Get the number of units in the registry.
    #[inline] pub fn len(&self) -> usize { self.units.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.units.is_empty() }

    /// Get all units, in identifier order.
    #[inline] pub fn units(&self) -> &[Unit] { &self.units }

    /// Get an iterator over unit ids, in identifier order.
    #[inline] pub fn ids(&self) -> impl Iterator<Item = &UnitId> + '_ { self.units.iter().map(|u| &u.id) }

    /// Look up a unit by id.
    #[inline]
    pub fn get(&self, id: &UnitId) -> Option<&Unit> {
        self.index.get(id).map(|&i| &self.units[i as usize])
    }

    #[inline] pub fn contains(&self, id: &UnitId) -> bool { self.index.contains_key(id) }

    /// Position of a unit in identifier order.
    #[inline] pub(crate) fn position(&self, id: &UnitId) -> Option<usize> { self.index.get(id).map(|&i| i as usize) }

    /// Resolve a display name (e.g. "Marion County") to its unit id.
    /// Names shared by several units resolve to nothing.
    #[inline]
    pub fn resolve_name(&self, name: &str) -> Option<&UnitId> {
        match self.names.get(name).map(Vec::as_slice) {
            Some(&[i]) => Some(&self.units[i as usize].id),
            _ => None,
        }
    }

    /// Display names carried by more than one unit, sorted.
    pub fn ambiguous_names(&self) -> Vec<&str> {
        let mut names = self.names.iter()
            .filter(|(_, units)| units.len() > 1)
            .map(|(name, _)| name.as_ref())
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Names of the sub-population series every unit reports.
    #[inline] pub fn series(&self) -> &[String] { &self.series }

    #[inline] pub fn has_series(&self, name: &str) -> bool { self.series.iter().any(|s| s == name) }

    /// Units dropped before construction, with their reasons.
    #[inline] pub fn excluded(&self) -> &Exclusions { &self.excluded }

    /// Sum of total population over all units.
    pub fn total_population(&self) -> u64 { self.units.iter().map(|u| u.population).sum() }

    /// Sum of a sub-population series over all units.
    pub fn series_total(&self, name: &str) -> Option<u64> {
        self.has_series(name).then(|| self.units.iter().filter_map(|u| u.series(name)).sum())
    }
}

/// Check a raw record's figures and turn it into a `Unit`.
fn validate_record(record: UnitRecord) -> Result<Unit> {
    ensure_data!(!record.id.trim().is_empty(), "[map::registry] Record '{}' has an empty identifier", record.name);
    let id = UnitId::new(&record.id);
    let population = record.population
        .ok_or_else(|| DistrictError::data(format!("[map::registry] Unit {id} is missing its population figure")))?;

    let subpopulations = record.subpopulations.into_iter()
        .map(|(series, count)| -> Result<(String, u64)> {
            let count = count.ok_or_else(|| DistrictError::data(
                format!("[map::registry] Unit {id} is missing sub-population '{series}'")
            ))?;
            ensure_data!(
                count <= population,
                "[map::registry] Unit {id} sub-population '{series}' ({count}) exceeds total population ({population})"
            );
            Ok((series, count))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(Unit { id, name: Arc::from(record.name.trim()), population, subpopulations })
}
