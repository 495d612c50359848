use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{ensure_data, DistrictError, Result},
    graph::AdjacencyGraph,
    map::{pad_code, UnitId, UnitRegistry},
};

/// A raw adjacency row. Continuation rows leave the primary columns blank and
/// inherit the previous row's primary unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyRow {
    pub unit: Option<String>,
    pub unit_code: Option<String>,
    pub neighbor: Option<String>,
    pub neighbor_code: Option<String>,
}

impl AdjacencyRow {
    /// A row that starts a new primary unit.
    pub fn primary(unit: &str, unit_code: &str, neighbor: &str, neighbor_code: &str) -> Self {
        Self {
            unit: Some(unit.to_string()),
            unit_code: Some(unit_code.to_string()),
            neighbor: Some(neighbor.to_string()),
            neighbor_code: Some(neighbor_code.to_string()),
        }
    }

    /// A row that continues the previous primary unit.
    pub fn continuation(neighbor: &str, neighbor_code: &str) -> Self {
        Self {
            unit: None,
            unit_code: None,
            neighbor: Some(neighbor.to_string()),
            neighbor_code: Some(neighbor_code.to_string()),
        }
    }
}

/// An adjacency row with every column present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledRow {
    pub unit: String,
    pub unit_code: String,
    pub neighbor: String,
    pub neighbor_code: String,
}

/// Treat empty and whitespace-only cells as blank.
fn present(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Give every row an explicit primary unit, carrying the last one seen forward.
pub fn forward_fill(rows: &[AdjacencyRow]) -> Result<Vec<FilledRow>> {
    let mut current: Option<(&str, &str)> = None;
    let mut filled = Vec::with_capacity(rows.len());

    for (line, row) in rows.iter().enumerate() {
        match (present(&row.unit), present(&row.unit_code)) {
            (Some(unit), Some(code)) => current = Some((unit, code)),
            (None, None) => {}
            _ => return Err(DistrictError::data(format!(
                "[graph::builder] Row {} has only one of the primary unit name and code", line + 1
            ))),
        }
        let (unit, unit_code) = current.ok_or_else(|| DistrictError::data(format!(
            "[graph::builder] Row {} continues a primary unit but no primary row precedes it", line + 1
        )))?;
        let (Some(neighbor), Some(neighbor_code)) = (present(&row.neighbor), present(&row.neighbor_code)) else {
            return Err(DistrictError::data(format!("[graph::builder] Row {} is missing its neighbor columns", line + 1)));
        };

        filled.push(FilledRow {
            unit: unit.to_string(),
            unit_code: unit_code.to_string(),
            neighbor: neighbor.to_string(),
            neighbor_code: neighbor_code.to_string(),
        });
    }

    Ok(filled)
}

/// Restricts adjacency rows to a target region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RegionFilter {
    /// Keep every row.
    #[default]
    All,
    /// Keep rows whose two units both lie in one state: by FIPS prefix when
    /// the codes are numeric, otherwise by a ", XX" name suffix.
    State { fips: String, abbrev: String },
}

impl RegionFilter {
    pub fn state(fips: &str, abbrev: &str) -> Self {
        Self::State { fips: pad_code(fips, 2), abbrev: abbrev.trim().to_string() }
    }

    pub fn accepts(&self, row: &FilledRow) -> bool {
        match self {
            Self::All => true,
            Self::State { fips, abbrev } => {
                let in_state = |name: &str, code: &str| {
                    let code = pad_code(code, 5);
                    if code.bytes().all(|b| b.is_ascii_digit()) {
                        code.starts_with(fips.as_str())
                    } else {
                        name.ends_with(&format!(", {abbrev}"))
                    }
                };
                in_state(&row.unit, &row.unit_code) && in_state(&row.neighbor, &row.neighbor_code)
            }
        }
    }
}

/// How raw row identifiers map onto registry keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentifierKey {
    /// Use the numeric code, zero-padded to a 5-digit GEOID.
    #[default]
    Code,
    /// Use the display name, minus an optional suffix such as ", IN".
    Name { suffix: Option<String> },
}

impl IdentifierKey {
    /// Map a raw (name, code) pair into the registry's key space.
    /// Returns `None` for units the registry does not hold.
    pub fn normalize(&self, name: &str, code: &str, registry: &UnitRegistry) -> Option<UnitId> {
        match self {
            Self::Code => Some(UnitId::new(pad_code(code, 5))).filter(|id| registry.contains(id)),
            Self::Name { suffix } => {
                let name = suffix.as_deref()
                    .and_then(|s| name.strip_suffix(s))
                    .unwrap_or(name)
                    .trim();
                registry.resolve_name(name).cloned()
            }
        }
    }
}

/// Whether the builder mirrors every pair or trusts the source's directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    /// Insert every kept pair in both directions.
    #[default]
    Mirror,
    /// Keep pairs exactly as listed; see [`AdjacencyGraph::asymmetric_pairs`].
    AsGiven,
}

/// Builds an [`AdjacencyGraph`] from raw pairwise rows.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyBuilder {
    filter: RegionFilter,
    key: IdentifierKey,
    symmetry: Symmetry,
}

impl AdjacencyBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn region(mut self, filter: RegionFilter) -> Self { self.filter = filter; self }

    pub fn key(mut self, key: IdentifierKey) -> Self { self.key = key; self }

    pub fn symmetry(mut self, symmetry: Symmetry) -> Self { self.symmetry = symmetry; self }

    /// Build the adjacency graph over the registry's units.
    pub fn build(&self, rows: &[AdjacencyRow], registry: &UnitRegistry) -> Result<AdjacencyGraph> {
        ensure_data!(!rows.is_empty(), "[graph::builder] Adjacency table is empty");
        if matches!(self.key, IdentifierKey::Name { .. }) {
            let ambiguous = registry.ambiguous_names();
            ensure_data!(
                ambiguous.is_empty(),
                "[graph::builder] Display names {ambiguous:?} belong to several units; use code keys instead"
            );
        }

        let filled = forward_fill(rows)?;
        let mut neighbors = vec![BTreeSet::<u32>::new(); registry.len()];
        let (mut kept, mut self_loops) = (0usize, 0usize);

        for row in filled.iter().filter(|row| self.filter.accepts(row)) {
            let Some(unit) = self.key.normalize(&row.unit, &row.unit_code, registry) else { continue };
            let Some(neighbor) = self.key.normalize(&row.neighbor, &row.neighbor_code, registry) else { continue };
            if unit == neighbor {
                self_loops += 1;
                continue;
            }

            // Both ids were normalized against the registry, so both positions exist.
            let (Some(u), Some(v)) = (registry.position(&unit), registry.position(&neighbor)) else { continue };
            neighbors[u].insert(v as u32);
            if self.symmetry == Symmetry::Mirror {
                neighbors[v].insert(u as u32);
            }
            kept += 1;
        }

        if kept == 0 && registry.len() > 1 {
            warn!(rows = rows.len(), "no adjacency rows matched the registry; every unit is isolated");
        }
        debug!(rows = rows.len(), kept, self_loops, "built adjacency graph");

        // Units absent from the table keep their empty neighbor set.
        let adjacency = neighbors.into_iter()
            .map(|set| set.into_iter().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        Ok(AdjacencyGraph::new(registry.ids().cloned().collect(), &adjacency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Exclusions, UnitRecord};

    fn registry(ids: &[&str]) -> UnitRegistry {
        UnitRegistry::build(
            ids.iter().map(|&id| UnitRecord::new(id, format!("{id} County"), 100)),
            &Exclusions::new(),
        ).unwrap()
    }

    fn neighbor_sets(graph: &AdjacencyGraph) -> Vec<(String, BTreeSet<String>)> {
        graph.ids().iter()
            .map(|id| (id.to_string(), graph.neighbors(id).map(|n| n.to_string()).collect()))
            .collect()
    }

    #[test]
    fn forward_fill_carries_primary_unit() {
        let rows = vec![
            AdjacencyRow::primary("A", "1", "B", "2"),
            AdjacencyRow::continuation("C", "3"),
        ];
        let filled = forward_fill(&rows).unwrap();
        assert_eq!(filled[1], FilledRow {
            unit: "A".into(), unit_code: "1".into(), neighbor: "C".into(), neighbor_code: "3".into(),
        });
    }

    #[test]
    fn forward_fill_treats_whitespace_as_blank() {
        let rows = vec![
            AdjacencyRow::primary("A", "1", "B", "2"),
            AdjacencyRow { unit: Some("  ".into()), unit_code: Some("".into()), ..AdjacencyRow::continuation("C", "3") },
        ];
        assert_eq!(forward_fill(&rows).unwrap()[1].unit, "A");
    }

    #[test]
    fn forward_fill_rejects_leading_continuation() {
        let rows = vec![AdjacencyRow::continuation("C", "3")];
        assert!(matches!(forward_fill(&rows), Err(DistrictError::Data(_))));
    }

    #[test]
    fn forward_fill_rejects_half_primary_rows() {
        let rows = vec![AdjacencyRow { unit_code: None, ..AdjacencyRow::primary("A", "1", "B", "2") }];
        assert!(matches!(forward_fill(&rows), Err(DistrictError::Data(_))));
    }

    #[test]
    fn build_rejects_empty_table() {
        let err = AdjacencyBuilder::new().build(&[], &registry(&["00001"])).unwrap_err();
        assert!(matches!(err, DistrictError::Data(msg) if msg.contains("empty")));
    }

    #[test]
    fn build_mirrors_and_drops_self_references() {
        let registry = registry(&["00001", "00002", "00003"]);
        let rows = vec![
            AdjacencyRow::primary("A", "1", "A", "1"),
            AdjacencyRow::continuation("B", "2"),
            AdjacencyRow::primary("C", "3", "B", "2"),
        ];
        let graph = AdjacencyBuilder::new().build(&rows, &registry).unwrap();

        assert!(graph.is_symmetric());
        for id in graph.ids() { assert!(!graph.contains_edge(id, id)) }
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(&UnitId::new("00002"), &UnitId::new("00001")));
    }

    #[test]
    fn as_given_keeps_one_directional_pairs() {
        let registry = registry(&["00001", "00002"]);
        let rows = vec![AdjacencyRow::primary("A", "1", "B", "2")];
        let graph = AdjacencyBuilder::new().symmetry(Symmetry::AsGiven).build(&rows, &registry).unwrap();

        assert!(!graph.is_symmetric());
        assert_eq!(graph.asymmetric_pairs().len(), 1);
    }

    #[test]
    fn units_missing_from_table_get_empty_sets() {
        let registry = registry(&["00001", "00002", "00003"]);
        let rows = vec![AdjacencyRow::primary("A", "1", "B", "2")];
        let graph = AdjacencyBuilder::new().build(&rows, &registry).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.isolated().collect::<Vec<_>>(), vec![&UnitId::new("00003")]);
    }

    #[test]
    fn neighbors_outside_registry_are_dropped() {
        let registry = registry(&["00001", "00002"]);
        let rows = vec![
            AdjacencyRow::primary("A", "1", "B", "2"),
            AdjacencyRow::continuation("Z", "99"),
            AdjacencyRow::primary("Z", "99", "A", "1"),
        ];
        let graph = AdjacencyBuilder::new().build(&rows, &registry).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn region_filter_uses_codes_or_name_suffix() {
        let filter = RegionFilter::state("18", "IN");
        let row = |a: &str, ac: &str, b: &str, bc: &str| FilledRow {
            unit: a.into(), unit_code: ac.into(), neighbor: b.into(), neighbor_code: bc.into(),
        };

        assert!(filter.accepts(&row("Adams County, IN", "18001", "Allen County, IN", "18003")));
        assert!(!filter.accepts(&row("Adams County, IN", "18001", "Mercer County, OH", "39107")));
        assert!(filter.accepts(&row("Adams County, IN", "x", "Allen County, IN", "y")));
        assert!(!filter.accepts(&row("Adams County, IN", "x", "Mercer County, OH", "y")));
        assert!(RegionFilter::All.accepts(&row("a", "1", "b", "2")));
    }

    #[test]
    fn name_key_strips_suffix() {
        let records = vec![
            UnitRecord::new("18001", "Adams County", 10),
            UnitRecord::new("18003", "Allen County", 10),
        ];
        let registry = UnitRegistry::build(records, &Exclusions::new()).unwrap();
        let rows = vec![AdjacencyRow::primary("Adams County, IN", "18001", "Allen County, IN", "18003")];
        let graph = AdjacencyBuilder::new()
            .key(IdentifierKey::Name { suffix: Some(", IN".into()) })
            .build(&rows, &registry)
            .unwrap();

        assert!(graph.contains_edge(&UnitId::new("18001"), &UnitId::new("18003")));
    }

    #[test]
    fn name_key_rejects_shared_names() {
        let records = vec![
            UnitRecord::new("18001", "Adams County", 10),
            UnitRecord::new("18003", "Allen County", 10),
            UnitRecord::new("39001", "Adams County", 10),
        ];
        let registry = UnitRegistry::build(records, &Exclusions::new()).unwrap();
        let rows = vec![AdjacencyRow::primary("Adams County, IN", "18001", "Allen County, IN", "18003")];

        let result = AdjacencyBuilder::new()
            .key(IdentifierKey::Name { suffix: Some(", IN".into()) })
            .build(&rows, &registry);
        assert!(matches!(result, Err(DistrictError::Data(msg)) if msg.contains("Adams County")));

        // Code keys are unaffected by shared display names.
        let graph = AdjacencyBuilder::new().build(&rows, &registry).unwrap();
        assert!(graph.contains_edge(&UnitId::new("18001"), &UnitId::new("18003")));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let registry = registry(&["00001", "00002", "00003", "00004"]);
        let rows = vec![
            AdjacencyRow::primary("A", "1", "B", "2"),
            AdjacencyRow::continuation("C", "3"),
            AdjacencyRow::primary("D", "4", "C", "3"),
            AdjacencyRow::primary("B", "2", "A", "1"),
        ];
        let builder = AdjacencyBuilder::new();
        let first = builder.build(&rows, &registry).unwrap();
        let second = builder.build(&rows, &registry).unwrap();
        assert_eq!(neighbor_sets(&first), neighbor_sets(&second));

        // Same relation, listed in a different order and direction.
        let reversed = vec![
            AdjacencyRow::primary("B", "2", "A", "1"),
            AdjacencyRow::primary("D", "4", "C", "3"),
            AdjacencyRow::primary("A", "1", "C", "3"),
            AdjacencyRow::continuation("B", "2"),
        ];
        let third = builder.build(&reversed, &registry).unwrap();
        assert_eq!(neighbor_sets(&first), neighbor_sets(&third));
    }
}
