use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};

use crate::map::UnitId;

/// District label of a unit: a district index, or unassigned for held-out units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistrictLabel {
    District(u32),
    Unassigned,
}

impl DistrictLabel {
    #[inline]
    pub fn district(&self) -> Option<u32> {
        match self {
            Self::District(d) => Some(*d),
            Self::Unassigned => None,
        }
    }
}

impl fmt::Display for DistrictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::District(d) => write!(f, "{d}"),
            Self::Unassigned => f.write_str("unassigned"),
        }
    }
}

impl Serialize for DistrictLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::District(d) => serializer.serialize_some(d),
            Self::Unassigned => serializer.serialize_none(),
        }
    }
}

/// Mapping from every unit to its district label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistrictAssignment(BTreeMap<UnitId, DistrictLabel>);

impl DistrictAssignment {
    pub(crate) fn new(labels: BTreeMap<UnitId, DistrictLabel>) -> Self { Self(labels) }

    #[inline] pub fn len(&self) -> usize { self.0.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[inline] pub fn get(&self, unit: &UnitId) -> Option<DistrictLabel> { self.0.get(unit).copied() }

    /// Label of a unit; units outside the assignment are unassigned.
    #[inline]
    pub fn label(&self, unit: &UnitId) -> DistrictLabel {
        self.get(unit).unwrap_or(DistrictLabel::Unassigned)
    }

    /// Iterate over (unit, label) pairs in identifier order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, DistrictLabel)> + '_ {
        self.0.iter().map(|(unit, &label)| (unit, label))
    }

    /// Units assigned to a given district.
    pub fn units_in(&self, district: u32) -> impl Iterator<Item = &UnitId> + '_ {
        self.iter()
            .filter(move |(_, label)| *label == DistrictLabel::District(district))
            .map(|(unit, _)| unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_lookup() {
        let assignment = DistrictAssignment::new(BTreeMap::from([
            (UnitId::new("A"), DistrictLabel::District(0)),
            (UnitId::new("B"), DistrictLabel::District(1)),
            (UnitId::new("C"), DistrictLabel::District(0)),
            (UnitId::new("D"), DistrictLabel::Unassigned),
        ]));

        assert_eq!(assignment.len(), 4);
        assert_eq!(assignment.label(&UnitId::new("B")), DistrictLabel::District(1));
        assert_eq!(assignment.label(&UnitId::new("Z")), DistrictLabel::Unassigned);
        assert_eq!(assignment.units_in(0).map(|u| u.as_str()).collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(DistrictLabel::Unassigned.district(), None);
    }

    #[test]
    fn labels_serialize_as_numbers_or_null() {
        let assignment = DistrictAssignment::new(BTreeMap::from([
            (UnitId::new("A"), DistrictLabel::District(3)),
            (UnitId::new("B"), DistrictLabel::Unassigned),
        ]));
        assert_eq!(serde_json::to_string(&assignment).unwrap(), r#"{"A":3,"B":null}"#);
    }
}
