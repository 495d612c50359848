use std::collections::BTreeMap;

use good_lp::Variable;

use crate::map::UnitId;

/// Key of an `assign[u, d]` variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssignKey {
    pub unit: UnitId,
    pub district: u32,
}

impl AssignKey {
    pub fn new(unit: UnitId, district: u32) -> Self { Self { unit, district } }
}

/// Key of a `cut[u, v]` variable: an undirected adjacent pair, endpoints in identifier order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    a: UnitId,
    b: UnitId,
}

impl EdgeKey {
    pub fn new(x: UnitId, y: UnitId) -> Self {
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    #[inline] pub fn endpoints(&self) -> (&UnitId, &UnitId) { (&self.a, &self.b) }
}

/// The model's variable universe, as explicit keyed containers.
#[derive(Debug, Clone, Default)]
pub struct ModelIndex {
    pub(crate) assign: BTreeMap<AssignKey, Variable>,
    pub(crate) cut: BTreeMap<EdgeKey, Variable>,
    pub(crate) deviation: BTreeMap<u32, Variable>,
    pub(crate) ratio: BTreeMap<u32, Variable>,
}

impl ModelIndex {
    #[inline] pub fn assign_count(&self) -> usize { self.assign.len() }
    #[inline] pub fn cut_count(&self) -> usize { self.cut.len() }
    #[inline] pub fn deviation_count(&self) -> usize { self.deviation.len() }
    #[inline] pub fn ratio_count(&self) -> usize { self.ratio.len() }

    #[inline] pub fn assign_keys(&self) -> impl Iterator<Item = &AssignKey> { self.assign.keys() }
    #[inline] pub fn cut_keys(&self) -> impl Iterator<Item = &EdgeKey> { self.cut.keys() }

    #[inline] pub fn has_assign(&self, unit: &UnitId, district: u32) -> bool {
        self.assign.contains_key(&AssignKey::new(unit.clone(), district))
    }

    /// Total number of decision variables.
    pub fn len(&self) -> usize {
        self.assign.len() + self.cut.len() + self.deviation.len() + self.ratio.len()
    }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }
}
