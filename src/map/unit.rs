use std::{collections::BTreeMap, fmt, sync::Arc};

/// Stable key for a geographic unit, e.g. "18097" for a county.
/// Keeps the original GEOID text (with leading zeros) without repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(Arc<str>);

impl UnitId {
    pub fn new(id: impl AsRef<str>) -> Self { Self(Arc::from(id.as_ref().trim())) }

    /// Build a county GEOID from a state code and a county code, zero-padding
    /// numeric codes to 2 and 3 digits respectively.
    pub fn from_codes(region: &str, subregion: &str) -> Self {
        Self::new(format!("{}{}", pad_code(region, 2), pad_code(subregion, 3)))
    }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

/// Left-pad an all-digit code with zeros; other codes pass through unchanged.
pub(crate) fn pad_code(code: &str, width: usize) -> String {
    let code = code.trim();
    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{code:0>width$}")
    } else {
        code.to_string()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self { Self::new(id) }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self { Self::new(id) }
}

impl serde::Serialize for UnitId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A validated geographic unit. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub(super) id: UnitId,
    pub(super) name: Arc<str>,
    pub(super) population: u64,
    pub(super) subpopulations: BTreeMap<String, u64>,
}

impl Unit {
    #[inline] pub fn id(&self) -> &UnitId { &self.id }
    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn population(&self) -> u64 { self.population }
    #[inline] pub fn subpopulations(&self) -> &BTreeMap<String, u64> { &self.subpopulations }

    /// Count for a named sub-population.
    #[inline]
    pub fn series(&self, name: &str) -> Option<u64> {
        self.subpopulations.get(name).copied()
    }
}

/// Raw per-unit record, as delivered by the population source.
/// Figures are optional here; the registry rejects records with missing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitRecord {
    pub id: String,
    pub name: String,
    pub population: Option<u64>,
    pub subpopulations: BTreeMap<String, Option<u64>>,
}

impl UnitRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, population: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            population: Some(population),
            subpopulations: BTreeMap::new(),
        }
    }

    /// Attach a named sub-population figure.
    pub fn with_subpopulation(mut self, series: impl Into<String>, count: u64) -> Self {
        self.subpopulations.insert(series.into(), Some(count));
        self
    }

    /// Remove a trailing state suffix such as ", Indiana" from the display name.
    pub fn strip_name_suffix(mut self, suffix: &str) -> Self {
        if let Some(stripped) = self.name.strip_suffix(suffix) {
            self.name = stripped.trim_end().to_string();
        }
        self
    }
}
