use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ObjectiveMode;

/// When the solver may stop before proving optimality.
/// This is the only way to bound a solve; there is no mid-solve cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoppingPolicy {
    /// Wall-clock limit for the whole solve.
    #[serde(default, with = "seconds")]
    pub time_limit: Option<Duration>,
    /// Relative optimality gap at which the solver may stop, e.g. 0.02.
    #[serde(default)]
    pub relative_gap: Option<f64>,
}

impl StoppingPolicy {
    pub fn new() -> Self { Self::default() }

    pub fn with_time_limit(mut self, limit: Duration) -> Self { self.time_limit = Some(limit); self }

    pub fn with_relative_gap(mut self, gap: f64) -> Self { self.relative_gap = Some(gap); self }

    /// Default policy per objective: cut-edge models stop at a 2% gap.
    pub fn default_for(objective: ObjectiveMode) -> Self {
        match objective {
            ObjectiveMode::MinimizeTotalDeviation => Self::default(),
            ObjectiveMode::MinimizeCutEdges => Self::default().with_relative_gap(0.02),
        }
    }

    /// Whether the solver may legitimately stop short of a proven optimum.
    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.time_limit.is_some() || self.relative_gap.is_some_and(|gap| gap > 0.0)
    }
}

/// Serialize an optional duration as (fractional) seconds.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_objective() {
        assert_eq!(StoppingPolicy::default_for(ObjectiveMode::MinimizeTotalDeviation), StoppingPolicy::default());
        assert_eq!(StoppingPolicy::default_for(ObjectiveMode::MinimizeCutEdges).relative_gap, Some(0.02));
    }

    #[test]
    fn bounded_when_any_limit_set() {
        assert!(!StoppingPolicy::new().is_bounded());
        assert!(StoppingPolicy::new().with_time_limit(Duration::from_secs(5)).is_bounded());
        assert!(StoppingPolicy::new().with_relative_gap(0.01).is_bounded());
        assert!(!StoppingPolicy::new().with_relative_gap(0.0).is_bounded());
    }

    #[test]
    fn time_limit_reads_as_seconds() {
        let policy: StoppingPolicy = serde_json::from_str(r#"{"time_limit": 1.5}"#).unwrap();
        assert_eq!(policy.time_limit, Some(Duration::from_millis(1500)));
        assert_eq!(policy.relative_gap, None);
    }
}
