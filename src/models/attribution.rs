use crate::utils::constants::{
    DEFAULT_ESTIMATE_TAG, DEFAULT_PRIMARY_TAG, DEFAULT_REANALYSIS_ORIGIN, DEFAULT_REANALYSIS_TAG,
    DEFAULT_SECONDARY_TAG, TAG_EMPTY, TAG_OOR, TAG_RELH_CAP,
};
use serde::{Deserialize, Serialize};

/// Where a reconciled value came from, or why it is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribution {
    Primary,
    Secondary,
    Estimate,
    EstimateFromReanalysis,
    Empty,
    OutOfRange,
    RelhCap,
}

impl Attribution {
    /// Attributions that may accompany a non-null value
    pub fn carries_value(&self) -> bool {
        !matches!(self, Attribution::Empty | Attribution::OutOfRange)
    }

    pub fn is_estimate(&self) -> bool {
        matches!(
            self,
            Attribution::Estimate | Attribution::EstimateFromReanalysis
        )
    }
}

/// Output labels for each attribution plus the reanalysis origins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTags {
    pub primary: String,
    pub secondary: String,
    pub estimate: String,
    pub reanalysis_estimate: String,
    /// `_src` labels on finer-grained material that mark reanalysis data
    pub reanalysis_origins: Vec<String>,
}

impl SourceTags {
    pub fn new(primary: &str, secondary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            ..Self::default()
        }
    }

    pub fn label(&self, attribution: Attribution) -> &str {
        match attribution {
            Attribution::Primary => &self.primary,
            Attribution::Secondary => &self.secondary,
            Attribution::Estimate => &self.estimate,
            Attribution::EstimateFromReanalysis => &self.reanalysis_estimate,
            Attribution::Empty => TAG_EMPTY,
            Attribution::OutOfRange => TAG_OOR,
            Attribution::RelhCap => TAG_RELH_CAP,
        }
    }

    /// Reverse lookup of a label, fixed labels first
    pub fn parse(&self, label: &str) -> Option<Attribution> {
        match label {
            TAG_EMPTY => Some(Attribution::Empty),
            TAG_OOR => Some(Attribution::OutOfRange),
            TAG_RELH_CAP => Some(Attribution::RelhCap),
            l if l == self.primary => Some(Attribution::Primary),
            l if l == self.secondary => Some(Attribution::Secondary),
            l if l == self.estimate => Some(Attribution::Estimate),
            l if l == self.reanalysis_estimate => Some(Attribution::EstimateFromReanalysis),
            _ => None,
        }
    }

    pub fn is_reanalysis_origin(&self, label: &str) -> bool {
        self.reanalysis_origins.iter().any(|o| o == label)
    }
}

impl Default for SourceTags {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_TAG.to_string(),
            secondary: DEFAULT_SECONDARY_TAG.to_string(),
            estimate: DEFAULT_ESTIMATE_TAG.to_string(),
            reanalysis_estimate: DEFAULT_REANALYSIS_TAG.to_string(),
            reanalysis_origins: vec![DEFAULT_REANALYSIS_ORIGIN.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_parse() {
        let tags = SourceTags::new("agweather", "grid");
        for attribution in [
            Attribution::Primary,
            Attribution::Secondary,
            Attribution::Estimate,
            Attribution::EstimateFromReanalysis,
            Attribution::Empty,
            Attribution::OutOfRange,
            Attribution::RelhCap,
        ] {
            assert_eq!(tags.parse(tags.label(attribution)), Some(attribution));
        }
        assert_eq!(tags.label(Attribution::Primary), "agweather");
        assert_eq!(tags.parse("unknown"), None);
    }

    #[test]
    fn test_value_carrying_attributions() {
        assert!(Attribution::Primary.carries_value());
        assert!(Attribution::RelhCap.carries_value());
        assert!(!Attribution::Empty.carries_value());
        assert!(!Attribution::OutOfRange.carries_value());
        assert!(Attribution::EstimateFromReanalysis.is_estimate());
    }
}
