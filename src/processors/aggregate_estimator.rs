use crate::models::{Attribution, DailyAggregation, ObservationRecord, SourceTags, VariableDefinition};
use crate::processors::derived_fields::round_to;
use crate::utils::constants::{HOURS_PER_DAY, SENTINEL};
use std::collections::HashSet;

/// Builds daily values from one complete day of hourly secondary records
///
/// Only constructed when the day holds exactly 24 distinct hourly records;
/// an individual estimate additionally requires all 24 readings of its base
/// variable to be present, so partial sums and extrema are never produced.
#[derive(Debug)]
pub struct AggregateEstimator<'a> {
    hourly: Vec<&'a ObservationRecord>,
    reanalysis: bool,
}

impl<'a> AggregateEstimator<'a> {
    pub fn new(hourly: Vec<&'a ObservationRecord>, tags: &SourceTags) -> Option<Self> {
        if !Self::is_complete(&hourly) {
            return None;
        }

        let reanalysis = hourly
            .iter()
            .any(|record| record.has_source_in(&tags.reanalysis_origins));

        Some(Self { hourly, reanalysis })
    }

    /// Exactly 24 records labelled with hour-ending hours 1..=24
    pub fn is_complete(hourly: &[&ObservationRecord]) -> bool {
        if hourly.len() != HOURS_PER_DAY {
            return false;
        }
        let hours: HashSet<u8> = hourly.iter().filter_map(|r| r.hour).collect();
        hours.len() == HOURS_PER_DAY && (1..=HOURS_PER_DAY as u8).all(|h| hours.contains(&h))
    }

    /// Whether any constituent record traces back to a reanalysis origin
    pub fn is_reanalysis_derived(&self) -> bool {
        self.reanalysis
    }

    /// Attribution every estimate for this bucket carries
    pub fn attribution(&self) -> Attribution {
        if self.reanalysis {
            Attribution::EstimateFromReanalysis
        } else {
            Attribution::Estimate
        }
    }

    pub fn estimate(&self, definition: &VariableDefinition) -> Option<f64> {
        match &definition.aggregation {
            DailyAggregation::None => None,
            DailyAggregation::Sum => self.readings(&definition.name).map(|values| {
                round_to(values.iter().sum(), 6)
            }),
            DailyAggregation::Min(base) => self
                .readings(base)
                .map(|values| values.into_iter().fold(f64::INFINITY, f64::min)),
            DailyAggregation::Max(base) => self
                .readings(base)
                .map(|values| values.into_iter().fold(f64::NEG_INFINITY, f64::max)),
        }
    }

    /// All 24 readings of `name`, or `None` if any is missing
    fn readings(&self, name: &str) -> Option<Vec<f64>> {
        self.hourly
            .iter()
            .map(|record| record.value(name).filter(|v| *v != SENTINEL))
            .collect()
    }
}
