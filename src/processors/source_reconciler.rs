use crate::error::{ProcessingError, Result};
use crate::models::{
    Attribution, Bucket, Granularity, ObservationRecord, ReconciledField, ReconciledRecord,
    SourceTags, VariableDefinition, VariableRegistry,
};
use crate::processors::aggregate_estimator::AggregateEstimator;
use crate::processors::derived_fields::dew_point;
use crate::processors::range_validator::RangeValidator;
use crate::utils::constants::{RELH_CAP_LIMIT, RELH_MAX, SENTINEL, SOURCE_SUFFIX};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::debug;

/// Alternate material available for one bucket
#[derive(Debug, Clone)]
pub enum SecondaryMaterial<'a> {
    None,
    /// A record of the same granularity from an alternate source
    PointInTime(&'a ObservationRecord),
    /// The hourly records of a daily bucket's date
    HourlySet(Vec<&'a ObservationRecord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    NoData,
    PrimaryOnly,
    PrimaryPlusSecondary,
    SecondaryOnly,
}

impl BucketState {
    pub fn from_presence(primary: bool, secondary: bool) -> Self {
        match (primary, secondary) {
            (false, false) => BucketState::NoData,
            (true, false) => BucketState::PrimaryOnly,
            (true, true) => BucketState::PrimaryPlusSecondary,
            (false, true) => BucketState::SecondaryOnly,
        }
    }
}

/// Humidity capping applied after annotation and after secondary replacement
pub fn cap_relative_humidity(field: ReconciledField) -> ReconciledField {
    match field.value {
        None => field,
        Some(v) if v == SENTINEL => ReconciledField::empty(),
        Some(v) if v > RELH_CAP_LIMIT => ReconciledField::out_of_range(),
        Some(v) if v > RELH_MAX => ReconciledField::new(Some(RELH_MAX), Attribution::RelhCap),
        Some(v) if v < 0.0 => ReconciledField::empty(),
        Some(_) => field,
    }
}

/// Turns the primary/secondary material of one bucket into a reconciled record
///
/// Reconciliation of a bucket depends only on its inputs, so one reconciler
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct SourceReconciler {
    registry: Arc<VariableRegistry>,
    tracked: Vec<VariableDefinition>,
    granularity: Granularity,
    tags: SourceTags,
    validator: RangeValidator,
}

impl SourceReconciler {
    pub fn new(
        registry: Arc<VariableRegistry>,
        tracked: &[String],
        granularity: Granularity,
        tags: SourceTags,
    ) -> Result<Self> {
        let tracked = tracked
            .iter()
            .map(|name| registry.lookup(name).cloned())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            registry,
            tracked,
            granularity,
            tags,
            validator: RangeValidator::new(granularity),
        })
    }

    /// Track every `<name>` of the allow-list that has a `<name>_src` companion
    pub fn from_columns(
        registry: Arc<VariableRegistry>,
        qc_columns: &[String],
        granularity: Granularity,
        tags: SourceTags,
    ) -> Result<Self> {
        let tracked = tracked_variables(qc_columns);
        if tracked.is_empty() {
            return Err(ProcessingError::Config(
                "no <name>/<name>_src column pairs in the output schema".to_string(),
            ));
        }
        Self::new(registry, &tracked, granularity, tags)
    }

    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.tracked.iter().map(|d| d.name.as_str())
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn tags(&self) -> &SourceTags {
        &self.tags
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn reconcile_bucket(
        &self,
        bucket: &Bucket,
        primary: Option<&ObservationRecord>,
        secondary: SecondaryMaterial<'_>,
    ) -> Result<ReconciledRecord> {
        let timestamp = Some(bucket.timestamp());

        let (point, estimator) = match secondary {
            SecondaryMaterial::None => (None, None),
            SecondaryMaterial::PointInTime(record) => (Some(record), None),
            SecondaryMaterial::HourlySet(hourly) => {
                (None, AggregateEstimator::new(hourly, &self.tags))
            }
        };

        let state =
            BucketState::from_presence(primary.is_some(), point.is_some() || estimator.is_some());

        let mut record =
            ReconciledRecord::placeholder(bucket, self.granularity, self.tracked())?;

        match (state, primary, point) {
            (BucketState::NoData, _, _) => {
                debug!(bucket = %bucket.key, "no primary or usable secondary material");
                return Ok(record);
            }
            (BucketState::PrimaryOnly | BucketState::PrimaryPlusSecondary, Some(base), _) => {
                self.annotate(&mut record, base, Attribution::Primary, timestamp);
            }
            (BucketState::SecondaryOnly, None, Some(base)) => {
                self.annotate(&mut record, base, Attribution::Secondary, timestamp);
            }
            _ => {}
        }
        self.cap_humidity(&mut record);

        let replace = match state {
            BucketState::PrimaryPlusSecondary => true,
            BucketState::SecondaryOnly => estimator.is_some(),
            _ => false,
        };
        if replace {
            self.replace_missing(&mut record, point, estimator.as_ref(), timestamp);
            self.cap_humidity(&mut record);
        }

        self.derive_dew_points(&mut record, primary, timestamp);

        debug!(
            bucket = %bucket.key,
            state = ?state,
            reanalysis = estimator.as_ref().is_some_and(|e| e.is_reanalysis_derived()),
            "reconciled bucket"
        );

        Ok(record)
    }

    /// Attribution for one raw reading taken from a base record
    pub fn annotate_field(
        &self,
        definition: &VariableDefinition,
        raw: Option<f64>,
        origin: Attribution,
        timestamp: Option<NaiveDateTime>,
    ) -> ReconciledField {
        let value = match raw {
            None => return ReconciledField::empty(),
            Some(v) if v == SENTINEL || !v.is_finite() => return ReconciledField::out_of_range(),
            Some(v) => v,
        };

        if self.validator.is_valid(definition, Some(value), timestamp) {
            ReconciledField::new(Some(value), origin)
        } else if definition.category.is_relative_humidity() {
            // Kept for the capping pass
            ReconciledField::new(Some(value), Attribution::OutOfRange)
        } else {
            ReconciledField::out_of_range()
        }
    }

    fn annotate(
        &self,
        record: &mut ReconciledRecord,
        base: &ObservationRecord,
        origin: Attribution,
        timestamp: Option<NaiveDateTime>,
    ) {
        for definition in &self.tracked {
            let field =
                self.annotate_field(definition, base.value(&definition.name), origin, timestamp);
            record.fields.insert(definition.name.clone(), field);
        }
    }

    fn cap_humidity(&self, record: &mut ReconciledRecord) {
        for definition in &self.tracked {
            if !definition.category.is_relative_humidity() {
                continue;
            }
            if let Some(field) = record.fields.get_mut(&definition.name) {
                *field = cap_relative_humidity(*field);
            }
        }
    }

    fn replace_missing(
        &self,
        record: &mut ReconciledRecord,
        point: Option<&ObservationRecord>,
        estimator: Option<&AggregateEstimator<'_>>,
        timestamp: Option<NaiveDateTime>,
    ) {
        for definition in &self.tracked {
            if !record.is_null(&definition.name) {
                continue;
            }

            let candidate = match (point, estimator) {
                (Some(secondary), _) => secondary
                    .value(&definition.name)
                    .map(|v| (v, Attribution::Secondary)),
                (None, Some(estimator)) => estimator
                    .estimate(definition)
                    .map(|v| (v, estimator.attribution())),
                (None, None) => None,
            };

            let field = match candidate {
                Some((value, source))
                    if self.validator.is_valid(definition, Some(value), timestamp) =>
                {
                    ReconciledField::new(Some(value), source)
                }
                _ => ReconciledField::empty(),
            };
            record.fields.insert(definition.name.clone(), field);
        }
    }

    /// Fill null dew points from the record's own temperature and humidity
    ///
    /// The result is attributed to the primary tag only when both parents
    /// came from the primary record; any secondary parent makes it secondary.
    fn derive_dew_points(
        &self,
        record: &mut ReconciledRecord,
        primary: Option<&ObservationRecord>,
        timestamp: Option<NaiveDateTime>,
    ) {
        for definition in &self.tracked {
            let Some(parents) = &definition.derived_from else {
                continue;
            };
            if !record.is_null(&definition.name) {
                continue;
            }

            let (Some(temp_def), Some(relh_def)) = (
                self.registry.get(&parents.temperature),
                self.registry.get(&parents.humidity),
            ) else {
                continue;
            };
            let (Some(temperature), Some(humidity)) =
                (record.get(&temp_def.name).copied(), record.get(&relh_def.name).copied())
            else {
                continue;
            };
            let (Some(t), Some(rh)) = (temperature.value, humidity.value) else {
                continue;
            };
            if !temperature.source.carries_value()
                || !humidity.source.carries_value()
                || !self.validator.is_valid(temp_def, Some(t), timestamp)
                || !self.validator.is_valid(relh_def, Some(rh), timestamp)
            {
                continue;
            }

            let from_primary = parent_origin(temperature, &temp_def.name, primary)
                == Attribution::Primary
                && parent_origin(humidity, &relh_def.name, primary) == Attribution::Primary;
            let origin = if from_primary {
                Attribution::Primary
            } else {
                Attribution::Secondary
            };

            // An implausible result leaves the field as it was
            if let Some(dp) = dew_point(t, rh)
                .filter(|dp| self.validator.is_valid(definition, Some(*dp), timestamp))
            {
                record.set(&definition.name, Some(dp), origin);
            }
        }
    }
}

/// Source a derived value inherits from one parent field
///
/// A capped humidity belongs to the primary record when that record holds
/// the over-range reading.
fn parent_origin(
    field: ReconciledField,
    name: &str,
    primary: Option<&ObservationRecord>,
) -> Attribution {
    match field.source {
        Attribution::Primary => Attribution::Primary,
        Attribution::RelhCap
            if primary
                .and_then(|p| p.value(name))
                .is_some_and(|v| v > RELH_MAX && v <= RELH_CAP_LIMIT) =>
        {
            Attribution::Primary
        }
        _ => Attribution::Secondary,
    }
}

/// Names in an allow-list that come with a `<name>_src` column
pub fn tracked_variables(qc_columns: &[String]) -> Vec<String> {
    qc_columns
        .iter()
        .filter(|column| !column.ends_with(SOURCE_SUFFIX))
        .filter(|column| {
            let src = format!("{}{}", column, SOURCE_SUFFIX);
            qc_columns.iter().any(|c| *c == src)
        })
        .cloned()
        .collect()
}
