use crate::error::{ProcessingError, Result};
use crate::models::units::Unit;
use crate::models::variable::{Category, Granularity, SensorKind, VariableDefinition};
use crate::processors::range_validator::is_valid_reading;
use crate::utils::constants::{RELH_CAP_LIMIT, RELH_MAX, SENTINEL};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single reading held in its variable's canonical unit
///
/// Missing readings are stored as the sentinel so that every value object
/// has a number behind it; `value()` and `is_valid()` still report them as
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    category: Category,
    sensor: SensorKind,
    unit: Unit,
    raw: f64,
    granularity: Granularity,
    timestamp: Option<NaiveDateTime>,
}

impl Measurement {
    pub fn new(
        definition: &VariableDefinition,
        raw: Option<f64>,
        unit: &str,
        granularity: Granularity,
        timestamp: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let from = parse_unit_for(unit, definition.category, definition.unit)?;

        let canonical = match raw {
            None => SENTINEL,
            Some(v) if v == SENTINEL => SENTINEL,
            Some(v) => from.convert(v, definition.unit).ok_or_else(|| {
                ProcessingError::InvalidUnit {
                    unit: unit.to_string(),
                    category: definition.category.to_string(),
                }
            })?,
        };

        Ok(Self {
            category: definition.category,
            sensor: definition.sensor,
            unit: definition.unit,
            raw: canonical,
            granularity,
            timestamp,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Canonical value including the sentinel
    pub fn raw(&self) -> f64 {
        self.raw
    }

    pub fn is_missing(&self) -> bool {
        self.raw == SENTINEL
    }

    /// Canonical value, `None` when missing
    pub fn value(&self) -> Option<f64> {
        if self.is_missing() {
            None
        } else {
            Some(self.raw)
        }
    }

    /// Value converted to another unit of the same dimension
    pub fn value_in(&self, unit: &str) -> Result<Option<f64>> {
        let target = parse_unit_for(unit, self.category, self.unit)?;
        Ok(self.value().and_then(|v| self.unit.convert(v, target)))
    }

    pub fn is_valid(&self) -> bool {
        is_valid_reading(
            self.value(),
            self.category,
            self.sensor,
            self.granularity,
            self.timestamp,
        )
    }
}

fn parse_unit_for(unit: &str, category: Category, canonical: Unit) -> Result<Unit> {
    Unit::parse(unit)
        .filter(|u| u.dimension() == canonical.dimension())
        .ok_or_else(|| ProcessingError::InvalidUnit {
            unit: unit.to_string(),
            category: category.to_string(),
        })
}

fn typed(name: &str, category: Category, unit: Unit) -> VariableDefinition {
    VariableDefinition::new(name, category, unit)
}

fn converted(measurement: &Measurement, unit: Unit) -> Option<f64> {
    measurement
        .value()
        .and_then(|v| measurement.unit().convert(v, unit))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Temperature(Measurement);

impl Temperature {
    pub fn new(raw: Option<f64>, unit: &str, timestamp: Option<NaiveDateTime>) -> Result<Self> {
        let definition = typed("TEMP", Category::Temperature, Unit::Celsius);
        Measurement::new(&definition, raw, unit, Granularity::Hourly, timestamp).map(Self)
    }

    pub fn celsius(&self) -> Option<f64> {
        self.0.value()
    }

    pub fn fahrenheit(&self) -> Option<f64> {
        converted(&self.0, Unit::Fahrenheit)
    }

    pub fn kelvin(&self) -> Option<f64> {
        converted(&self.0, Unit::Kelvin)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }
}

/// Flag returned alongside an accepted humidity reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumidityFlag {
    Measured,
    Capped,
}

impl HumidityFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            HumidityFlag::Measured => "RELH",
            HumidityFlag::Capped => "RELH_CAP",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelativeHumidity(Measurement);

impl RelativeHumidity {
    pub fn new(raw: Option<f64>, unit: &str, timestamp: Option<NaiveDateTime>) -> Result<Self> {
        let definition = typed("RELH", Category::RelativeHumidity, Unit::Percent);
        Measurement::new(&definition, raw, unit, Granularity::Hourly, timestamp).map(Self)
    }

    pub fn percent(&self) -> Option<f64> {
        self.0.value()
    }

    pub fn fraction(&self) -> Option<f64> {
        converted(&self.0, Unit::Fraction)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    /// Accept a humidity reading, capping slightly-over-saturation values
    ///
    /// Readings in (100, 105] come back as 100 flagged `Capped`; anything
    /// above 105 or below 0 is rejected.
    pub fn is_in_range(value: f64) -> Option<(f64, HumidityFlag)> {
        if value == SENTINEL || !value.is_finite() || value < 0.0 || value > RELH_CAP_LIMIT {
            None
        } else if value > RELH_MAX {
            Some((RELH_MAX, HumidityFlag::Capped))
        } else {
            Some((value, HumidityFlag::Measured))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Precipitation(Measurement);

impl Precipitation {
    pub fn new(raw: Option<f64>, granularity: Granularity, unit: &str) -> Result<Self> {
        let definition = typed("PRECIP", Category::Precipitation, Unit::Millimeter);
        Measurement::new(&definition, raw, unit, granularity, None).map(Self)
    }

    pub fn mm(&self) -> Option<f64> {
        self.0.value()
    }

    pub fn inches(&self) -> Option<f64> {
        converted(&self.0, Unit::Inch)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evapotranspiration(Measurement);

impl Evapotranspiration {
    pub fn new(raw: Option<f64>, granularity: Granularity, unit: &str) -> Result<Self> {
        let definition = typed("RPET", Category::Evapotranspiration, Unit::Millimeter);
        Measurement::new(&definition, raw, unit, granularity, None).map(Self)
    }

    pub fn mm(&self) -> Option<f64> {
        self.0.value()
    }

    pub fn inches(&self) -> Option<f64> {
        converted(&self.0, Unit::Inch)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindSpeed(Measurement);

impl WindSpeed {
    pub fn new(raw: Option<f64>, unit: &str) -> Result<Self> {
        let definition = typed("WSPD", Category::WindSpeed, Unit::MetersPerSecond);
        Measurement::new(&definition, raw, unit, Granularity::Hourly, None).map(Self)
    }

    pub fn meters_per_second(&self) -> Option<f64> {
        self.0.value()
    }

    pub fn mph(&self) -> Option<f64> {
        converted(&self.0, Unit::MilesPerHour)
    }

    pub fn kmh(&self) -> Option<f64> {
        converted(&self.0, Unit::KilometersPerHour)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetRadiation(Measurement);

impl NetRadiation {
    pub fn new(raw: Option<f64>, unit: &str) -> Result<Self> {
        let definition = typed("NRAD", Category::NetRadiation, Unit::WattsPerSquareMeter);
        Measurement::new(&definition, raw, unit, Granularity::Hourly, None).map(Self)
    }

    pub fn watts_per_m2(&self) -> Option<f64> {
        self.0.value()
    }

    pub fn kj_per_m2_min(&self) -> Option<f64> {
        converted(&self.0, Unit::KilojoulesPerSquareMeterPerMinute)
    }

    pub fn langleys_per_min(&self) -> Option<f64> {
        converted(&self.0, Unit::LangleysPerMinute)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }
}
