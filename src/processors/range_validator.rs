use crate::models::{Category, Granularity, SensorKind, VariableDefinition};
use crate::utils::constants::{SENTINEL, TEMP_GENERAL_MAX, TEMP_GENERAL_MIN};
use chrono::{Datelike, NaiveDateTime};

/// Plausible air/soil temperature range (°C) per calendar month, January first
pub const TEMPERATURE_BY_MONTH: [(f64, f64); 12] = [
    (-40.0, 24.0),
    (-40.0, 27.0),
    (-34.0, 32.0),
    (-23.0, 38.0),
    (-15.0, 43.0),
    (-9.0, 46.0),
    (-5.0, 46.0),
    (-5.0, 46.0),
    (-12.0, 43.0),
    (-23.0, 37.0),
    (-34.0, 29.0),
    (-40.0, 24.0),
];

/// Inclusive validity bounds; `None` means the variable is unconstrained
pub type Bounds = Option<(f64, f64)>;

/// Physical plausibility check for a single reading
///
/// Invalidity is a plain `false`: out-of-range data is resolved into
/// attribution codes by the reconciler, never raised as an error.
#[derive(Debug, Clone, Copy)]
pub struct RangeValidator {
    granularity: Granularity,
}

impl RangeValidator {
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn is_valid(
        &self,
        definition: &VariableDefinition,
        value: Option<f64>,
        timestamp: Option<NaiveDateTime>,
    ) -> bool {
        is_valid_reading(
            value,
            definition.category,
            definition.sensor,
            self.granularity,
            timestamp,
        )
    }

    pub fn bounds(
        &self,
        definition: &VariableDefinition,
        timestamp: Option<NaiveDateTime>,
    ) -> Bounds {
        category_bounds(
            definition.category,
            definition.sensor,
            self.granularity,
            timestamp.map(|t| t.month()),
        )
    }
}

/// Predicate shared by the validator and the measurement value objects
pub fn is_valid_reading(
    value: Option<f64>,
    category: Category,
    sensor: SensorKind,
    granularity: Granularity,
    timestamp: Option<NaiveDateTime>,
) -> bool {
    let value = match value {
        Some(v) if v != SENTINEL && v.is_finite() => v,
        _ => return false,
    };

    match category_bounds(category, sensor, granularity, timestamp.map(|t| t.month())) {
        Some((min, max)) => (min..=max).contains(&value),
        None => true,
    }
}

pub fn category_bounds(
    category: Category,
    sensor: SensorKind,
    granularity: Granularity,
    month: Option<u32>,
) -> Bounds {
    let bounds = match category {
        Category::Temperature | Category::DewPoint => temperature_bounds(month),
        Category::RelativeHumidity => (0.0, 100.0),
        Category::Precipitation => match granularity {
            Granularity::SubHourly => (0.0, 14.0),
            Granularity::Hourly => (0.0, 77.0),
            Granularity::Daily => (0.0, 254.0),
        },
        Category::Evapotranspiration => (0.0, 10.0),
        Category::WindSpeed => (0.0, 99.0),
        Category::WindDirection => (0.0, 360.0),
        Category::LeafWetness => match sensor {
            SensorKind::RawLeaf => (-100.0, 9999.0),
            SensorKind::WetnessPercent => return None,
            SensorKind::Standard => (0.0, 1.0),
        },
        Category::NetRadiation => (-1250.0, 1250.0),
        Category::SolarRadiation => (0.0, 4500.0),
        Category::SoilHeatFlux => (0.0, 7000.0),
        Category::WindDirectionStdDev => (0.0, 99.0),
        Category::Voltage => (0.0, 20.0),
        Category::VaporPressure => (0.0, 4.0),
        Category::SoilMoisture => (0.0, 1.0),
        Category::SolarFluxDensity => (0.0, 105.0),
    };
    Some(bounds)
}

fn temperature_bounds(month: Option<u32>) -> (f64, f64) {
    match month {
        Some(m) if (1..=12).contains(&m) => TEMPERATURE_BY_MONTH[(m - 1) as usize],
        _ => (TEMP_GENERAL_MIN, TEMP_GENERAL_MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariableRegistry;
    use chrono::NaiveDate;

    fn at(month: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2023, month, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
    }

    #[test]
    fn test_none_and_sentinel_are_invalid() {
        let registry = VariableRegistry::new();
        let validator = RangeValidator::new(Granularity::Hourly);
        let tair = registry.lookup("TAIR").unwrap();
        assert!(!validator.is_valid(tair, None, at(7)));
        assert!(!validator.is_valid(tair, Some(SENTINEL), at(7)));

        // Unconstrained percent sensors still reject missing readings
        let pct = registry.lookup("LWET_PCT").unwrap();
        let sub = RangeValidator::new(Granularity::SubHourly);
        assert!(sub.is_valid(pct, Some(123456.0), None));
        assert!(!sub.is_valid(pct, Some(SENTINEL), None));
        assert!(!sub.is_valid(pct, None, None));
    }

    #[test]
    fn test_temperature_uses_month_table() {
        let registry = VariableRegistry::new();
        let validator = RangeValidator::new(Granularity::Hourly);
        let tair = registry.lookup("TAIR").unwrap();

        assert!(validator.is_valid(tair, Some(40.0), at(7)));
        assert!(!validator.is_valid(tair, Some(40.0), at(1)));
        assert!(validator.is_valid(tair, Some(-38.0), at(12)));
        assert!(!validator.is_valid(tair, Some(-38.0), at(6)));

        // General range without a timestamp
        assert!(validator.is_valid(tair, Some(45.9), None));
        assert!(!validator.is_valid(tair, Some(46.1), None));
        assert!(!validator.is_valid(tair, Some(-40.1), None));
    }

    #[test]
    fn test_precipitation_depends_on_granularity() {
        let registry = VariableRegistry::new();
        let precip = registry.lookup("PRECIP").unwrap();

        assert!(!RangeValidator::new(Granularity::SubHourly).is_valid(precip, Some(20.0), None));
        assert!(RangeValidator::new(Granularity::Hourly).is_valid(precip, Some(20.0), None));
        assert!(!RangeValidator::new(Granularity::Hourly).is_valid(precip, Some(80.0), None));
        assert!(RangeValidator::new(Granularity::Daily).is_valid(precip, Some(254.0), None));
        assert!(!RangeValidator::new(Granularity::Daily).is_valid(precip, Some(-0.1), None));
    }

    #[test]
    fn test_literal_bounds() {
        let registry = VariableRegistry::new();
        let hourly = RangeValidator::new(Granularity::Hourly);
        let cases = [
            ("RELH", 100.0, true),
            ("RELH", 100.5, false),
            ("RPET", 10.0, true),
            ("RPET", 10.01, false),
            ("WSPD", 99.0, true),
            ("WDIR", 360.0, true),
            ("WDIR", 361.0, false),
            ("LWET", 1.0, true),
            ("LWET", 1.5, false),
            ("NRAD", -1250.0, true),
            ("NRAD", 1251.0, false),
            ("SRAD", 4500.0, true),
            ("SHF", 7000.5, false),
            ("WDSD", 99.0, true),
            ("BATV", 20.1, false),
            ("VAPR", 4.0, true),
            ("VWC", 1.01, false),
            ("SFLUX", 105.0, true),
            ("SFLUX", 106.0, false),
        ];

        for (name, value, expected) in cases {
            let def = registry.lookup(name).unwrap();
            assert_eq!(
                hourly.is_valid(def, Some(value), None),
                expected,
                "{} = {}",
                name,
                value
            );
        }
    }

    #[test]
    fn test_raw_leaf_sensor_bounds() {
        let registry = VariableRegistry::new();
        let sub = RangeValidator::new(Granularity::SubHourly);
        let raw = registry.lookup("LWET_RAW").unwrap();
        assert!(sub.is_valid(raw, Some(-100.0), None));
        assert!(sub.is_valid(raw, Some(9999.0), None));
        assert!(!sub.is_valid(raw, Some(10000.0), None));
        assert_eq!(sub.bounds(registry.lookup("LWET_PCT").unwrap(), None), None);
    }
}
