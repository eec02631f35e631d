use crate::error::{ProcessingError, Result};
use crate::models::units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Physical category every tracked variable belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Temperature,
    RelativeHumidity,
    Precipitation,
    Evapotranspiration,
    WindSpeed,
    WindDirection,
    LeafWetness,
    DewPoint,
    VaporPressure,
    SoilMoisture,
    SolarRadiation,
    NetRadiation,
    SoilHeatFlux,
    WindDirectionStdDev,
    Voltage,
    SolarFluxDensity,
}

impl Category {
    pub fn code(&self) -> &'static str {
        match self {
            Category::Temperature => "TEMP",
            Category::RelativeHumidity => "RELH",
            Category::Precipitation => "PRECIP",
            Category::Evapotranspiration => "RPET",
            Category::WindSpeed => "WSPD",
            Category::WindDirection => "WDIR",
            Category::LeafWetness => "LWET",
            Category::DewPoint => "DEWP",
            Category::VaporPressure => "VAPR",
            Category::SoilMoisture => "SOILM",
            Category::SolarRadiation => "SRAD",
            Category::NetRadiation => "NRAD",
            Category::SoilHeatFlux => "SHF",
            Category::WindDirectionStdDev => "WDSD",
            Category::Voltage => "VOLT",
            Category::SolarFluxDensity => "SFLUX",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Temperature => "Temperature",
            Category::RelativeHumidity => "Relative Humidity",
            Category::Precipitation => "Precipitation",
            Category::Evapotranspiration => "Reference Evapotranspiration",
            Category::WindSpeed => "Wind Speed",
            Category::WindDirection => "Wind Direction",
            Category::LeafWetness => "Leaf Wetness",
            Category::DewPoint => "Dew Point",
            Category::VaporPressure => "Vapor Pressure",
            Category::SoilMoisture => "Soil Moisture",
            Category::SolarRadiation => "Solar Radiation",
            Category::NetRadiation => "Net Radiation",
            Category::SoilHeatFlux => "Soil Heat Flux",
            Category::WindDirectionStdDev => "Wind Direction Std Dev",
            Category::Voltage => "Voltage",
            Category::SolarFluxDensity => "Solar Flux Density",
        }
    }

    pub fn is_relative_humidity(&self) -> bool {
        matches!(self, Category::RelativeHumidity)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Time resolution of a record or a bucket axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    SubHourly,
    Hourly,
    Daily,
}

impl Granularity {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace(['-', '_'], "").as_str() {
            "SUBHOURLY" | "15MIN" => Ok(Granularity::SubHourly),
            "HOURLY" | "HOUR" => Ok(Granularity::Hourly),
            "DAILY" | "DAY" => Ok(Granularity::Daily),
            _ => Err(ProcessingError::InvalidGranularity(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::SubHourly => "subhourly",
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of sensor behind a variable where it changes the validity rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SensorKind {
    #[default]
    Standard,
    /// Raw leaf-wetness grid counts
    RawLeaf,
    /// Leaf-wetness percent sensors
    WetnessPercent,
}

/// How a daily value is estimated from a full day of hourly readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DailyAggregation {
    #[default]
    None,
    Sum,
    Min(String),
    Max(String),
}

/// Temperature and humidity variables a derived dew point is computed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFrom {
    pub temperature: String,
    pub humidity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    pub category: Category,
    /// Canonical storage unit
    pub unit: Unit,
    pub sensor: SensorKind,
    pub aggregation: DailyAggregation,
    pub derived_from: Option<DerivedFrom>,
}

impl VariableDefinition {
    pub fn new(name: &str, category: Category, unit: Unit) -> Self {
        Self {
            name: name.to_string(),
            category,
            unit,
            sensor: SensorKind::Standard,
            aggregation: DailyAggregation::None,
            derived_from: None,
        }
    }

    pub fn with_sensor(mut self, sensor: SensorKind) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_aggregation(mut self, aggregation: DailyAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn derived_from(mut self, temperature: &str, humidity: &str) -> Self {
        self.derived_from = Some(DerivedFrom {
            temperature: temperature.to_string(),
            humidity: humidity.to_string(),
        });
        self
    }

    pub fn source_column(&self) -> String {
        format!("{}{}", self.name, crate::utils::constants::SOURCE_SUFFIX)
    }
}

/// Lookup table from variable name to its definition
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    definitions: HashMap<String, VariableDefinition>,
}

impl VariableRegistry {
    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Registry seeded with the station network's variables
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for definition in builtin_definitions() {
            registry.register(definition);
        }
        registry
    }

    /// Add or replace a definition
    pub fn register(&mut self, definition: VariableDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&VariableDefinition> {
        self.definitions.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<&VariableDefinition> {
        self.get(name)
            .ok_or_else(|| ProcessingError::UnknownVariable(name.to_string()))
    }

    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.get(name).map(|d| d.category)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions sorted by name
    pub fn definitions(&self) -> Vec<&VariableDefinition> {
        let mut defs: Vec<_> = self.definitions.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn min_of(base: &str) -> DailyAggregation {
    DailyAggregation::Min(base.to_string())
}

fn max_of(base: &str) -> DailyAggregation {
    DailyAggregation::Max(base.to_string())
}

fn builtin_definitions() -> Vec<VariableDefinition> {
    use Category::*;

    vec![
        VariableDefinition::new("TAIR", Temperature, Unit::Celsius),
        VariableDefinition::new("TAIR_MIN", Temperature, Unit::Celsius)
            .with_aggregation(min_of("TAIR")),
        VariableDefinition::new("TAIR_MAX", Temperature, Unit::Celsius)
            .with_aggregation(max_of("TAIR")),
        VariableDefinition::new("TSOIL", Temperature, Unit::Celsius),
        VariableDefinition::new("TSOIL_MIN", Temperature, Unit::Celsius)
            .with_aggregation(min_of("TSOIL")),
        VariableDefinition::new("TSOIL_MAX", Temperature, Unit::Celsius)
            .with_aggregation(max_of("TSOIL")),
        VariableDefinition::new("RELH", RelativeHumidity, Unit::Percent),
        VariableDefinition::new("RELH_MIN", RelativeHumidity, Unit::Percent)
            .with_aggregation(min_of("RELH")),
        VariableDefinition::new("RELH_MAX", RelativeHumidity, Unit::Percent)
            .with_aggregation(max_of("RELH")),
        VariableDefinition::new("PRECIP", Precipitation, Unit::Millimeter)
            .with_aggregation(DailyAggregation::Sum),
        VariableDefinition::new("RPET", Evapotranspiration, Unit::Millimeter)
            .with_aggregation(DailyAggregation::Sum),
        VariableDefinition::new("WSPD", WindSpeed, Unit::MetersPerSecond),
        VariableDefinition::new("WSPD_MAX", WindSpeed, Unit::MetersPerSecond)
            .with_aggregation(max_of("WSPD")),
        VariableDefinition::new("WDIR", WindDirection, Unit::Degree),
        VariableDefinition::new("WDSD", WindDirectionStdDev, Unit::Degree),
        VariableDefinition::new("LWET", LeafWetness, Unit::Fraction),
        VariableDefinition::new("LWET_RAW", LeafWetness, Unit::Raw)
            .with_sensor(SensorKind::RawLeaf),
        VariableDefinition::new("LWET_PCT", LeafWetness, Unit::Percent)
            .with_sensor(SensorKind::WetnessPercent),
        VariableDefinition::new("DEWP", DewPoint, Unit::Celsius).derived_from("TAIR", "RELH"),
        VariableDefinition::new("DEWP_MIN", DewPoint, Unit::Celsius)
            .with_aggregation(min_of("DEWP")),
        VariableDefinition::new("DEWP_MAX", DewPoint, Unit::Celsius)
            .with_aggregation(max_of("DEWP")),
        VariableDefinition::new("VAPR", VaporPressure, Unit::Kilopascal),
        VariableDefinition::new("VWC", SoilMoisture, Unit::CubicMeterPerCubicMeter),
        VariableDefinition::new("SRAD", SolarRadiation, Unit::KilojoulesPerSquareMeter),
        VariableDefinition::new("NRAD", NetRadiation, Unit::WattsPerSquareMeter),
        VariableDefinition::new("SHF", SoilHeatFlux, Unit::KilojoulesPerSquareMeter),
        VariableDefinition::new("BATV", Voltage, Unit::Volt),
        VariableDefinition::new("SFLUX", SolarFluxDensity, Unit::MegajoulesPerSquareMeter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_has_exactly_one_category() {
        let registry = VariableRegistry::new();
        assert_eq!(registry.category_of("TAIR"), Some(Category::Temperature));
        assert_eq!(
            registry.category_of("RELH_MAX"),
            Some(Category::RelativeHumidity)
        );
        assert_eq!(registry.category_of("SFLUX"), Some(Category::SolarFluxDensity));
        assert_eq!(registry.category_of("NOPE"), None);
        assert!(registry.lookup("NOPE").is_err());
    }

    #[test]
    fn test_all_sixteen_categories_are_covered() {
        let registry = VariableRegistry::new();
        let categories: std::collections::HashSet<Category> = registry
            .definitions()
            .iter()
            .map(|d| d.category)
            .collect();
        assert_eq!(categories.len(), 16);
    }

    #[test]
    fn test_min_max_companions_point_at_registered_bases() {
        let registry = VariableRegistry::new();
        for definition in registry.definitions() {
            match &definition.aggregation {
                DailyAggregation::Min(base) | DailyAggregation::Max(base) => {
                    assert!(registry.contains(base), "{} has no base", definition.name);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_register_extends_the_table() {
        let mut registry = VariableRegistry::empty();
        assert!(registry.is_empty());
        registry.register(VariableDefinition::new("TAIR_10M", Category::Temperature, Unit::Celsius));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("TAIR_10M").unwrap().source_column(), "TAIR_10M_src");
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!(Granularity::parse("HOURLY").unwrap(), Granularity::Hourly);
        assert_eq!(Granularity::parse("daily").unwrap(), Granularity::Daily);
        assert_eq!(Granularity::parse("sub-hourly").unwrap(), Granularity::SubHourly);
        assert!(Granularity::parse("weekly").is_err());
    }
}
