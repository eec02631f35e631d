use serde::{Deserialize, Serialize};

/// Physical dimension shared by a family of interconvertible units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Temperature,
    Length,
    Speed,
    Ratio,
    Irradiance,
    EnergyDensity,
    Pressure,
    Angle,
    Voltage,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Kelvin,
    Millimeter,
    Centimeter,
    Inch,
    MetersPerSecond,
    MilesPerHour,
    KilometersPerHour,
    Knots,
    Fraction,
    Percent,
    CubicMeterPerCubicMeter,
    WattsPerSquareMeter,
    KilojoulesPerSquareMeterPerMinute,
    LangleysPerMinute,
    KilojoulesPerSquareMeter,
    MegajoulesPerSquareMeter,
    Langley,
    Kilopascal,
    Hectopascal,
    Millibar,
    Degree,
    Volt,
    Millivolt,
    Raw,
}

impl Unit {
    /// Parse a unit string, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        let unit = match s.trim().to_uppercase().as_str() {
            "C" | "DEGC" | "CELSIUS" => Unit::Celsius,
            "F" | "DEGF" | "FAHRENHEIT" => Unit::Fahrenheit,
            "K" | "KELVIN" => Unit::Kelvin,
            "MM" => Unit::Millimeter,
            "CM" => Unit::Centimeter,
            "IN" | "INCH" | "INCHES" => Unit::Inch,
            "M/S" | "MPS" | "MS" => Unit::MetersPerSecond,
            "MPH" => Unit::MilesPerHour,
            "KM/H" | "KPH" | "KMH" => Unit::KilometersPerHour,
            "KT" | "KTS" | "KNOTS" => Unit::Knots,
            "FRACTION" | "FRAC" => Unit::Fraction,
            "PCT" | "%" | "PERCENT" => Unit::Percent,
            "M3/M3" => Unit::CubicMeterPerCubicMeter,
            "W/M2" => Unit::WattsPerSquareMeter,
            "KJ/M2/MIN" => Unit::KilojoulesPerSquareMeterPerMinute,
            "LY/MIN" => Unit::LangleysPerMinute,
            "KJ/M2" => Unit::KilojoulesPerSquareMeter,
            "MJ/M2" => Unit::MegajoulesPerSquareMeter,
            "LY" | "LANGLEY" => Unit::Langley,
            "KPA" => Unit::Kilopascal,
            "HPA" => Unit::Hectopascal,
            "MB" | "MBAR" => Unit::Millibar,
            "DEG" | "DEGREES" => Unit::Degree,
            "V" => Unit::Volt,
            "MV" => Unit::Millivolt,
            "RAW" | "UNITLESS" => Unit::Raw,
            _ => return None,
        };
        Some(unit)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Kelvin => "K",
            Unit::Millimeter => "MM",
            Unit::Centimeter => "CM",
            Unit::Inch => "IN",
            Unit::MetersPerSecond => "M/S",
            Unit::MilesPerHour => "MPH",
            Unit::KilometersPerHour => "KM/H",
            Unit::Knots => "KT",
            Unit::Fraction => "FRACTION",
            Unit::Percent => "PCT",
            Unit::CubicMeterPerCubicMeter => "M3/M3",
            Unit::WattsPerSquareMeter => "W/M2",
            Unit::KilojoulesPerSquareMeterPerMinute => "KJ/M2/MIN",
            Unit::LangleysPerMinute => "LY/MIN",
            Unit::KilojoulesPerSquareMeter => "KJ/M2",
            Unit::MegajoulesPerSquareMeter => "MJ/M2",
            Unit::Langley => "LY",
            Unit::Kilopascal => "KPA",
            Unit::Hectopascal => "HPA",
            Unit::Millibar => "MB",
            Unit::Degree => "DEG",
            Unit::Volt => "V",
            Unit::Millivolt => "MV",
            Unit::Raw => "RAW",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => Dimension::Temperature,
            Unit::Millimeter | Unit::Centimeter | Unit::Inch => Dimension::Length,
            Unit::MetersPerSecond | Unit::MilesPerHour | Unit::KilometersPerHour | Unit::Knots => {
                Dimension::Speed
            }
            Unit::Fraction | Unit::Percent | Unit::CubicMeterPerCubicMeter => Dimension::Ratio,
            Unit::WattsPerSquareMeter
            | Unit::KilojoulesPerSquareMeterPerMinute
            | Unit::LangleysPerMinute => Dimension::Irradiance,
            Unit::KilojoulesPerSquareMeter | Unit::MegajoulesPerSquareMeter | Unit::Langley => {
                Dimension::EnergyDensity
            }
            Unit::Kilopascal | Unit::Hectopascal | Unit::Millibar => Dimension::Pressure,
            Unit::Degree => Dimension::Angle,
            Unit::Volt | Unit::Millivolt => Dimension::Voltage,
            Unit::Raw => Dimension::Raw,
        }
    }

    /// Convert a value in this unit to the base unit of its dimension
    ///
    /// Base units: °C, mm, m/s, fraction, W/m², kJ/m², kPa, degree, V.
    fn to_base(self, value: f64) -> f64 {
        match self {
            Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            Unit::Kelvin => value - 273.15,
            Unit::Centimeter => value * 10.0,
            Unit::Inch => value * 25.4,
            Unit::MilesPerHour => value * 0.44704,
            Unit::KilometersPerHour => value / 3.6,
            Unit::Knots => value * 1852.0 / 3600.0,
            Unit::Percent => value / 100.0,
            Unit::KilojoulesPerSquareMeterPerMinute => value * 1000.0 / 60.0,
            Unit::LangleysPerMinute => value * 41840.0 / 60.0,
            Unit::MegajoulesPerSquareMeter => value * 1000.0,
            Unit::Langley => value * 41.84,
            Unit::Hectopascal | Unit::Millibar => value / 10.0,
            Unit::Millivolt => value / 1000.0,
            _ => value,
        }
    }

    fn from_base(self, value: f64) -> f64 {
        match self {
            Unit::Fahrenheit => value * 9.0 / 5.0 + 32.0,
            Unit::Kelvin => value + 273.15,
            Unit::Centimeter => value / 10.0,
            Unit::Inch => value / 25.4,
            Unit::MilesPerHour => value / 0.44704,
            Unit::KilometersPerHour => value * 3.6,
            Unit::Knots => value * 3600.0 / 1852.0,
            Unit::Percent => value * 100.0,
            Unit::KilojoulesPerSquareMeterPerMinute => value * 60.0 / 1000.0,
            Unit::LangleysPerMinute => value * 60.0 / 41840.0,
            Unit::MegajoulesPerSquareMeter => value / 1000.0,
            Unit::Langley => value / 41.84,
            Unit::Hectopascal | Unit::Millibar => value * 10.0,
            Unit::Millivolt => value * 1000.0,
            _ => value,
        }
    }

    /// Convert `value` from this unit into `target`; `None` across dimensions
    pub fn convert(self, value: f64, target: Unit) -> Option<f64> {
        if self.dimension() != target.dimension() {
            return None;
        }
        if self == target {
            return Some(value);
        }
        Some(target.from_base(self.to_base(value)))
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Unit::parse("mm"), Some(Unit::Millimeter));
        assert_eq!(Unit::parse(" In "), Some(Unit::Inch));
        assert_eq!(Unit::parse("w/m2"), Some(Unit::WattsPerSquareMeter));
        assert_eq!(Unit::parse("furlongs"), None);
    }

    #[test]
    fn test_temperature_conversions() {
        assert!(close(Unit::Celsius.convert(25.0, Unit::Fahrenheit).unwrap(), 77.0));
        assert!(close(Unit::Celsius.convert(25.0, Unit::Kelvin).unwrap(), 298.15));
        assert!(close(Unit::Fahrenheit.convert(77.0, Unit::Celsius).unwrap(), 25.0));
        assert!(close(Unit::Kelvin.convert(273.15, Unit::Fahrenheit).unwrap(), 32.0));
    }

    #[test]
    fn test_radiation_conversions() {
        // 1 ly/min = 41840 J/m² per 60 s
        let w = Unit::LangleysPerMinute
            .convert(1.0, Unit::WattsPerSquareMeter)
            .unwrap();
        assert!((w - 697.3333).abs() < 1e-3);

        let kj = Unit::WattsPerSquareMeter
            .convert(1000.0, Unit::KilojoulesPerSquareMeterPerMinute)
            .unwrap();
        assert!(close(kj, 60.0));
    }

    #[test]
    fn test_cross_dimension_is_rejected() {
        assert_eq!(Unit::Millimeter.convert(1.0, Unit::Celsius), None);
        assert_eq!(Unit::Raw.convert(1.0, Unit::Percent), None);
    }

    #[test]
    fn test_ratio_conversions() {
        assert!(close(Unit::Fraction.convert(0.35, Unit::Percent).unwrap(), 35.0));
        assert!(close(
            Unit::Percent
                .convert(35.0, Unit::CubicMeterPerCubicMeter)
                .unwrap(),
            0.35
        ));
    }
}
