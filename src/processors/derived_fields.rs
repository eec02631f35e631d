//! Fields computed from other reconciled variables.

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Saturation vapor pressure (kPa) over water at `temperature_c`
pub fn saturated_vapor_pressure(temperature_c: f64) -> f64 {
    round_to(
        0.61078 * ((17.269 * temperature_c) / (temperature_c + 237.3)).exp(),
        6,
    )
}

/// Actual vapor pressure (kPa) from temperature and relative humidity (%)
pub fn actual_vapor_pressure(temperature_c: f64, humidity_pct: f64) -> f64 {
    round_to((humidity_pct / 100.0) * saturated_vapor_pressure(temperature_c), 6)
}

/// Dew point (°C, 3 decimals); `None` when the vapor pressure has no logarithm
pub fn dew_point(temperature_c: f64, humidity_pct: f64) -> Option<f64> {
    let vapor = actual_vapor_pressure(temperature_c, humidity_pct);
    if vapor <= 0.0 || !vapor.is_finite() {
        return None;
    }

    let ln_vapor = vapor.ln();
    let dew = (116.9 + 237.3 * ln_vapor) / (16.78 - ln_vapor);
    dew.is_finite().then(|| round_to(dew, 3))
}
