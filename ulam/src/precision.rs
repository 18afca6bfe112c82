//! Zoom-dependent display precision and formatted sample results.

use serde::Serialize;

use crate::geo::GeoPoint;
use crate::interpolate::Conditions;

/// Unit suffix for temperatures.
pub const TEMPERATURE_UNIT: &str = "°C";
/// Unit suffix for pressures.
pub const PRESSURE_UNIT: &str = "kPa";
/// Unit suffix for coordinates.
pub const DEGREE_UNIT: &str = "°";

/// Decimal places used when displaying a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Precision {
    pub temperature: usize,
    pub pressure: usize,
    pub coordinate: usize,
}

impl Precision {
    /// Decimal places for a map zoom level. More zoom shows more digits.
    ///
    /// | zoom | temperature | pressure | coordinate |
    /// |------|-------------|----------|------------|
    /// | < 2  | 1 | 2 | 1 |
    /// | < 3  | 2 | 2 | 2 |
    /// | < 4  | 3 | 3 | 3 |
    /// | < 5  | 3 | 3 | 4 |
    /// | ≥ 5  | 3 | 3 | 5 |
    pub fn for_zoom(zoom: f64) -> Self {
        let (temperature, pressure, coordinate) = if zoom < 2.0 {
            (1, 2, 1)
        } else if zoom < 3.0 {
            (2, 2, 2)
        } else if zoom < 4.0 {
            (3, 3, 3)
        } else if zoom < 5.0 {
            (3, 3, 4)
        } else {
            (3, 3, 5)
        };
        Self {
            temperature,
            pressure,
            coordinate,
        }
    }
}

/// Extra digits inspected when deciding whether a value is an exact tie.
const TIE_CHECK_DIGITS: usize = 25;

/// Format `value` with a fixed number of decimals.
///
/// Values exactly halfway between two candidates round away from zero, so
/// `27.25` at one decimal is `"27.3"`. Values that only look like ties in
/// decimal, such as `2.675` (stored as `2.67499...`), round down as usual.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if value.is_finite() && is_exact_tie(value.abs(), decimals) {
        let nudged = f64::from_bits(value.abs().to_bits() + 1);
        let text = format!("{:.*}", decimals, nudged);
        return if value.is_sign_negative() {
            format!("-{}", text)
        } else {
            text
        };
    }
    format!("{:.*}", decimals, value)
}

fn is_exact_tie(magnitude: f64, decimals: usize) -> bool {
    let text = format!("{:.*}", decimals + TIE_CHECK_DIGITS, magnitude);
    let Some((_, fraction)) = text.split_once('.') else {
        return false;
    };
    let mut rest = fraction[decimals..].chars();
    rest.next() == Some('5') && rest.all(|c| c == '0')
}

/// Display strings for one sample, without units or markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelFragments {
    pub temperature: String,
    pub pressure: String,
    pub latitude: String,
    pub longitude: String,
}

/// Temperature and pressure at a point, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    /// The sampled location.
    pub point: GeoPoint,
    /// Temperature in degrees Celsius, unrounded.
    pub temperature_celsius: f64,
    /// Pressure in kilopascals, unrounded.
    pub pressure_kpa: f64,
    /// Decimal places applied to the label.
    pub precision: Precision,
    /// Rounded display strings.
    pub label: LabelFragments,
}

impl SampleResult {
    /// Round `conditions` at `point` according to `precision`.
    pub fn new(point: GeoPoint, conditions: Conditions, precision: Precision) -> Self {
        let label = LabelFragments {
            temperature: format_fixed(conditions.temperature_celsius, precision.temperature),
            pressure: format_fixed(conditions.pressure_kpa, precision.pressure),
            latitude: format_fixed(point.lat, precision.coordinate),
            longitude: format_fixed(point.lng, precision.coordinate),
        };
        Self {
            point,
            temperature_celsius: conditions.temperature_celsius,
            pressure_kpa: conditions.pressure_kpa,
            precision,
            label,
        }
    }

    /// Single-line summary, e.g. `27.0°C, 101.33kPa at (50.0°, -80.0°)`.
    pub fn summary(&self) -> String {
        format!(
            "{}{}, {}{} at ({}{}, {}{})",
            self.label.temperature,
            TEMPERATURE_UNIT,
            self.label.pressure,
            PRESSURE_UNIT,
            self.label.latitude,
            DEGREE_UNIT,
            self.label.longitude,
            DEGREE_UNIT
        )
    }
}

/// Which displayed quantities agree between a point and its antipode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    /// Temperature and pressure both match at display precision.
    Both,
    /// Only temperature matches.
    Temperature,
    /// Only pressure matches.
    Pressure,
    /// Neither matches.
    None,
}

impl Highlight {
    /// Compare the rounded labels of two samples.
    pub fn compare(a: &SampleResult, b: &SampleResult) -> Self {
        let temperature = a.label.temperature == b.label.temperature;
        let pressure = a.label.pressure == b.label.pressure;
        match (temperature, pressure) {
            (true, true) => Highlight::Both,
            (true, false) => Highlight::Temperature,
            (false, true) => Highlight::Pressure,
            (false, false) => Highlight::None,
        }
    }

    /// The snake_case name used in JSON and CSV output.
    pub fn as_str(self) -> &'static str {
        match self {
            Highlight::Both => "both",
            Highlight::Temperature => "temperature",
            Highlight::Pressure => "pressure",
            Highlight::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn precision_tuple(zoom: f64) -> (usize, usize, usize) {
        let p = Precision::for_zoom(zoom);
        (p.temperature, p.pressure, p.coordinate)
    }

    #[test]
    fn test_precision_thresholds() {
        assert_eq!(precision_tuple(0.0), (1, 2, 1));
        assert_eq!(precision_tuple(1.5), (1, 2, 1));
        assert_eq!(precision_tuple(2.0), (2, 2, 2));
        assert_eq!(precision_tuple(3.5), (3, 3, 3));
        assert_eq!(precision_tuple(4.5), (3, 3, 4));
        assert_eq!(precision_tuple(5.0), (3, 3, 5));
        assert_eq!(precision_tuple(6.0), (3, 3, 5));
        assert_eq!(precision_tuple(12.0), (3, 3, 5));
    }

    #[test]
    fn test_precision_monotonic() {
        let mut previous = Precision::for_zoom(0.0);
        let mut zoom = 0.0;
        while zoom <= 12.0 {
            let p = Precision::for_zoom(zoom);
            assert!(p.temperature >= previous.temperature);
            assert!(p.pressure >= previous.pressure);
            assert!(p.coordinate >= previous.coordinate);
            previous = p;
            zoom += 0.25;
        }
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(300.15 - 273.15, 2), "27.00");
        assert_eq!(format_fixed(101.325, 3), "101.325");
        assert_eq!(format_fixed(-3.14159, 1), "-3.1");
        assert_eq!(format_fixed(12.0, 0), "12");
    }

    #[test]
    fn test_format_fixed_ties_round_up() {
        assert_eq!(format_fixed(27.25, 1), "27.3");
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(-0.125, 2), "-0.13");
        assert_eq!(format_fixed(2.5, 0), "3");
        // Stored just below the halfway point
        assert_eq!(format_fixed(2.675, 2), "2.67");
        assert_eq!(format_fixed(1.005, 2), "1.00");
    }

    #[test]
    fn test_sample_result_labels() {
        let conditions = Conditions {
            temperature_celsius: 27.0,
            pressure_kpa: 101.325,
        };
        let result = SampleResult::new(
            GeoPoint::new(50.0, -80.0),
            conditions,
            Precision::for_zoom(0.0),
        );
        assert_eq!(result.label.temperature, "27.0");
        assert_eq!(result.label.pressure, "101.33");
        assert_eq!(result.label.latitude, "50.0");
        assert_eq!(result.label.longitude, "-80.0");
        assert_eq!(result.summary(), "27.0°C, 101.33kPa at (50.0°, -80.0°)");
    }

    #[test]
    fn test_highlight() {
        let at = |t: f64, p: f64| {
            SampleResult::new(
                GeoPoint::new(0.0, 0.0),
                Conditions {
                    temperature_celsius: t,
                    pressure_kpa: p,
                },
                Precision::for_zoom(0.0),
            )
        };
        assert_eq!(Highlight::compare(&at(10.01, 99.0), &at(10.04, 99.0)), Highlight::Both);
        assert_eq!(Highlight::compare(&at(10.0, 99.0), &at(10.0, 98.0)), Highlight::Temperature);
        assert_eq!(Highlight::compare(&at(10.0, 99.0), &at(11.0, 99.0)), Highlight::Pressure);
        assert_eq!(Highlight::compare(&at(10.0, 99.0), &at(11.0, 98.0)), Highlight::None);
        assert_eq!(Highlight::Temperature.as_str(), "temperature");
    }
}
