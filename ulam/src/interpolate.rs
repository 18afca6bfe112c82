//! Spatial and temporal interpolation of the climate fields.
//!
//! A query samples the initial and final fields bilinearly at the same
//! [`CellLocation`](crate::grid::CellLocation), then blends the two results
//! linearly in time and converts to display units.

use serde::Serialize;

use crate::dataset::Dataset;
use crate::geo::GeoPoint;
use crate::grid::FieldSample;
use crate::precision::{Precision, SampleResult};
use crate::selector::SelectedTimestep;

/// Offset between Kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Pascals per kilopascal.
pub const PASCALS_PER_KILOPASCAL: f64 = 1000.0;

/// Convert Kelvin to degrees Celsius.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Convert Pascal to kilopascal.
pub fn pascal_to_kilopascal(pascal: f64) -> f64 {
    pascal / PASCALS_PER_KILOPASCAL
}

/// Interpolated conditions in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Conditions {
    pub temperature_celsius: f64,
    pub pressure_kpa: f64,
}

/// Position of `current` between the two forecast steps.
///
/// `0.0` at `initial`, `1.0` at `final_`. Not clamped: timesteps outside the
/// range extrapolate linearly.
pub fn blend_fraction(current: f64, initial: f64, final_: f64) -> f64 {
    (current - initial) / (final_ - initial)
}

/// Linear blend of two field samples.
///
/// The endpoints are exact: `delta == 0.0` returns `initial` and
/// `delta == 1.0` returns `final_` bit for bit.
pub fn blend(initial: FieldSample, final_: FieldSample, delta: f64) -> FieldSample {
    let lerp = |a: f64, b: f64| {
        if delta == 0.0 {
            a
        } else if delta == 1.0 {
            b
        } else {
            delta * b + (1.0 - delta) * a
        }
    };
    FieldSample {
        temperature_k: lerp(initial.temperature_k, final_.temperature_k),
        pressure_pa: lerp(initial.pressure_pa, final_.pressure_pa),
    }
}

/// Raw field values at `point` and `current_timestep` (Kelvin and Pascal).
pub fn field_sample_at(dataset: &Dataset, point: GeoPoint, current_timestep: f64) -> FieldSample {
    let location = dataset.spec().locate(point);
    let initial = dataset.initial_field().sample(&location);
    let final_ = dataset.final_field().sample(&location);
    let delta = blend_fraction(
        current_timestep,
        dataset.initial_timestep(),
        dataset.final_timestep(),
    );
    blend(initial, final_, delta)
}

/// Temperature and pressure at `point` and `current_timestep`, in °C and kPa.
pub fn conditions_at(dataset: &Dataset, point: GeoPoint, current_timestep: f64) -> Conditions {
    let sample = field_sample_at(dataset, point, current_timestep);
    Conditions {
        temperature_celsius: kelvin_to_celsius(sample.temperature_k),
        pressure_kpa: pascal_to_kilopascal(sample.pressure_pa),
    }
}

/// Sample `dataset` at `point` for the selected timestep, rounded for `zoom`.
///
/// # Example
///
/// ```ignore
/// let selected = select_timestep(&dataset, Utc::now()).unwrap();
/// let result = sample_at(GeoPoint::new(50.0, -80.0), &dataset, &selected, 3.0);
/// println!("{}", result.summary());
/// ```
pub fn sample_at(
    point: GeoPoint,
    dataset: &Dataset,
    selected: &SelectedTimestep,
    zoom: f64,
) -> SampleResult {
    let conditions = conditions_at(dataset, point, selected.offset_seconds);
    SampleResult::new(point, conditions, Precision::for_zoom(zoom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawDataset;
    use crate::fixtures;
    use crate::grid::{GridSpec, ScalarGrid};
    use crate::precision::format_fixed;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(format_fixed(kelvin_to_celsius(300.15), 2), "27.00");
        assert_eq!(pascal_to_kilopascal(101_325.0), 101.325);
        assert_eq!(kelvin_to_celsius(KELVIN_OFFSET), 0.0);
    }

    #[test]
    fn test_blend_fraction() {
        assert_eq!(blend_fraction(0.0, 0.0, 1200.0), 0.0);
        assert_eq!(blend_fraction(600.0, 0.0, 1200.0), 0.5);
        assert_eq!(blend_fraction(1200.0, 0.0, 1200.0), 1.0);
        // Not clamped
        assert_eq!(blend_fraction(2400.0, 0.0, 1200.0), 2.0);
        assert_eq!(blend_fraction(-600.0, 0.0, 1200.0), -0.5);
    }

    #[test]
    fn test_blend_endpoints_exact() {
        let initial = FieldSample {
            temperature_k: 281.123_456_789,
            pressure_pa: 99_871.017,
        };
        let final_ = FieldSample {
            temperature_k: 289.987_654_321,
            pressure_pa: 101_003.3,
        };
        assert_eq!(blend(initial, final_, 0.0), initial);
        assert_eq!(blend(initial, final_, 1.0), final_);
    }

    #[test]
    fn test_conditions_at_timesteps() {
        let dataset = fixtures::dataset(&[0.0, 600.0, 1200.0]);
        let point = GeoPoint::new(12.3, 45.6);

        let start = conditions_at(&dataset, point, 0.0);
        assert!((start.temperature_celsius - (290.0 - KELVIN_OFFSET)).abs() < 1e-9);
        assert!((start.pressure_kpa - 100.0).abs() < 1e-9);

        let middle = conditions_at(&dataset, point, 600.0);
        assert!((middle.temperature_celsius - (293.0 - KELVIN_OFFSET)).abs() < 1e-9);
        assert!((middle.pressure_kpa - 100.6).abs() < 1e-9);

        let end = conditions_at(&dataset, point, 1200.0);
        assert!((end.temperature_celsius - (296.0 - KELVIN_OFFSET)).abs() < 1e-9);
        assert!((end.pressure_kpa - 101.2).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolates_beyond_final() {
        let dataset = fixtures::dataset(&[0.0]);
        let sample = field_sample_at(&dataset, GeoPoint::new(0.0, 0.0), 2400.0);
        assert!((sample.temperature_k - 302.0).abs() < 1e-9);
        assert!((sample.pressure_pa - 102_400.0).abs() < 1e-6);
    }

    #[test]
    fn test_endpoints_match_field_samples() {
        // Non-uniform fields so the endpoints are distinguishable
        let spec = GridSpec::new(fixtures::RESOLUTION).unwrap();
        let mut raw: RawDataset = fixtures::raw_dataset(&[0.0]);
        raw.t_initial = rows(spec, |j, i| 250.0 + j as f64 * 1.7 + i as f64 * 0.3);
        raw.t_final = rows(spec, |j, i| 260.0 + j as f64 * 0.9 - i as f64 * 0.1);
        let dataset = Dataset::try_from(raw).unwrap();

        let point = GeoPoint::new(-33.3, 151.2);
        let location = dataset.spec().locate(point);
        let initial = dataset.initial_field().sample(&location);
        let final_ = dataset.final_field().sample(&location);

        assert_eq!(field_sample_at(&dataset, point, 0.0), initial);
        assert_eq!(field_sample_at(&dataset, point, 1200.0), final_);
    }

    #[test]
    fn test_sample_at_rounding() {
        let dataset = fixtures::dataset(&[0.0, 600.0, 1200.0]);
        let selected = SelectedTimestep {
            index: 1,
            offset_seconds: 600.0,
            point: GeoPoint::new(11.0, 21.0),
        };

        let coarse = sample_at(GeoPoint::new(50.0, -80.0), &dataset, &selected, 1.0);
        assert_eq!(coarse.label.temperature, "19.9");
        assert_eq!(coarse.label.pressure, "100.60");
        assert_eq!(coarse.label.latitude, "50.0");

        let fine = sample_at(GeoPoint::new(50.0, -80.0), &dataset, &selected, 6.0);
        assert_eq!(fine.label.temperature, "19.850");
        assert_eq!(fine.label.pressure, "100.600");
        assert_eq!(fine.label.longitude, "-80.00000");
    }

    fn rows(spec: GridSpec, f: impl Fn(usize, usize) -> f64) -> Vec<Vec<f64>> {
        let grid = ScalarGrid::from_fn(spec, f);
        (0..spec.lat_cells())
            .map(|j| (0..spec.lon_cells()).map(|i| grid.get(j, i)).collect())
            .collect()
    }
}
