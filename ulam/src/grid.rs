//! Wraparound latitude/longitude grids and bilinear sampling.
//!
//! Grids cover the whole globe with square cells of [`GridSpec::resolution`]
//! degrees. Values are stored row-major: row `j` is a latitude band counted
//! from the north pole, column `i` is a longitude band counted eastward from
//! the antimeridian.
//!
//! ## Index mapping
//!
//! For a point `(lat, lng)`:
//!
//! - `x = (90 - lat) mod 180` selects the row, `y = (lng + 180) mod 360`
//!   selects the column
//! - both axes wrap, so the last row and column interpolate towards row 0
//!   and column 0
//!
//! This makes sampling total: every finite coordinate, including the poles
//! and the antimeridian, lands in a valid cell.

use crate::error::{Result, UlamError};
use crate::geo::GeoPoint;

/// Default grid resolution in degrees (900 × 450 cells).
pub const DEFAULT_RESOLUTION: f64 = 0.4;

/// Distance in cell units within which a coordinate snaps onto a grid node.
const NODE_EPSILON: f64 = 1e-9;

/// Shape of a global grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    resolution: f64,
    lon_cells: usize,
    lat_cells: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            lon_cells: 900,
            lat_cells: 450,
        }
    }
}

impl GridSpec {
    /// Create a grid spec for the given cell size in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`UlamError::InvalidResolution`] unless the resolution is
    /// positive and divides 180° into a whole number of cells.
    pub fn new(resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 || resolution > 180.0 {
            return Err(UlamError::InvalidResolution { resolution });
        }
        let lat = 180.0 / resolution;
        if (lat - lat.round()).abs() > 1e-6 {
            return Err(UlamError::InvalidResolution { resolution });
        }
        Ok(Self {
            resolution,
            lon_cells: (360.0 / resolution).round() as usize,
            lat_cells: lat.round() as usize,
        })
    }

    /// Cell size in degrees.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of longitude cells (columns).
    pub fn lon_cells(&self) -> usize {
        self.lon_cells
    }

    /// Number of latitude cells (rows).
    pub fn lat_cells(&self) -> usize {
        self.lat_cells
    }

    /// Total number of grid nodes.
    pub fn len(&self) -> usize {
        self.lon_cells * self.lat_cells
    }

    /// Always false; a valid spec has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the cell enclosing `point` and the fractional offsets within it.
    pub fn locate(&self, point: GeoPoint) -> CellLocation {
        let mut x = (-point.lat + 90.0) % 180.0;
        if x < 0.0 {
            x += 180.0;
        }
        let mut y = (point.lng + 180.0) % 360.0;
        if y < 0.0 {
            y += 360.0;
        }

        let row = snap_to_node(x / self.resolution);
        let col = snap_to_node(y / self.resolution);

        let j_floor = row.floor();
        let i_floor = col.floor();
        // Offsets come from the unwrapped floor so a coordinate that lands
        // exactly on the seam gets a zero offset at index 0.
        let a = row - j_floor;
        let b = col - i_floor;

        let j = (j_floor as usize) % self.lat_cells;
        let i = (i_floor as usize) % self.lon_cells;

        CellLocation {
            i,
            j,
            ip: (i + 1) % self.lon_cells,
            jp: (j + 1) % self.lat_cells,
            a,
            b,
        }
    }
}

fn snap_to_node(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() < NODE_EPSILON {
        nearest
    } else {
        v
    }
}

/// The four grid nodes surrounding a point and its position inside the cell.
///
/// `i`/`ip` index longitude columns, `j`/`jp` index latitude rows. `a` is the
/// fractional offset along the rows (towards `jp`), `b` along the columns
/// (towards `ip`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellLocation {
    pub i: usize,
    pub j: usize,
    pub ip: usize,
    pub jp: usize,
    pub a: f64,
    pub b: f64,
}

/// A global grid of scalar values.
#[derive(Debug, Clone)]
pub struct ScalarGrid {
    spec: GridSpec,
    values: Vec<f64>,
}

impl ScalarGrid {
    /// Build a grid from nested rows (`rows[j][i]`).
    ///
    /// # Errors
    ///
    /// Returns [`UlamError::InvalidGridShape`] if the row count or any row
    /// length disagrees with `spec`.
    pub fn from_rows(spec: GridSpec, rows: Vec<Vec<f64>>, field: &'static str) -> Result<Self> {
        let shape_error = |bad_row: usize, cols: usize| UlamError::InvalidGridShape {
            field,
            expected_rows: spec.lat_cells,
            expected_cols: spec.lon_cells,
            rows: rows.len(),
            bad_row,
            cols,
        };

        if rows.len() != spec.lat_cells {
            let cols = rows.first().map(Vec::len).unwrap_or(0);
            return Err(shape_error(0, cols));
        }
        if let Some((bad_row, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != spec.lon_cells)
        {
            return Err(shape_error(bad_row, row.len()));
        }

        let mut values = Vec::with_capacity(spec.len());
        for row in rows {
            values.extend(row);
        }
        Ok(Self { spec, values })
    }

    /// Build a grid by evaluating `f(j, i)` at every node.
    pub fn from_fn(spec: GridSpec, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(spec.len());
        for j in 0..spec.lat_cells {
            for i in 0..spec.lon_cells {
                values.push(f(j, i));
            }
        }
        Self { spec, values }
    }

    /// Build a grid with the same value everywhere.
    pub fn constant(spec: GridSpec, value: f64) -> Self {
        Self {
            spec,
            values: vec![value; spec.len()],
        }
    }

    /// The grid shape.
    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Value at row `j`, column `i`. Indices wrap around both axes.
    pub fn get(&self, j: usize, i: usize) -> f64 {
        let j = j % self.spec.lat_cells;
        let i = i % self.spec.lon_cells;
        self.values[j * self.spec.lon_cells + i]
    }

    /// Minimum and maximum stored values, ignoring NaN.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Bilinear interpolation over the four corners of `loc`.
    pub fn sample(&self, loc: &CellLocation) -> f64 {
        let CellLocation { i, j, ip, jp, a, b } = *loc;
        (1.0 - b) * ((1.0 - a) * self.get(j, i) + a * self.get(jp, i))
            + b * ((1.0 - a) * self.get(j, ip) + a * self.get(jp, ip))
    }

    /// Bilinear interpolation at a geographic point.
    pub fn sample_at(&self, point: GeoPoint) -> f64 {
        self.sample(&self.spec.locate(point))
    }
}

/// Temperature and pressure sampled at one point of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    /// Temperature in Kelvin.
    pub temperature_k: f64,
    /// Pressure in Pascal.
    pub pressure_pa: f64,
}

/// A pair of temperature (K) and pressure (Pa) grids at one instant.
#[derive(Debug, Clone)]
pub struct Field {
    temperature: ScalarGrid,
    pressure: ScalarGrid,
}

impl Field {
    /// Pair a temperature and a pressure grid.
    ///
    /// # Errors
    ///
    /// Returns [`UlamError::InvalidGridShape`] if the two grids differ in shape.
    pub fn new(temperature: ScalarGrid, pressure: ScalarGrid) -> Result<Self> {
        if temperature.spec != pressure.spec {
            return Err(UlamError::InvalidGridShape {
                field: "pressure",
                expected_rows: temperature.spec.lat_cells,
                expected_cols: temperature.spec.lon_cells,
                rows: pressure.spec.lat_cells,
                bad_row: 0,
                cols: pressure.spec.lon_cells,
            });
        }
        Ok(Self {
            temperature,
            pressure,
        })
    }

    /// The shared grid shape.
    pub fn spec(&self) -> GridSpec {
        self.temperature.spec
    }

    /// Temperature grid in Kelvin.
    pub fn temperature(&self) -> &ScalarGrid {
        &self.temperature
    }

    /// Pressure grid in Pascal.
    pub fn pressure(&self) -> &ScalarGrid {
        &self.pressure
    }

    /// Sample both grids at a precomputed cell location.
    pub fn sample(&self, loc: &CellLocation) -> FieldSample {
        FieldSample {
            temperature_k: self.temperature.sample(loc),
            pressure_pa: self.pressure.sample(loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid whose node value encodes its own indices.
    fn index_grid(spec: GridSpec) -> ScalarGrid {
        ScalarGrid::from_fn(spec, |j, i| (j * 1000 + i) as f64)
    }

    /// Smooth field: depends on longitude and latitude continuously.
    fn smooth_grid(spec: GridSpec) -> ScalarGrid {
        ScalarGrid::from_fn(spec, |j, i| {
            let lng = i as f64 * spec.resolution() - 180.0;
            let lat = 90.0 - j as f64 * spec.resolution();
            280.0 + 10.0 * lng.to_radians().cos() + 5.0 * lat.to_radians().sin()
        })
    }

    #[test]
    fn test_default_spec() {
        let spec = GridSpec::default();
        assert_eq!(spec.lon_cells(), 900);
        assert_eq!(spec.lat_cells(), 450);
        assert_eq!(spec.len(), 405_000);
        assert_eq!(GridSpec::new(0.4).unwrap(), spec);
    }

    #[test]
    fn test_invalid_resolution() {
        assert!(GridSpec::new(0.0).is_err());
        assert!(GridSpec::new(-1.0).is_err());
        assert!(GridSpec::new(0.7).is_err());
        assert!(GridSpec::new(f64::NAN).is_err());
        assert!(GridSpec::new(10.0).is_ok());
    }

    #[test]
    fn test_locate_origin() {
        let spec = GridSpec::default();
        // lat 90, lng -180 is node (0, 0)
        let loc = spec.locate(GeoPoint::new(90.0, -180.0));
        assert_eq!((loc.i, loc.j, loc.ip, loc.jp), (0, 0, 1, 1));
        assert_eq!((loc.a, loc.b), (0.0, 0.0));
    }

    #[test]
    fn test_locate_wraps_last_cells() {
        let spec = GridSpec::default();
        let loc = spec.locate(GeoPoint::new(-89.9, 179.9));
        assert_eq!(loc.i, 899);
        assert_eq!(loc.ip, 0);
        assert_eq!(loc.j, 449);
        assert_eq!(loc.jp, 0);
        assert!((loc.a - 0.75).abs() < 1e-9);
        assert!((loc.b - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_locate_antimeridian_seam() {
        let spec = GridSpec::default();
        // lng 180 wraps onto column 0 with no offset
        let loc = spec.locate(GeoPoint::new(0.0, 180.0));
        assert_eq!(loc.i, 0);
        assert_eq!(loc.b, 0.0);
        // A value rounding onto the seam from below
        let loc = spec.locate(GeoPoint::new(0.0, -180.0 - 1e-14));
        assert_eq!(loc.i, 0);
        assert!(loc.b.abs() < 1e-9);
    }

    #[test]
    fn test_locate_poles() {
        let spec = GridSpec::default();
        for lat in [90.0, -90.0] {
            let loc = spec.locate(GeoPoint::new(lat, 10.0));
            assert_eq!(loc.j, 0);
            assert_eq!(loc.a, 0.0);
        }
    }

    #[test]
    fn test_sample_exact_node() {
        let spec = GridSpec::default();
        let grid = index_grid(spec);
        // Row j=100 is lat 50, column i=250 is lng -80
        assert_eq!(grid.sample_at(GeoPoint::new(50.0, -80.0)), 100_250.0);
        // Row j=225 is the equator, column i=450 is lng 0
        assert_eq!(grid.sample_at(GeoPoint::new(0.0, 0.0)), 225_450.0);
        assert_eq!(grid.sample_at(GeoPoint::new(90.0, -180.0)), 0.0);
    }

    #[test]
    fn test_sample_corner_weights() {
        let spec = GridSpec::new(10.0).unwrap();
        let grid = ScalarGrid::from_fn(spec, |j, i| match (j, i) {
            (0, 0) => 1.0,
            (1, 0) => 2.0,
            (0, 1) => 3.0,
            (1, 1) => 4.0,
            _ => 0.0,
        });
        // Centre of the first cell: all four corners weigh 1/4
        let v = grid.sample_at(GeoPoint::new(85.0, -175.0));
        assert!((v - 2.5).abs() < 1e-12);
        // a moves towards row 1, b towards column 1
        let loc = CellLocation {
            i: 0,
            j: 0,
            ip: 1,
            jp: 1,
            a: 1.0,
            b: 0.0,
        };
        assert_eq!(grid.sample(&loc), 2.0);
        let loc = CellLocation { a: 0.0, b: 1.0, ..loc };
        assert_eq!(grid.sample(&loc), 3.0);
    }

    #[test]
    fn test_sample_continuous_across_antimeridian() {
        let spec = GridSpec::default();
        let grid = smooth_grid(spec);
        let east = grid.sample_at(GeoPoint::new(12.3, 179.9999));
        let west = grid.sample_at(GeoPoint::new(12.3, -179.9999));

        // Largest change between neighbouring nodes of this field
        let step = 10.0 * spec.resolution().to_radians() + 5.0 * spec.resolution().to_radians();
        assert!((east - west).abs() <= step, "east={} west={}", east, west);
    }

    #[test]
    fn test_sample_total_over_globe() {
        let spec = GridSpec::default();
        let grid = smooth_grid(spec);
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lng = -180.0;
            while lng <= 180.0 {
                let v = grid.sample_at(GeoPoint::new(lat, lng));
                assert!(v.is_finite(), "lat={} lng={}", lat, lng);
                assert!((265.0..=295.0).contains(&v), "lat={} lng={} v={}", lat, lng, v);
                lng += 0.37;
            }
            lat += 0.53;
        }
    }

    #[test]
    fn test_get_wraps() {
        let spec = GridSpec::new(10.0).unwrap();
        let grid = index_grid(spec);
        assert_eq!(grid.get(18, 36), grid.get(0, 0));
        assert_eq!(grid.get(1, 37), 1001.0);
    }

    #[test]
    fn test_from_rows_shape_validation() {
        let spec = GridSpec::new(10.0).unwrap();
        let good = vec![vec![0.0; 36]; 18];
        assert!(ScalarGrid::from_rows(spec, good, "t_initial").is_ok());

        let short = vec![vec![0.0; 36]; 17];
        assert!(matches!(
            ScalarGrid::from_rows(spec, short, "t_initial"),
            Err(UlamError::InvalidGridShape { rows: 17, .. })
        ));

        let mut ragged = vec![vec![0.0; 36]; 18];
        ragged[5].pop();
        assert!(matches!(
            ScalarGrid::from_rows(spec, ragged, "p_final"),
            Err(UlamError::InvalidGridShape {
                field: "p_final",
                bad_row: 5,
                cols: 35,
                ..
            })
        ));
    }

    #[test]
    fn test_field_requires_matching_specs() {
        let a = ScalarGrid::constant(GridSpec::new(10.0).unwrap(), 1.0);
        let b = ScalarGrid::constant(GridSpec::new(5.0).unwrap(), 1.0);
        assert!(Field::new(a.clone(), a.clone()).is_ok());
        assert!(Field::new(a, b).is_err());
    }

    #[test]
    fn test_min_max() {
        let spec = GridSpec::new(10.0).unwrap();
        let grid = index_grid(spec);
        assert_eq!(grid.min_max(), Some((0.0, 17_035.0)));
    }
}
