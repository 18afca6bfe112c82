//! Geographic points and antipodes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UlamError};

/// A point on the globe in decimal degrees.
///
/// Latitude is expected in `[-90, 90]` and longitude in `(-180, 180]`.
/// Construction does not validate; use [`GeoPoint::checked`] at API
/// boundaries where input comes from users.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point without validation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Create a point, rejecting non-finite or out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`UlamError::OutOfBounds`] if latitude is outside `[-90, 90]`
    /// or longitude is outside `[-180, 180]`.
    pub fn checked(lat: f64, lng: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(UlamError::OutOfBounds { lat, lon: lng });
        }
        Ok(Self { lat, lng })
    }

    /// Returns the point diametrically opposite this one.
    ///
    /// The longitude stays within `(-180, 180]`. Applying it twice returns
    /// the original point. Longitude `0` maps to `180`; `-180` and `180`
    /// both map to `0`.
    ///
    /// # Example
    ///
    /// ```
    /// use ulam::GeoPoint;
    ///
    /// let london = GeoPoint::new(51.5, -0.1);
    /// let anti = london.antipode();
    /// assert_eq!(anti.lat, -51.5);
    /// assert!((anti.lng - 179.9).abs() < 1e-9);
    /// ```
    pub fn antipode(&self) -> GeoPoint {
        let lng = if self.lng > 0.0 {
            -(180.0 - self.lng)
        } else {
            -(-180.0 - self.lng)
        };
        GeoPoint { lat: -self.lat, lng }
    }
}

impl From<(f64, f64)> for GeoPoint {
    /// Build from a `(lat, lng)` pair.
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: GeoPoint, b: GeoPoint) {
        assert!((a.lat - b.lat).abs() < 1e-9, "{:?} != {:?}", a, b);
        assert!((a.lng - b.lng).abs() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_antipode_basic() {
        let p = GeoPoint::new(50.0, -80.0);
        assert_close(p.antipode(), GeoPoint::new(-50.0, 100.0));

        let p = GeoPoint::new(-33.9, 151.2);
        assert_close(p.antipode(), GeoPoint::new(33.9, -28.8));
    }

    #[test]
    fn test_antipode_is_involution() {
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lng = -179.5;
            while lng <= 180.0 {
                let p = GeoPoint::new(lat, lng);
                assert_close(p.antipode().antipode(), p);
                lng += 7.25;
            }
            lat += 2.5;
        }
        // Seam and prime meridian
        for lng in [0.0, 180.0, 1e-12, -1e-12, 179.9999, -179.9999] {
            let p = GeoPoint::new(12.0, lng);
            assert_close(p.antipode().antipode(), p);
        }
    }

    #[test]
    fn test_antipode_stays_in_range() {
        for lng in [-179.9, -90.0, 0.0, 0.1, 90.0, 180.0] {
            let anti = GeoPoint::new(0.0, lng).antipode();
            assert!(anti.lng > -180.0 && anti.lng <= 180.0, "lng={}", anti.lng);
        }
    }

    #[test]
    fn test_antipode_seam_edge_cases() {
        assert_eq!(GeoPoint::new(0.0, 0.0).antipode().lng, 180.0);
        assert_eq!(GeoPoint::new(0.0, 180.0).antipode().lng, 0.0);
        assert_eq!(GeoPoint::new(0.0, -180.0).antipode().lng, 0.0);
    }

    #[test]
    fn test_checked() {
        assert!(GeoPoint::checked(45.0, 120.0).is_ok());
        assert!(GeoPoint::checked(90.0, 180.0).is_ok());
        assert!(GeoPoint::checked(91.0, 0.0).is_err());
        assert!(GeoPoint::checked(0.0, -180.5).is_err());
        assert!(GeoPoint::checked(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::checked(0.0, f64::INFINITY).is_err());
    }
}
