//! GeoJSON overlays for the map renderer.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use ulam::geojson::sample_geometry;
//! use geojson::Geometry;
//!
//! let line: Geometry = r#"{
//!     "type": "LineString",
//!     "coordinates": [[-80.0, 50.0], [100.0, -50.0]]
//! }"#.parse().unwrap();
//!
//! let samples = sample_geometry(&session, &line, 3.0)?;
//! // One Point feature per vertex with temperature_c / pressure_kpa properties
//! ```

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::error::{Result, UlamError};
use crate::geo::GeoPoint;
use crate::precision::SampleResult;
use crate::session::Session;

fn point_feature(point: GeoPoint, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::Point(vec![point.lng, point.lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn role(name: &str) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("role".to_string(), JsonValue::from(name));
    properties
}

/// The dashed equator line drawn on both maps.
pub fn equator_feature() -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::LineString(vec![
            vec![-180.0, 0.0],
            vec![180.0, 0.0],
        ]))),
        id: None,
        properties: Some(role("equator")),
        foreign_members: None,
    }
}

/// Markers for the selected snapshot point and its antipode, plus the equator.
pub fn markers_feature_collection(session: &Session) -> FeatureCollection {
    let (point, antipode) = session.marker_points();
    let selected = session.selected();

    let mut primary = role("ulam_point");
    primary.insert("index".to_string(), JsonValue::from(selected.index));
    primary.insert(
        "offset_seconds".to_string(),
        JsonValue::from(selected.offset_seconds),
    );

    FeatureCollection {
        bbox: None,
        features: vec![
            point_feature(point, primary),
            point_feature(antipode, role("antipodal_point")),
            equator_feature(),
        ],
        foreign_members: None,
    }
}

/// Properties describing one sample.
pub fn sample_properties(sample: &SampleResult) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert(
        "temperature_c".to_string(),
        JsonValue::from(sample.temperature_celsius),
    );
    properties.insert("pressure_kpa".to_string(), JsonValue::from(sample.pressure_kpa));
    properties.insert(
        "temperature_label".to_string(),
        JsonValue::from(sample.label.temperature.clone()),
    );
    properties.insert(
        "pressure_label".to_string(),
        JsonValue::from(sample.label.pressure.clone()),
    );
    properties
}

/// Convert a GeoJSON position (`[lon, lat, ...]`) into a point.
///
/// # Errors
///
/// Returns an error if the position has fewer than 2 elements or lies
/// outside the valid coordinate range.
pub fn position_to_point(position: &[f64]) -> Result<GeoPoint> {
    if position.len() < 2 {
        return Err(UlamError::InvalidCoordinate {
            message: "Coordinate must have at least 2 elements (lon, lat)".to_string(),
        });
    }
    GeoPoint::checked(position[1], position[0])
}

fn collect_positions(value: &GeoJsonValue, out: &mut Vec<Vec<f64>>) {
    match value {
        GeoJsonValue::Point(position) => out.push(position.clone()),
        GeoJsonValue::MultiPoint(positions) | GeoJsonValue::LineString(positions) => {
            out.extend(positions.iter().cloned())
        }
        GeoJsonValue::MultiLineString(lines) | GeoJsonValue::Polygon(lines) => {
            out.extend(lines.iter().flatten().cloned())
        }
        GeoJsonValue::MultiPolygon(polygons) => {
            out.extend(polygons.iter().flatten().flatten().cloned())
        }
        GeoJsonValue::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_positions(&geometry.value, out);
            }
        }
    }
}

/// Sample every vertex of `geometry`.
///
/// Returns one Point feature per vertex carrying the sampled values, in
/// traversal order.
///
/// # Errors
///
/// Returns an error if any vertex is malformed or out of range.
pub fn sample_geometry(session: &Session, geometry: &Geometry, zoom: f64) -> Result<FeatureCollection> {
    let mut positions = Vec::new();
    collect_positions(&geometry.value, &mut positions);

    let features = positions
        .iter()
        .map(|position| {
            let point = position_to_point(position)?;
            let sample = session.sample_at(point, zoom);
            Ok(point_feature(point, sample_properties(&sample)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::Duration;

    fn session() -> Session {
        Session::new(
            fixtures::dataset(&[0.0, 600.0, 1200.0]),
            None,
            fixtures::epoch() + Duration::seconds(700),
        )
    }

    fn coordinates(feature: &Feature) -> Vec<f64> {
        match &feature.geometry.as_ref().unwrap().value {
            GeoJsonValue::Point(position) => position.clone(),
            other => panic!("expected a point, got {:?}", other),
        }
    }

    #[test]
    fn test_markers() {
        let collection = markers_feature_collection(&session());
        assert_eq!(collection.features.len(), 3);

        assert_eq!(coordinates(&collection.features[0]), vec![21.0, 11.0]);
        assert_eq!(coordinates(&collection.features[1]), vec![-159.0, -11.0]);

        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties["role"], "ulam_point");
        assert_eq!(properties["index"], 1);
        assert_eq!(
            collection.features[2].properties.as_ref().unwrap()["role"],
            "equator"
        );
    }

    #[test]
    fn test_sample_point() {
        let geometry: Geometry = r#"{"type": "Point", "coordinates": [-80.0, 50.0]}"#
            .parse()
            .unwrap();
        let collection = sample_geometry(&session(), &geometry, 3.0).unwrap();

        assert_eq!(collection.features.len(), 1);
        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties["pressure_label"], "100.600");
    }

    #[test]
    fn test_sample_polygon_vertices() {
        let geometry: Geometry = r#"{
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 0]]]
        }"#
        .parse()
        .unwrap();
        let collection = sample_geometry(&session(), &geometry, 1.0).unwrap();
        assert_eq!(collection.features.len(), 4);
        assert_eq!(coordinates(&collection.features[2]), vec![10.0, 10.0]);
    }

    #[test]
    fn test_sample_geometry_collection() {
        let geometry: Geometry = r#"{
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [1, 2]},
                {"type": "LineString", "coordinates": [[3, 4], [5, 6]]}
            ]
        }"#
        .parse()
        .unwrap();
        let collection = sample_geometry(&session(), &geometry, 1.0).unwrap();
        assert_eq!(collection.features.len(), 3);
    }

    #[test]
    fn test_invalid_positions() {
        assert!(matches!(
            position_to_point(&[1.0]),
            Err(UlamError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            position_to_point(&[10.0, 95.0]),
            Err(UlamError::OutOfBounds { .. })
        ));

        let geometry: Geometry = r#"{"type": "Point", "coordinates": [200.0, 0.0]}"#
            .parse()
            .unwrap();
        assert!(sample_geometry(&session(), &geometry, 1.0).is_err());
    }
}
