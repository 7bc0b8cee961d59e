//! KML to GeoJSON conversion.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use kml::types::{Coord, Geometry as KmlGeometry, MultiGeometry, Placemark, Polygon};
use kml::Kml;

use crate::error::UploadError;

/// Parses raw KML text and returns one GeoJSON feature per placemark
/// geometry. Placemarks without a geometry are skipped; the placemark
/// name, when present, lands in the feature's `name` property.
pub fn features_from_kml(text: &str) -> Result<FeatureCollection, UploadError> {
    let kml: Kml = text
        .parse()
        .map_err(|e: kml::Error| UploadError::Parse(e.to_string()))?;
    let mut features = Vec::new();
    collect_features(&kml, &mut features);
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn collect_features(node: &Kml, out: &mut Vec<Feature>) {
    match node {
        Kml::KmlDocument(doc) => {
            for element in &doc.elements {
                collect_features(element, out);
            }
        }
        Kml::Document { elements, .. } | Kml::Folder { elements, .. } => {
            for element in elements {
                collect_features(element, out);
            }
        }
        Kml::Placemark(placemark) => {
            if let Some(feature) = feature_from_placemark(placemark) {
                out.push(feature);
            }
        }
        _ => {}
    }
}

fn feature_from_placemark(placemark: &Placemark) -> Option<Feature> {
    let geometry = placemark.geometry.as_ref()?;
    let value = value_from_geometry(geometry)?;
    let mut properties = JsonObject::new();
    if let Some(name) = &placemark.name {
        properties.insert("name".to_owned(), name.clone().into());
    }
    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

fn value_from_geometry(geometry: &KmlGeometry) -> Option<Value> {
    match geometry {
        KmlGeometry::Point(point) => Some(Value::Point(position(&point.coord))),
        KmlGeometry::LineString(line) => Some(Value::LineString(positions(&line.coords))),
        // A bare ring is a polygon boundary without holes.
        KmlGeometry::LinearRing(ring) => Some(Value::Polygon(vec![positions(&ring.coords)])),
        KmlGeometry::Polygon(polygon) => Some(Value::Polygon(rings(polygon))),
        KmlGeometry::MultiGeometry(multi) => value_from_multi(multi),
        _ => None,
    }
}

/// Homogeneous multi-geometries collapse into the matching GeoJSON
/// `Multi*` type; mixed ones become a GeometryCollection.
fn value_from_multi(multi: &MultiGeometry) -> Option<Value> {
    let values: Vec<Value> = multi
        .geometries
        .iter()
        .filter_map(value_from_geometry)
        .collect();
    if values.is_empty() {
        return None;
    }
    if values.iter().all(|v| matches!(v, Value::Point(_))) {
        let points = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Point(p) => Some(p),
                _ => None,
            })
            .collect();
        return Some(Value::MultiPoint(points));
    }
    if values.iter().all(|v| matches!(v, Value::LineString(_))) {
        let lines = values
            .into_iter()
            .filter_map(|v| match v {
                Value::LineString(l) => Some(l),
                _ => None,
            })
            .collect();
        return Some(Value::MultiLineString(lines));
    }
    if values.iter().all(|v| matches!(v, Value::Polygon(_))) {
        let polygons = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Polygon(p) => Some(p),
                _ => None,
            })
            .collect();
        return Some(Value::MultiPolygon(polygons));
    }
    Some(Value::GeometryCollection(
        values.into_iter().map(Geometry::new).collect(),
    ))
}

fn rings(polygon: &Polygon) -> Vec<Vec<Vec<f64>>> {
    let mut rings = Vec::with_capacity(1 + polygon.inner.len());
    rings.push(positions(&polygon.outer.coords));
    for hole in &polygon.inner {
        rings.push(positions(&hole.coords));
    }
    rings
}

fn positions(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords.iter().map(position).collect()
}

fn position(coord: &Coord) -> Vec<f64> {
    match coord.z {
        Some(z) => vec![coord.x, coord.y, z],
        None => vec![coord.x, coord.y],
    }
}
