//! Feature-collection statistics.
//!
//! One pass over a GeoJSON feature collection tallies geometry-type
//! counts, accumulates great-circle lengths for line-like features, and
//! derives the geographic bounding box used for viewport fitting.

use std::collections::BTreeMap;

use geo::{Haversine, Length};
use geojson::{FeatureCollection, Value};

const METERS_PER_KM: f64 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    fn new(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            max_lon: lon,
            min_lat: lat,
            max_lat: lat,
        }
    }

    fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Larger of the longitude and latitude spans, in degrees.
    pub fn span_degrees(&self) -> f64 {
        (self.max_lon - self.min_lon).max(self.max_lat - self.min_lat)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerMetrics {
    pub element_counts: BTreeMap<String, usize>,
    pub line_lengths_km: BTreeMap<String, f64>,
    pub bounds: Option<Bounds>,
}

impl LayerMetrics {
    pub fn measure(collection: &FeatureCollection) -> Self {
        let mut element_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut line_lengths_km: BTreeMap<String, f64> = BTreeMap::new();
        let mut bounds: Option<Bounds> = None;

        for feature in &collection.features {
            let Some(geometry) = feature.geometry.as_ref() else {
                continue;
            };
            let label = type_label(&geometry.value);
            *element_counts.entry(label.to_owned()).or_insert(0) += 1;

            match line_length_km(&geometry.value) {
                Ok(Some(km)) => {
                    *line_lengths_km.entry(label.to_owned()).or_insert(0.0) += km;
                }
                Ok(None) => {}
                // One unmeasurable feature must not abort the pass.
                Err(err) => log::warn!("skipping length of {label} feature: {err}"),
            }

            fold_positions(&geometry.value, &mut |lon, lat| match &mut bounds {
                Some(b) => b.extend(lon, lat),
                None => bounds = Some(Bounds::new(lon, lat)),
            });
        }

        Self {
            element_counts,
            line_lengths_km,
            bounds,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.element_counts.values().sum()
    }
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Haversine length in kilometers for line-like geometries, `None` for
/// everything else.
fn line_length_km(value: &Value) -> Result<Option<f64>, String> {
    let meters = match value {
        Value::LineString(coords) => Haversine.length(&line_string(coords)?),
        Value::MultiLineString(lines) => {
            let mut total = 0.0;
            for coords in lines {
                total += Haversine.length(&line_string(coords)?);
            }
            total
        }
        _ => return Ok(None),
    };
    Ok(Some(meters / METERS_PER_KM))
}

fn line_string(coords: &[Vec<f64>]) -> Result<geo_types::LineString, String> {
    let mut points = Vec::with_capacity(coords.len());
    for position in coords {
        match position.as_slice() {
            [lon, lat, ..] => points.push((*lon, *lat)),
            _ => return Err(format!("position with {} ordinate(s)", position.len())),
        }
    }
    Ok(geo_types::LineString::from(points))
}

fn fold_positions(value: &Value, visit: &mut impl FnMut(f64, f64)) {
    match value {
        Value::Point(p) => visit_position(p, visit),
        Value::MultiPoint(points) | Value::LineString(points) => {
            for p in points {
                visit_position(p, visit);
            }
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            for points in lines {
                for p in points {
                    visit_position(p, visit);
                }
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                for points in rings {
                    for p in points {
                        visit_position(p, visit);
                    }
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                fold_positions(&geometry.value, visit);
            }
        }
    }
}

fn visit_position(position: &[f64], visit: &mut impl FnMut(f64, f64)) {
    if let [lon, lat, ..] = position {
        visit(*lon, *lat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geojson::{Feature, Geometry};

    // Mean earth radius used by geo's haversine implementation.
    const EARTH_RADIUS_M: f64 = 6_371_008.8;

    fn feature(value: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn meridian_line(lon: f64, lat_from: f64, lat_to: f64) -> Value {
        Value::LineString(vec![vec![lon, lat_from], vec![lon, lat_to]])
    }

    fn meridian_km(lat_from: f64, lat_to: f64) -> f64 {
        EARTH_RADIUS_M * (lat_to - lat_from).abs().to_radians() / 1000.0
    }

    #[test]
    fn counts_sum_to_feature_count() {
        let metrics = LayerMetrics::measure(&collection(vec![
            feature(Value::Point(vec![0.0, 0.0])),
            feature(Value::Point(vec![1.0, 1.0])),
            feature(meridian_line(0.0, 0.0, 1.0)),
            feature(Value::Polygon(vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]])),
        ]));
        assert_eq!(metrics.feature_count(), 4);
        assert_eq!(metrics.element_counts["Point"], 2);
        assert_eq!(metrics.element_counts["LineString"], 1);
        assert_eq!(metrics.element_counts["Polygon"], 1);
    }

    #[test]
    fn line_lengths_match_known_distances() {
        // Two meridian segments of roughly 5 km and 10 km.
        let five_km = 5.0 * 1000.0 / EARTH_RADIUS_M;
        let ten_km = 10.0 * 1000.0 / EARTH_RADIUS_M;
        let metrics = LayerMetrics::measure(&collection(vec![
            feature(Value::Point(vec![0.0, 0.0])),
            feature(Value::Point(vec![0.0, 0.1])),
            feature(Value::Point(vec![0.0, 0.2])),
            feature(meridian_line(0.0, 0.0, five_km.to_degrees())),
            feature(meridian_line(1.0, 0.0, ten_km.to_degrees())),
        ]));
        assert_eq!(metrics.element_counts["Point"], 3);
        assert_eq!(metrics.element_counts["LineString"], 2);
        assert_eq!(metrics.line_lengths_km.len(), 1);
        assert_relative_eq!(metrics.line_lengths_km["LineString"], 15.0, max_relative = 1e-3);
    }

    #[test]
    fn multi_line_string_length_sums_parts() {
        let value = Value::MultiLineString(vec![
            vec![vec![0.0, 0.0], vec![0.0, 0.5]],
            vec![vec![0.0, 0.5], vec![0.0, 1.0]],
        ]);
        let metrics = LayerMetrics::measure(&collection(vec![feature(value)]));
        assert_relative_eq!(
            metrics.line_lengths_km["MultiLineString"],
            meridian_km(0.0, 1.0),
            max_relative = 1e-6
        );
    }

    #[test]
    fn line_lengths_only_hold_line_like_types() {
        let metrics = LayerMetrics::measure(&collection(vec![
            feature(Value::Point(vec![0.0, 0.0])),
            feature(Value::Polygon(vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.0, 0.0],
            ]])),
            feature(meridian_line(0.0, 0.0, 1.0)),
        ]));
        assert_eq!(
            metrics.line_lengths_km.keys().collect::<Vec<_>>(),
            ["LineString"]
        );
        assert!(metrics.line_lengths_km.values().all(|&km| km >= 0.0));
    }

    #[test]
    fn bad_position_is_skipped_but_still_counted() {
        let metrics = LayerMetrics::measure(&collection(vec![
            feature(Value::LineString(vec![vec![0.0], vec![0.0, 1.0]])),
            feature(meridian_line(0.0, 0.0, 1.0)),
        ]));
        assert_eq!(metrics.element_counts["LineString"], 2);
        assert_relative_eq!(
            metrics.line_lengths_km["LineString"],
            meridian_km(0.0, 1.0),
            max_relative = 1e-6
        );
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        let metrics = LayerMetrics::measure(&collection(Vec::new()));
        assert!(metrics.element_counts.is_empty());
        assert!(metrics.line_lengths_km.is_empty());
        assert_eq!(metrics.bounds, None);
    }

    #[test]
    fn bounds_enclose_every_coordinate() {
        let nested = Value::GeometryCollection(vec![
            Geometry::new(Value::Point(vec![-10.0, -5.0])),
            Geometry::new(meridian_line(20.0, 0.0, 15.0)),
        ]);
        let metrics = LayerMetrics::measure(&collection(vec![
            feature(Value::Point(vec![3.0, 4.0])),
            feature(nested),
        ]));
        let bounds = metrics.bounds.unwrap();
        assert_eq!(bounds.min_lon, -10.0);
        assert_eq!(bounds.max_lon, 20.0);
        assert_eq!(bounds.min_lat, -5.0);
        assert_eq!(bounds.max_lat, 15.0);
        assert_eq!(bounds.center(), (5.0, 5.0));
        assert_eq!(bounds.span_degrees(), 30.0);
    }

    #[test]
    fn measurement_is_deterministic() {
        let features = vec![
            feature(meridian_line(0.0, 0.0, 1.0)),
            feature(Value::Point(vec![0.0, 0.0])),
        ];
        let a = LayerMetrics::measure(&collection(features.clone()));
        let b = LayerMetrics::measure(&collection(features));
        assert_eq!(a, b);
    }
}
