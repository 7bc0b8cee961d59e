//! Slippy-map rendering.
//!
//! Wraps the walkers map widget: OpenStreetMap base tiles, a fixed-style
//! overlay for the loaded features, floating labels for named features
//! under the pointer, and viewport fitting to the layer's bounding box.

use eframe::egui;
use geojson::{Feature, Value};
use walkers::sources::OpenStreetMap;
use walkers::{lon_lat, HttpTiles, Map, MapMemory, Plugin, Projector, Tiles};

use crate::metrics::Bounds;
use crate::state::LoadedLayer;

pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

const DEFAULT_ZOOM: f64 = 2.0;
const MAX_FIT_ZOOM: f64 = 15.0;
// Widest zoom whose tile window still encloses a given span in degrees.
const FIT_ZOOM_LADDER: [(f64, f64); 9] = [
    (60.0, 2.0),
    (30.0, 3.0),
    (10.0, 5.0),
    (5.0, 7.0),
    (2.0, 9.0),
    (1.0, 11.0),
    (0.5, 12.0),
    (0.2, 13.0),
    (0.05, 14.0),
];

const STROKE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x33, 0x88, 0xff);
const STROKE_WIDTH: f32 = 3.0;
const POINT_RADIUS: f32 = 6.0;
const PICK_DISTANCE: f32 = 8.0;

pub struct MapPanel {
    tiles: Option<HttpTiles>,
    memory: MapMemory,
    pending_fit: Option<Bounds>,
}

impl MapPanel {
    pub fn new() -> Self {
        let mut memory = MapMemory::default();
        let _ = memory.set_zoom(DEFAULT_ZOOM);
        memory.center_at(lon_lat(0.0, 0.0));
        Self {
            tiles: None,
            memory,
            pending_fit: None,
        }
    }

    /// Recenter and rezoom onto `bounds` on the next frame.
    pub fn request_fit(&mut self, bounds: Bounds) {
        self.pending_fit = Some(bounds);
    }

    pub fn zoom(&self) -> f64 {
        self.memory.zoom()
    }

    pub fn show(&mut self, ui: &mut egui::Ui, layer: Option<&LoadedLayer>) {
        if self.tiles.is_none() {
            self.tiles = Some(HttpTiles::new(OpenStreetMap, ui.ctx().clone()));
        }

        if let Some(bounds) = self.pending_fit.take() {
            let (lon, lat) = bounds.center();
            self.memory.center_at(lon_lat(lon, lat));
            let _ = self.memory.set_zoom(fit_zoom(bounds.span_degrees()));
        }

        let center = self.memory.detached().unwrap_or_else(|| lon_lat(0.0, 0.0));
        let tiles: Option<&mut dyn Tiles> = self.tiles.as_mut().map(|t| t as &mut dyn Tiles);
        let mut map = Map::new(tiles, &mut self.memory, center);
        if let Some(layer) = layer {
            map = map.with_plugin(FeaturesPlugin {
                features: &layer.collection.features,
            });
        }
        ui.add(map);
    }
}

/// Draws the loaded features over the map tiles via the walkers plugin hook.
struct FeaturesPlugin<'a> {
    features: &'a [Feature],
}

impl Plugin for FeaturesPlugin<'_> {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _map_memory: &MapMemory,
    ) {
        draw_features(ui, projector, self.features);
    }
}

fn fit_zoom(span_degrees: f64) -> f64 {
    for (limit, zoom) in FIT_ZOOM_LADDER {
        if span_degrees > limit {
            return zoom;
        }
    }
    MAX_FIT_ZOOM
}

fn draw_features(ui: &egui::Ui, projector: &Projector, features: &[Feature]) {
    let painter = ui.painter();
    let clip = ui.clip_rect();
    let hover = ui.input(|i| i.pointer.hover_pos());
    // Closest named feature within pick distance of the pointer.
    let mut picked: Option<(f32, String)> = None;

    for feature in features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let name = feature_name(feature);
        let hit = draw_value(painter, clip, projector, &geometry.value, hover);
        if let (Some(distance), Some(name)) = (hit, name) {
            if picked.as_ref().is_none_or(|(best, _)| distance < *best) {
                picked = Some((distance, name.to_owned()));
            }
        }
    }

    if let (Some((_, name)), Some(at)) = (picked, hover) {
        draw_name_label(painter, at, &name);
    }
}

fn feature_name(feature: &Feature) -> Option<&str> {
    feature.properties.as_ref()?.get("name")?.as_str()
}

/// Paints one geometry and reports the pointer's distance to it when the
/// pointer is within pick range.
fn draw_value(
    painter: &egui::Painter,
    clip: egui::Rect,
    projector: &Projector,
    value: &Value,
    hover: Option<egui::Pos2>,
) -> Option<f32> {
    let mut hit: Option<f32> = None;
    match value {
        Value::Point(position) => {
            hit = draw_point(painter, clip, projector, position, hover);
        }
        Value::MultiPoint(points) => {
            for position in points {
                merge_hit(&mut hit, draw_point(painter, clip, projector, position, hover));
            }
        }
        Value::LineString(points) => {
            hit = draw_line(painter, projector, points, hover);
        }
        Value::MultiLineString(lines) => {
            for points in lines {
                merge_hit(&mut hit, draw_line(painter, projector, points, hover));
            }
        }
        Value::Polygon(rings) => {
            for points in rings {
                merge_hit(&mut hit, draw_line(painter, projector, points, hover));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                for points in rings {
                    merge_hit(&mut hit, draw_line(painter, projector, points, hover));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                merge_hit(
                    &mut hit,
                    draw_value(painter, clip, projector, &geometry.value, hover),
                );
            }
        }
    }
    hit
}

fn merge_hit(best: &mut Option<f32>, candidate: Option<f32>) {
    if let Some(distance) = candidate {
        if best.is_none_or(|b| distance < b) {
            *best = Some(distance);
        }
    }
}

fn draw_point(
    painter: &egui::Painter,
    clip: egui::Rect,
    projector: &Projector,
    position: &[f64],
    hover: Option<egui::Pos2>,
) -> Option<f32> {
    let pos = to_screen(projector, position)?;
    if !clip.contains(pos) {
        return None;
    }
    painter.circle_filled(pos, POINT_RADIUS, STROKE_COLOR);
    painter.circle_stroke(pos, POINT_RADIUS, egui::Stroke::new(1.5, egui::Color32::WHITE));
    let distance = (hover? - pos).length();
    (distance <= POINT_RADIUS + PICK_DISTANCE).then_some(distance)
}

fn draw_line(
    painter: &egui::Painter,
    projector: &Projector,
    positions: &[Vec<f64>],
    hover: Option<egui::Pos2>,
) -> Option<f32> {
    let points: Vec<egui::Pos2> = positions
        .iter()
        .filter_map(|p| to_screen(projector, p))
        .collect();
    let mut hit: Option<f32> = None;
    for segment in points.windows(2) {
        painter.line_segment([segment[0], segment[1]], egui::Stroke::new(STROKE_WIDTH, STROKE_COLOR));
        if let Some(at) = hover {
            let distance = point_segment_distance(at, segment[0], segment[1]);
            if distance <= PICK_DISTANCE {
                merge_hit(&mut hit, Some(distance));
            }
        }
    }
    hit
}

fn to_screen(projector: &Projector, position: &[f64]) -> Option<egui::Pos2> {
    match position {
        [lon, lat, ..] => {
            let projected = projector.project(lon_lat(*lon, *lat));
            Some(egui::pos2(projected.x, projected.y))
        }
        _ => None,
    }
}

fn point_segment_distance(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

fn draw_name_label(painter: &egui::Painter, at: egui::Pos2, name: &str) {
    let galley = painter.layout_no_wrap(
        name.to_owned(),
        egui::FontId::proportional(12.0),
        egui::Color32::WHITE,
    );
    let pos = at + egui::vec2(14.0, -14.0);
    let rect = galley.rect.translate(pos.to_vec2());
    painter.rect_filled(rect.expand(4.0), 3.0, egui::Color32::from_black_alpha(180));
    painter.galley(pos, galley, egui::Color32::WHITE);
}
