//! Application shell and eframe integration.
//!
//! Defines the App struct and the main update loop that polls in-flight
//! uploads, handles drag-and-drop, and lays out the control bar, the
//! statistics panel, the map, and the status bar.

use eframe::egui;

use crate::convert;
use crate::error::UploadError;
use crate::map::{MapPanel, ATTRIBUTION};
use crate::metrics::LayerMetrics;
use crate::state::{LoadedLayer, ViewMode, ViewState};
use crate::upload::{self, PendingUpload, RawUpload};

pub struct App {
    state: ViewState,
    map: MapPanel,
    pending: Vec<PendingUpload>,
}

impl App {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            state: ViewState::new(),
            map: MapPanel::new(),
            pending: Vec::new(),
        }
    }

    fn poll_uploads(&mut self) {
        let mut finished: Vec<(u64, Option<Result<RawUpload, UploadError>>)> = Vec::new();
        self.pending.retain(|upload| match upload.poll() {
            Some(outcome) => {
                finished.push((upload.seq(), outcome));
                false
            }
            None => true,
        });

        for (seq, outcome) in finished {
            let Some(read) = outcome else {
                self.state.cancel_upload(seq);
                continue;
            };
            // Conversion and measurement run synchronously here; a huge
            // file can stall a frame.
            let result = read.and_then(|raw| {
                let collection = convert::features_from_kml(&raw.text)?;
                let metrics = LayerMetrics::measure(&collection);
                Ok(LoadedLayer {
                    file_name: raw.file_name,
                    collection,
                    metrics,
                })
            });
            if let Err(err) = &result {
                log::warn!("upload {seq} failed: {err}");
            }
            if self.state.finish_upload(seq, result) {
                let layer = self.state.layer();
                if let Some(layer) = layer {
                    log::info!(
                        "loaded {} features from {}",
                        layer.collection.features.len(),
                        layer.file_name
                    );
                }
                // An empty collection keeps the previous viewport.
                if let Some(bounds) = layer.and_then(|l| l.metrics.bounds) {
                    self.map.request_fit(bounds);
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // Only the first file of a drop is taken; an empty drop is ignored.
        if let Some(file) = dropped.into_iter().next() {
            let seq = self.state.begin_upload();
            self.pending.push(upload::read_dropped(seq, file));
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open KML…").clicked() {
                let seq = self.state.begin_upload();
                self.pending.push(upload::pick_file(seq));
            }
            if let Some(layer) = self.state.layer() {
                ui.separator();
                ui.label(&layer.file_name);
            }
            if self.state.is_loading() {
                ui.spinner();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let has_layer = self.state.has_layer();
                if ui.add_enabled(has_layer, egui::Button::new("Clear")).clicked() {
                    self.state.clear();
                }
                if ui.add_enabled(has_layer, egui::Button::new("Details")).clicked() {
                    self.state.set_mode(ViewMode::Details);
                }
                if ui.add_enabled(has_layer, egui::Button::new("Summary")).clicked() {
                    self.state.set_mode(ViewMode::Summary);
                }
            });
        });

        if let Some(notice) = self.state.notice().map(str::to_owned) {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::RED, notice);
                if ui.small_button("x").clicked() {
                    self.state.dismiss_notice();
                }
            });
        }
    }

    fn show_statistics(&self, ui: &mut egui::Ui) {
        match self.state.mode() {
            ViewMode::None => {}
            ViewMode::Summary => {
                ui.heading("Summary");
                ui.separator();
                match self.state.layer() {
                    Some(layer) if !layer.metrics.element_counts.is_empty() => {
                        egui::Grid::new("element_counts").striped(true).show(ui, |ui| {
                            ui.strong("Type");
                            ui.strong("Count");
                            ui.end_row();
                            for (label, count) in &layer.metrics.element_counts {
                                ui.label(label);
                                ui.label(count.to_string());
                                ui.end_row();
                            }
                        });
                    }
                    _ => {
                        ui.label("No elements found");
                    }
                }
            }
            ViewMode::Details => {
                ui.heading("Line lengths");
                ui.separator();
                match self.state.layer() {
                    Some(layer) if !layer.metrics.line_lengths_km.is_empty() => {
                        egui::Grid::new("line_lengths").striped(true).show(ui, |ui| {
                            ui.strong("Type");
                            ui.strong("Length");
                            ui.end_row();
                            for (label, km) in &layer.metrics.line_lengths_km {
                                ui.label(label);
                                ui.label(format!("{km:.2} km"));
                                ui.end_row();
                            }
                        });
                    }
                    _ => {
                        ui.label("No line elements found");
                    }
                }
            }
        }
    }

    fn show_status(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(layer) = self.state.layer() {
                ui.label(format!("{} features", layer.collection.features.len()));
                ui.separator();
            }
            ui.label(format!("zoom {:.1}", self.map.zoom()));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(ATTRIBUTION);
            });
        });
    }

    fn show_drop_target(&self, ctx: &egui::Context) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        if !hovering {
            return;
        }
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("file_drop_overlay"),
        ));
        let rect = ctx.screen_rect();
        painter.rect_filled(rect, 0.0, egui::Color32::from_black_alpha(120));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drop KML file",
            egui::FontId::proportional(24.0),
            egui::Color32::WHITE,
        );
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_uploads();
        self.handle_dropped_files(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.show_controls(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.show_status(ui));

        if self.state.mode() != ViewMode::None {
            egui::SidePanel::right("statistics")
                .default_width(240.0)
                .show(ctx, |ui| self.show_statistics(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.map.show(ui, self.state.layer());
        });

        self.show_drop_target(ctx);

        if !self.pending.is_empty() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
