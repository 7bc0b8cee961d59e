//! UI state container.
//!
//! Owns the loaded layer, its derived statistics, the active panel mode,
//! and upload bookkeeping. All mutations go through the action methods
//! below; rendering only reads. Uploads are tagged with sequence numbers
//! so a stale read that finishes late can never overwrite a newer one.

use geojson::FeatureCollection;

use crate::error::UploadError;
use crate::metrics::LayerMetrics;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    None,
    Summary,
    Details,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedLayer {
    pub file_name: String,
    pub collection: FeatureCollection,
    pub metrics: LayerMetrics,
}

#[derive(Default)]
pub struct ViewState {
    layer: Option<LoadedLayer>,
    mode: ViewMode,
    loading: bool,
    notice: Option<String>,
    latest_seq: u64,
    applied_seq: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an upload and hands out its sequence number.
    pub fn begin_upload(&mut self) -> u64 {
        self.latest_seq += 1;
        self.loading = true;
        self.latest_seq
    }

    /// A dialog was dismissed without picking a file.
    pub fn cancel_upload(&mut self, seq: u64) {
        if seq == self.latest_seq {
            self.loading = false;
        }
    }

    /// Applies an upload outcome. Outcomes older than one already applied
    /// are discarded. Returns true when a new layer was installed.
    pub fn finish_upload(&mut self, seq: u64, result: Result<LoadedLayer, UploadError>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        if seq == self.latest_seq {
            self.loading = false;
        }
        match result {
            Ok(layer) => {
                self.notice = None;
                self.layer = Some(layer);
                true
            }
            Err(err) => {
                self.notice = Some(err.to_string());
                false
            }
        }
    }

    /// No-op while nothing is loaded; the panel buttons are disabled then.
    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.layer.is_some() {
            self.mode = mode;
        }
    }

    pub fn clear(&mut self) {
        if self.layer.is_none() {
            return;
        }
        self.layer = None;
        self.mode = ViewMode::None;
        self.notice = None;
    }

    pub fn layer(&self) -> Option<&LoadedLayer> {
        self.layer.as_ref()
    }

    pub fn has_layer(&self) -> bool {
        self.layer.is_some()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
