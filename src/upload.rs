//! Asynchronous file acquisition.
//!
//! The native file picker and dropped-file reads both resolve on short
//! background threads via poll-promise; the app polls pending uploads
//! once per frame. A resolved `None` means the dialog was dismissed.

use std::fs;
use std::path::PathBuf;

use eframe::egui;
use poll_promise::Promise;

use crate::error::UploadError;

type Outcome = Option<Result<RawUpload, UploadError>>;

#[derive(Clone, Debug)]
pub struct RawUpload {
    pub file_name: String,
    pub text: String,
}

pub struct PendingUpload {
    seq: u64,
    promise: Promise<Outcome>,
}

impl PendingUpload {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn poll(&self) -> Option<Outcome> {
        self.promise.ready().cloned()
    }
}

pub fn pick_file(seq: u64) -> PendingUpload {
    let promise = Promise::spawn_thread("kml_picker", move || {
        let path = rfd::FileDialog::new()
            .add_filter("KML", &["kml"])
            .pick_file()?;
        Some(read_path(path))
    });
    PendingUpload { seq, promise }
}

pub fn read_dropped(seq: u64, file: egui::DroppedFile) -> PendingUpload {
    let promise = Promise::spawn_thread("kml_drop", move || Some(read_dropped_file(&file)));
    PendingUpload { seq, promise }
}

fn read_dropped_file(file: &egui::DroppedFile) -> Result<RawUpload, UploadError> {
    if let Some(path) = &file.path {
        return read_path(path.clone());
    }
    // Some platforms hand over the contents instead of a path.
    if let Some(bytes) = &file.bytes {
        return Ok(RawUpload {
            file_name: file.name.clone(),
            text: decode_text(bytes)?,
        });
    }
    Err(UploadError::Read(
        "dropped file carries no path or contents".to_owned(),
    ))
}

fn read_path(path: PathBuf) -> Result<RawUpload, UploadError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let text = fs::read_to_string(&path).map_err(|e| UploadError::Read(e.to_string()))?;
    Ok(RawUpload { file_name, text })
}

fn decode_text(bytes: &[u8]) -> Result<String, UploadError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| UploadError::Read(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn wait(upload: &PendingUpload) -> Outcome {
        for _ in 0..200 {
            if let Some(outcome) = upload.poll() {
                return outcome;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("upload did not resolve");
    }

    #[test]
    fn decode_text_rejects_invalid_utf8() {
        assert!(decode_text(b"<kml/>").is_ok());
        assert!(matches!(
            decode_text(&[0xff, 0xfe, 0x00]),
            Err(UploadError::Read(_))
        ));
    }

    #[test]
    fn dropped_bytes_are_read() {
        let file = egui::DroppedFile {
            name: "inline.kml".to_owned(),
            bytes: Some(std::sync::Arc::from(&b"<kml/>"[..])),
            ..Default::default()
        };
        let upload = read_dropped(7, file);
        assert_eq!(upload.seq(), 7);
        let raw = wait(&upload).unwrap().unwrap();
        assert_eq!(raw.file_name, "inline.kml");
        assert_eq!(raw.text, "<kml/>");
    }

    #[test]
    fn dropped_path_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<kml/>").unwrap();
        let dropped = egui::DroppedFile {
            path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let raw = wait(&read_dropped(1, dropped)).unwrap().unwrap();
        assert_eq!(raw.text, "<kml/>");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dropped = egui::DroppedFile {
            path: Some(PathBuf::from("/nonexistent/upload.kml")),
            ..Default::default()
        };
        let outcome = wait(&read_dropped(1, dropped)).unwrap();
        assert!(matches!(outcome, Err(UploadError::Read(_))));
    }

    #[test]
    fn empty_drop_payload_is_a_read_error() {
        let outcome = wait(&read_dropped(1, egui::DroppedFile::default())).unwrap();
        assert!(matches!(outcome, Err(UploadError::Read(_))));
    }
}
