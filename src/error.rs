use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("failed to read file: {0}")]
    Read(String),
    #[error("failed to parse KML: {0}")]
    Parse(String),
}
