use std::path::PathBuf;

/// Everything that can go wrong while configuring an [`Uploader`](crate::uploader::Uploader)
/// or processing a batch.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File type is not allowed for upload")]
    NotAllowExt,
    #[error("File size exceeds the configured maximum or is zero")]
    NotAllowSize,
    #[error("Unsupported watermark type '{0}'")]
    UnsupportedWatermarkType(String),
    #[error("Unknown file size")]
    UnknownFileSize,
    /// Reserved for range/offset validation.
    #[error("Invalid pos value")]
    InvalidPos,
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Root directory must not be empty")]
    EmptyRootDir,
    #[error("Allowed extensions must not be empty strings")]
    EmptyExtension,
    #[error("Invalid name pattern '{0}'")]
    InvalidNamePattern(String),
    #[error("Failed to open uploaded file '{filename}': {source}")]
    OpenFailed {
        filename: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
