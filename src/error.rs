//! Error type shared by the rendering and export pipeline.

use thiserror::Error;

/// Errors raised while rendering or exporting a QR code.
///
/// Building a payload never fails; everything here comes from the encoding
/// engine, image codecs, the platform or user-supplied options.
#[derive(Debug, Error)]
pub enum QrError {
    /// The encoding engine rejected the payload (for example it does not fit
    /// in a version 40 symbol at error-correction level H).
    #[error(transparent)]
    Encode(#[from] qrcode::types::QrError),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid color '{0}', expected #rgb, #rgba, #rrggbb or #rrggbbaa")]
    InvalidColor(String),

    #[error("invalid size {0}, must be greater than zero")]
    InvalidSize(u32),

    #[error("unknown content type '{0}'")]
    UnknownContentType(String),

    #[error("unrecognised command: {0}")]
    InvalidCommand(String),

    #[error("unknown export format '{0}'")]
    UnknownFormat(String),

    #[error("object URL '{0}' is unknown or already revoked")]
    UnknownObjectUrl(String),

    #[error("malformed data URI: {0}")]
    InvalidDataUri(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, QrError>;
