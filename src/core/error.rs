use poem::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("upstream responded with {0}")]
    Status(u16),
    #[error("upstream body read failed: {0}")]
    Body(#[source] reqwest::Error),
    #[error("upstream body exceeded the maximum of {0} bytes")]
    TooLarge(u64),
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("reading image failed: {0}")]
    Io(#[source] std::io::Error),
    #[error("image format is unknown")]
    UnknownFormat,
    #[error("decoding image failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("resizing image failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
    #[error("output of {0}x{1} exceeds the size limit")]
    TooLarge(u64, u64),
    #[error("resized buffer does not match its dimensions")]
    Buffer,
    #[error("encoding jpeg failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("transform task did not complete")]
    Join,
}

/// Everything that can go wrong between routing and the response body.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl ProxyError {
    /// Clients get the same answer for every failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Fetch(_) | ProxyError::Transform(_) => StatusCode::NOT_FOUND,
        }
    }
}
