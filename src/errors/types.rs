//! Error types for the image proxy path.
//!
//! Every failure the proxy endpoint can hit maps to a fixed HTTP status.
//! Upstream failures are converted here, at the boundary, so no remote
//! dependency can terminate the process or leak a transport error to a
//! device.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

/// Failures surfaced by the image proxy endpoint.
#[derive(Error, Debug)]
pub enum ImageProxyError {
    /// The caller omitted the source image URL.
    #[error("Missing image URL")]
    MissingUrl,

    /// The caller supplied a source URL that does not parse as an absolute URL.
    #[error("Invalid image URL: {url}")]
    InvalidUrl { url: String },

    /// The image host answered with a non-success status.
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// The image host did not answer within the request time bound.
    #[error("Upstream timeout fetching {url}")]
    UpstreamTimeout { url: String },

    /// Transport-level failure reaching the image host.
    #[error("Upstream fetch failed for {url}: {message}")]
    UpstreamUnavailable { url: String, message: String },

    /// The fetched bytes could not be decoded as an image.
    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

impl ImageProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamStatus { .. } | Self::UpstreamUnavailable { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::UpstreamTimeout { .. } | Self::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short body sent to the device; the detailed reason only goes to the log.
    fn public_message(&self) -> &'static str {
        match self {
            Self::MissingUrl => "Missing image URL",
            Self::InvalidUrl { .. } => "Invalid image URL",
            Self::UpstreamStatus { .. } | Self::UpstreamUnavailable { .. } => "Image not found",
            Self::UpstreamTimeout { .. } | Self::Decode(_) => "Image processing failed",
        }
    }
}

impl IntoResponse for ImageProxyError {
    fn into_response(self) -> Response {
        warn!("Image proxy request failed: {}", self);
        (self.status_code(), self.public_message()).into_response()
    }
}
