use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::AppState;
use crate::cache::{cache_key, CacheEntry};
use crate::errors::ImageProxyError;
use crate::imaging::{pixel, transform};

/// Edge length used when the device omits or garbles a dimension.
const DEFAULT_DIMENSION: u32 = 80;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    url: Option<String>,
    w: Option<String>,
    h: Option<String>,
    nocache: Option<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Serve a remote image as a packed RGB565 buffer at the requested size.
///
/// The cache is consulted first (unless `nocache=1`), so repeated requests
/// for the same source and dimensions cost no upstream fetch. Two identical
/// requests racing a cold cache may both fetch; the later insert harmlessly
/// overwrites the earlier one.
pub async fn proxy_image(
    Path(image_id): Path<String>,
    Query(query): Query<ImageQuery>,
    State(state): State<AppState>,
) -> Result<Response, ImageProxyError> {
    let width = parse_dimension(query.w.as_deref());
    let height = parse_dimension(query.h.as_deref());
    let nocache = query.nocache.as_deref() == Some("1");
    let source_url = query.url.unwrap_or_default();

    debug!(
        "Proxying image {} ({}x{}) from {}{}",
        image_id,
        width,
        height,
        source_url,
        if nocache { " [nocache]" } else { "" }
    );

    let key = cache_key(&source_url, width, height);
    if !nocache {
        if let Some(entry) = state.cache.get(&key).await {
            debug!("Cache hit: serving {} for {}", key, entry.source_url);
            return Ok(pixel_response(&entry));
        }
    }

    if source_url.is_empty() {
        return Err(ImageProxyError::MissingUrl);
    }
    let source = Url::parse(&source_url).map_err(|_| ImageProxyError::InvalidUrl {
        url: source_url.clone(),
    })?;

    let fetched = fetch_source(&state.http, source).await?;
    debug!("Fetched {} bytes from {}", fetched.len(), source_url);

    let raster = transform::transform(&fetched, width, height)?;
    let buffer = Bytes::from(pixel::encode_rgb565(&raster, width, height));

    let entry = CacheEntry::new(buffer, width, height, source_url);
    if !nocache {
        state.cache.put(key, entry.clone()).await;
    }

    Ok(pixel_response(&entry))
}

/// Download the source image, bounded by the client's request timeout.
async fn fetch_source(client: &reqwest::Client, url: Url) -> Result<Bytes, ImageProxyError> {
    let to_error = |e: reqwest::Error, url: &Url| {
        if e.is_timeout() {
            ImageProxyError::UpstreamTimeout {
                url: url.to_string(),
            }
        } else {
            ImageProxyError::UpstreamUnavailable {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| to_error(e, &url))?;

    if !response.status().is_success() {
        return Err(ImageProxyError::UpstreamStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    response.bytes().await.map_err(|e| to_error(e, &url))
}

fn pixel_response(entry: &CacheEntry) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("X-Image-Format", "RGB565")
        .header("X-Image-Width", entry.width.to_string())
        .header("X-Image-Height", entry.height.to_string())
        .body(Body::from(entry.buffer.clone()))
        .unwrap()
}

/// A dimension parameter: positive integer, anything else falls back to the
/// device default.
fn parse_dimension(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_DIMENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_defaults_when_absent_or_invalid() {
        assert_eq!(parse_dimension(None), 80);
        assert_eq!(parse_dimension(Some("")), 80);
        assert_eq!(parse_dimension(Some("abc")), 80);
        assert_eq!(parse_dimension(Some("-40")), 80);
        assert_eq!(parse_dimension(Some("0")), 80);
        assert_eq!(parse_dimension(Some("40")), 40);
        assert_eq!(parse_dimension(Some(" 64 ")), 64);
    }
}
