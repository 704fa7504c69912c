//! Request handlers for the background removal endpoints

use super::error::ApiError;
use super::AppState;
use crate::error::{RemovalError, Result};
use crate::processing::{self, BackgroundColor, OutputFormat};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// JSON body for `/api/remove-bg-from-url`
#[derive(Debug, Deserialize)]
pub struct ImageUrlRequest {
    pub image_url: String,
    /// `[R,G,B]` or `[R,G,B,A]`; presence triggers compositing
    #[serde(default)]
    pub bgcolor: Option<Vec<i64>>,
}

/// JSON body for `/api/remove-bg-base64`
#[derive(Debug, Deserialize)]
pub struct ImageBase64Request {
    pub image_base64: String,
    #[serde(default)]
    pub bgcolor: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    service: &'static str,
    status: &'static str,
    model: String,
    version: &'static str,
    started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    status: &'static str,
    model: String,
    model_loaded: bool,
}

/// `GET /` — service info
pub async fn root(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Background Removal API",
        status: "healthy",
        model: state.config.model.info.description.clone(),
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
    })
}

/// `GET /health` — always 200, reports whether the model has loaded yet
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        model: state.config.model.info.description.clone(),
        model_loaded: state.session.is_loaded(),
    })
}

/// `POST /api/remove-bg` — multipart upload, returns a transparent PNG
pub async fn remove_bg(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let limit = state.config.max_upload_bytes;
    let mut file_name: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| RemovalError::decode(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        file_name = field.file_name().map(ToString::to_string);

        // Stream the part so an oversize upload is rejected without
        // buffering the whole body first.
        let mut buf = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| RemovalError::decode(format!("Failed to read upload: {e}")))?
        {
            if buf.len() + chunk.len() > limit {
                return Err(RemovalError::too_large(buf.len() + chunk.len(), limit).into());
            }
            buf.extend_from_slice(&chunk);
        }
        data = Some(buf);
        break;
    }

    let data = data.ok_or_else(|| RemovalError::decode("Missing 'file' field in upload"))?;
    let file_name = file_name.unwrap_or_else(|| "image".to_string());
    info!(file = %file_name, bytes = data.len(), "Processing uploaded image");

    let (bytes, format) = process_image(&state, &data, None).await?;
    Ok(image_response(bytes, format, Some(&file_name)))
}

/// `POST /api/remove-bg-from-url` — fetch a remote image, then remove its background
pub async fn remove_bg_from_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageUrlRequest>,
) -> std::result::Result<Response, ApiError> {
    info!(url = %request.image_url, "Fetching image from URL");
    let data = fetch_image(&state, &request.image_url).await?;
    let (bytes, format) = process_image(&state, &data, request.bgcolor.as_deref()).await?;
    Ok(image_response(bytes, format, None))
}

/// `POST /api/remove-bg-base64` — base64 payload in, image bytes out
pub async fn remove_bg_base64(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageBase64Request>,
) -> std::result::Result<Response, ApiError> {
    info!(
        payload_len = request.image_base64.len(),
        "Processing base64 image"
    );
    let data = processing::decode_base64_payload(&request.image_base64)?;
    if data.len() > state.config.max_upload_bytes {
        return Err(RemovalError::too_large(data.len(), state.config.max_upload_bytes).into());
    }
    let (bytes, format) = process_image(&state, &data, request.bgcolor.as_deref()).await?;
    Ok(image_response(bytes, format, None))
}

/// Fetch a remote image with the configured timeout and size cap
async fn fetch_image(state: &AppState, url: &str) -> Result<Vec<u8>> {
    let response = state
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| RemovalError::upstream_fetch(format!("GET {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RemovalError::upstream_fetch(format!(
            "GET {url}: HTTP {status}"
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| RemovalError::upstream_fetch(format!("GET {url}: {e}")))?;
    if body.len() > state.config.max_upload_bytes {
        return Err(RemovalError::too_large(
            body.len(),
            state.config.max_upload_bytes,
        ));
    }
    Ok(body.to_vec())
}

/// Decode, run the model, composite if asked, and encode
async fn process_image(
    state: &AppState,
    data: &[u8],
    bgcolor: Option<&[i64]>,
) -> Result<(Vec<u8>, OutputFormat)> {
    let image = processing::decode_image(data)?;
    let cutout = state.session.remove_background(image).await?;
    processing::finalize_cutout(
        cutout,
        BackgroundColor::from_request(bgcolor),
        state.config.jpeg_quality,
    )
}

/// Build the image response with content type and optional disposition header
fn image_response(bytes: Vec<u8>, format: OutputFormat, original_name: Option<&str>) -> Response {
    let mut response = (StatusCode::OK, bytes).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    if let Some(name) = original_name {
        let disposition = format!("inline; filename=\"processed_{name}\"");
        response.headers_mut().insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::try_from(disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("inline")),
        );
    }
    response
}
