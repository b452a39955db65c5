use axum::{
    body::Bytes,
    http::{HeaderMap, header::CONTENT_TYPE},
};
use futures_util::stream::once;
use serde::de::DeserializeOwned;

use crate::{
    error::AppError::{self, BadUpload, MalformedPayload},
    schema::Resource,
    table::MAX_ID,
};

pub const UPLOAD_FIELD: &str = "file";

pub fn get_resource(slug: &str) -> Result<Resource, AppError> {
    Resource::from_slug(slug).ok_or_else(|| AppError::UnknownResource(slug.to_string()))
}

pub fn get_payload<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| MalformedPayload(e.to_string()))
}

pub fn get_id(raw: Option<&str>) -> Result<u64, AppError> {
    let raw = raw.ok_or_else(|| MalformedPayload("id is required".to_string()))?;

    raw.trim()
        .parse()
        .ok()
        .filter(|id| (1..=MAX_ID).contains(id))
        .ok_or_else(|| MalformedPayload(format!("invalid id {raw:?}")))
}

/// CSV bytes from either a raw `text/csv` body or the `file` part of a multipart form.
pub async fn get_upload(headers: &HeaderMap, body: Bytes) -> Result<Bytes, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.contains("multipart/form-data") {
        let boundary =
            multer::parse_boundary(content_type).map_err(|e| MalformedPayload(e.to_string()))?;
        return get_upload_field(body, boundary).await;
    }

    if content_type.contains("text/csv") {
        return Ok(body);
    }

    Err(BadUpload("Upload CSV (text/csv)"))
}

async fn get_upload_field(body: Bytes, boundary: String) -> Result<Bytes, AppError> {
    let stream = once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MalformedPayload(e.to_string()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            return field.bytes().await.map_err(|e| MalformedPayload(e.to_string()));
        }
    }

    Err(BadUpload("file required"))
}
