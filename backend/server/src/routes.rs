use std::{collections::HashMap, sync::Arc};

use axum::{
    Form, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    error::{AppError, StoreError},
    import::Importer,
    schema::{Fields, ID, Record, Resource},
    session::{expired_cookie, password_matches, session_cookie, set_cookie_header},
    state::AppState,
    utils::{get_id, get_payload, get_resource, get_upload},
    validation::{FieldErrors, normalize, validate},
    youtube::{thumbnail_url, video_id},
};

pub const WEBSITE_LEAD: &str = "Website Inquiry";

type AppResult<T> = Result<T, AppError>;

#[derive(Deserialize)]
pub struct CreatePayload {
    #[serde(default, rename = "id")]
    _id: Option<Value>,
    #[serde(flatten)]
    fields: Fields,
}

#[derive(Deserialize)]
pub struct UpdatePayload {
    id: u64,
    #[serde(flatten)]
    fields: Fields,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCard {
    #[serde(flatten)]
    record: Record,
    video_id: Option<String>,
    thumbnail: String,
}

impl From<Record> for VideoCard {
    fn from(record: Record) -> Self {
        let video_id = record.get("youtubeLink").and_then(video_id).map(str::to_string);
        let thumbnail = thumbnail_url(video_id.as_deref());

        Self {
            record,
            video_id,
            thumbnail,
        }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Read-only lists behind the public pages.
pub async fn public_list_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Json<Value>> {
    let resource = get_resource(&slug).and_then(|resource| {
        resource
            .is_public()
            .then_some(resource)
            .ok_or(AppError::UnknownResource(slug.clone()))
    })?;

    let records = state.gateway.list(resource).await?;
    let body = if resource.has_video() {
        json!(records.into_iter().map(VideoCard::from).collect::<Vec<_>>())
    } else {
        json!(records)
    };

    Ok(Json(body))
}

#[derive(Deserialize)]
pub struct ContactForm {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    course: Option<String>,
    message: Option<String>,
}

pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ContactForm>,
) -> AppResult<impl IntoResponse> {
    let mut fields = Fields::new();
    fields.insert("lead_type".into(), Some(WEBSITE_LEAD.into()));
    fields.insert("name".into(), normalize(form.name.as_deref()));
    fields.insert("email".into(), normalize(form.email.as_deref()));
    fields.insert("phone".into(), normalize(form.phone.as_deref()));
    fields.insert("course".into(), normalize(form.course.as_deref()));
    fields.insert("message".into(), normalize(form.message.as_deref()));

    let errors: FieldErrors = validate(Resource::Inquiry.fields(), &fields);
    if !errors.is_empty() {
        let message = AppError::Validation(FieldErrors::new()).to_string();
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "ok": false, "message": message, "errors": errors })),
        ));
    }

    // The contact page renders `{ok, message}`, so store failures keep that shape.
    let record = match state.gateway.create(Resource::Inquiry, fields).await {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to save website inquiry: {e}");
            let status = match e {
                StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return Ok((status, Json(json!({ "ok": false, "message": e.to_string() }))));
        }
    };
    info!("New website inquiry {}", record.id);

    Ok((
        StatusCode::OK,
        Json(json!({ "ok": true, "message": "Thank you! Your inquiry has been submitted." })),
    ))
}

#[derive(Deserialize)]
pub struct Login {
    password: String,
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let login: Login = get_payload(&body)?;

    if !password_matches(&state.config.admin_password, &login.password) {
        return Err(AppError::InvalidPassword);
    }

    let token = state.sessions.issue(Utc::now().timestamp())?;
    let headers = set_cookie_header(&session_cookie(token))?;
    info!("Admin signed in");

    Ok((headers, Json(json!({ "ok": true }))))
}

pub async fn logout_handler() -> AppResult<impl IntoResponse> {
    let headers = set_cookie_header(&expired_cookie())?;

    Ok((headers, Json(json!({ "ok": true }))))
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Json<Vec<Record>>> {
    let resource = get_resource(&slug)?;

    Ok(Json(state.gateway.list(resource).await?))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    body: Bytes,
) -> AppResult<Json<Record>> {
    let resource = get_resource(&slug)?;
    let payload: CreatePayload = get_payload(&body)?;

    let errors = validate(resource.fields(), &payload.fields);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(Json(state.gateway.create(resource, payload.fields).await?))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    body: Bytes,
) -> AppResult<Json<Record>> {
    let resource = get_resource(&slug)?;
    let payload: UpdatePayload = get_payload(&body)?;

    // Partial updates are allowed, only the supplied required columns must be non-blank.
    let errors: FieldErrors = validate(resource.fields(), &payload.fields)
        .into_iter()
        .filter(|(name, _)| payload.fields.contains_key(name))
        .collect();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(Json(
        state
            .gateway
            .update(resource, payload.id, payload.fields)
            .await?,
    ))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Value>> {
    let resource = get_resource(&slug)?;
    let id = get_id(query.get(ID).map(String::as_str))?;

    state.gateway.delete(resource, id).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn import_info_handler(Path(slug): Path<String>) -> AppResult<Json<Value>> {
    get_resource(&slug)?;

    Ok(Json(json!({
        "status": "ok",
        "expects": "POST multipart/form-data with field \"file\"",
    })))
}

pub async fn import_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let resource = get_resource(&slug)?;
    let upload = get_upload(&headers, body).await?;

    let store = state.store();
    let inserted = Importer::new(store.as_ref())
        .import(resource, &upload)
        .await?;

    Ok(Json(json!({ "inserted": inserted })))
}
