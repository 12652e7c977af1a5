use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use serde::{Deserialize, Serialize};

use crate::api::student::{fetch_student, StudentEnvelope};
use crate::api::{coerce_id, parse_id, JsonBody};
use crate::storage::{allowed_extension, content_type_for, delete_by_url};
use crate::{bails, breaks, proceeds, AppState, Error, Payload};

#[derive(Debug, Default)]
struct PhotoForm {
    student_id: Option<String>,
    old_url: Option<String>,
    img: Option<UploadedFile>,
}

#[derive(Debug)]
struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> Result<PhotoForm, Error> {
    let mut multipart = multipart?;
    let mut form = PhotoForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "student_id" => form.student_id = Some(field.text().await?),
            "old_url" => form.old_url = Some(field.text().await?),
            "img" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.img = Some(UploadedFile { file_name, bytes });
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn ensure_student(state: &AppState, id: i64) -> Result<(), Error> {
    if !state.students.exists(id).await? {
        return Err(Error::custom("Invalid student ID"));
    }
    Ok(())
}

async fn store_photo(state: &AppState, form: PhotoForm) -> Payload<StudentEnvelope> {
    let raw_id = form
        .student_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let student_id = match raw_id {
        Some(raw) => parse_id(raw)?,
        None => return breaks(Error::empty("`student_id` and `img` are required")),
    };
    ensure_student(state, student_id).await?;

    let img = match form.img {
        Some(img) if !img.file_name.is_empty() => img,
        _ => return breaks(Error::empty("`student_id` and `img` are required")),
    };

    let ext = match allowed_extension(&img.file_name) {
        Some(ext) => ext,
        None => return bails("File extension should be .png or .jpg or .jpeg"),
    };

    let key = format!("{}.{}", student_id, ext);
    if let Err(err) = state
        .photos
        .upload(&key, img.bytes.to_vec(), content_type_for(ext))
        .await
    {
        log::error!("Photo upload fail for student id {}: {}", student_id, err);
        return bails("Student photo upload fail");
    }

    let url = state.photos.url_for(&key);
    if !state.students.update_photo(student_id, &url).await? {
        log::error!("Can't update student photo url for student id: {}", student_id);
        return bails("Student photo url update fail");
    }

    log::info!("Uploaded photo {} for student id {}", key, student_id);
    fetch_student(state, student_id).await
}

pub async fn upload_photo(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Payload<StudentEnvelope> {
    let form = read_form(multipart).await?;
    store_photo(&state, form).await
}

/// Deletes the object at `old_url`, then stores the new photo.
pub async fn replace_photo(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Payload<StudentEnvelope> {
    let form = read_form(multipart).await?;
    let old_url = match form.old_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            log::error!("Old url for student required");
            return breaks(Error::empty("`old_url` is required"));
        }
    };

    if let Err(err) = delete_by_url(state.photos.as_ref(), &old_url).await {
        log::error!("Can't delete file before update: {}", err);
        return bails("Update file error");
    }
    store_photo(&state, form).await
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletePhoto {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub student_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoDeleted {
    pub status: bool,
}

pub async fn delete_photo(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DeletePhoto>,
) -> Payload<PhotoDeleted> {
    let (url, raw_id) = match (body.url.filter(|u| !u.trim().is_empty()), body.student_id) {
        (Some(url), Some(raw_id)) => (url, raw_id),
        _ => {
            log::error!("Empty url or empty student id");
            return breaks(Error::empty("`url` and `student_id` are required"));
        }
    };
    let student_id = coerce_id(&raw_id)?;
    ensure_student(&state, student_id).await?;

    let deleted = match delete_by_url(state.photos.as_ref(), &url).await {
        Ok(()) => state.students.update_photo(student_id, "").await?,
        Err(err) => {
            log::error!("Delete file for URL {} fail: {}", url, err);
            false
        }
    };
    if !deleted {
        return bails("Delete file fail");
    }

    log::info!("Delete file for URL {} success", url);
    proceeds(PhotoDeleted { status: true })
}
