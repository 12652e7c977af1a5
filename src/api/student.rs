use axum::extract::{Path, Query, State};
use serde::Serialize;

use crate::api::{parse_id, JsonBody, ListQuery};
use crate::models::{Page, Student, StudentPayload};
use crate::storage::delete_by_url;
use crate::{bails, breaks, proceeds, AppState, Error, Payload};

#[derive(Debug, Clone, Serialize)]
pub struct StudentEnvelope {
    pub student: Student,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteStatus {
    pub status: bool,
}

/// Loads a student for a response; a missing row is a query failure.
pub(crate) async fn fetch_student(state: &AppState, id: i64) -> Payload<StudentEnvelope> {
    match state.students.get(id).await? {
        Some(student) => proceeds(StudentEnvelope { student }),
        None => {
            log::error!("Return error for students: {}", id);
            breaks(Error::SqlError {
                message: format!("Student with id `{}` does not exist", id),
            })
        }
    }
}

pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Payload<Page<Student>> {
    let page = query.page_request();
    log::info!("Get all student records, page {} per_page {}", page.page, page.per_page);
    proceeds(state.students.list(page).await?)
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Payload<StudentEnvelope> {
    let id = parse_id(&id)?;
    log::info!("Return data for student_id: {}", id);
    fetch_student(&state, id).await
}

pub async fn search_students(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Payload<Page<Student>> {
    let text = query.query.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return breaks(Error::invalid("`query` parameter is required"));
    }
    let page = query.page_request();
    log::info!("search student : query: {}", text);
    proceeds(state.students.search(text, page).await?)
}

pub async fn create_student(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<StudentPayload>,
) -> Payload<StudentEnvelope> {
    payload.validate()?;

    let address = payload
        .address
        .take()
        .unwrap_or_else(|| state.config.default_address.clone());
    address.validate()?;

    let address_id = match state.addresses.create(address.for_student()).await {
        Ok(id) => id,
        Err(err) => {
            log::error!("Student address create fail: {}", err);
            return bails("Student address create fail");
        }
    };

    let name = payload.name.clone();
    let student_id = match state
        .students
        .create(payload.into_new_student(address_id, ""))
        .await
    {
        Ok(id) => id,
        Err(err) => {
            log::error!("Create student request fail: {}", err);
            if let Err(cleanup) = state.addresses.delete(address_id).await {
                log::warn!(
                    "Could not remove address {} of failed student: {}",
                    address_id,
                    cleanup
                );
            }
            return breaks(err);
        }
    };

    log::info!("Create student success. student_name {}", name);
    fetch_student(&state, student_id).await
}

pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(mut payload): JsonBody<StudentPayload>,
) -> Payload<StudentEnvelope> {
    let id = parse_id(&id)?;
    payload.validate()?;

    let student = match state.students.get(id).await? {
        Some(student) => student,
        None => return bails("Invalid student id supplied."),
    };
    let address_id = student.address.id;

    if let Some(address) = payload.address.take() {
        let updated = match state.addresses.update(address_id, address.for_student()).await {
            Ok(updated) => updated,
            Err(err) => {
                log::error!("Address update fail for student_id {}: {}", id, err);
                false
            }
        };
        if !updated {
            return bails(format!("Address update fail for student id: {}", id));
        }
    }

    let updated = state
        .students
        .update(id, payload.into_new_student(address_id, &student.photo))
        .await?;
    if !updated {
        log::error!("Update fail for student_id: {}", id);
        return bails(format!("Update Fail for student id: {}", id));
    }

    log::info!("Update success for student_id: {}", id);
    fetch_student(&state, id).await
}

pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Payload<DeleteStatus> {
    let id = parse_id(&id)?;
    log::info!("Delete student id: {}", id);

    let student = match state.students.get(id).await? {
        Some(student) => student,
        None => {
            return breaks(Error::SqlError {
                message: format!("Student with id `{}` does not exist", id),
            })
        }
    };

    if !state.students.delete(id).await? {
        log::error!("Fail to delete student_id: {}", id);
        return proceeds(DeleteStatus { status: false });
    }

    if student.photo.is_empty() {
        log::info!("No photo stored for student_id: {}", id);
    } else {
        match delete_by_url(state.photos.as_ref(), &student.photo).await {
            Ok(()) => log::info!("Deleted photo of student_id {} from storage", id),
            Err(err) => log::warn!("Could not delete photo {}: {}", student.photo, err),
        }
    }

    let address_deleted = state.addresses.delete(student.address.id).await?;
    if !address_deleted {
        log::error!(
            "Student {} deleted but address {} was left behind",
            id,
            student.address.id
        );
    }
    proceeds(DeleteStatus {
        status: address_deleted,
    })
}
