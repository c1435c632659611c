use crate::{
    auth::auth::AuthUser,
    backend::Backend,
    error::AppError,
    model::{attendance::AttendanceRecord, user::InTime},
};
use actix_web::{HttpResponse, Responder, web};
use serde_json::Value;

/// Records of the signed-in user
#[utoipa::path(
    get,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Attendance records of the caller", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    let state = backend.session_state(&auth).await;
    if state.user().is_none() {
        return Err(AppError::NotAuthenticated.into());
    }

    backend.actions(&state).fetch_attendance().await;

    Ok(HttpResponse::Ok().json(state.snapshot().attendance))
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/in",
    responses(
        (status = 201, description = "Clocked in", body = InTime),
        (status = 401, description = "No user logged in"),
        (status = 409, description = "Already recorded today", body = Object, example = json!({
            "error": "Attendance already recorded for today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    let state = backend.session_state(&auth).await;
    let in_time = backend.actions(&state).record_in_time().await?;

    Ok(HttpResponse::Created().json(in_time))
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/out",
    responses(
        (status = 200, description = "Clocked out", body = AttendanceRecord),
        (status = 400, description = "No in-time recorded, or no record for today", body = Object, example = json!({
            "error": "No in-time recorded"
        })),
        (status = 401, description = "No user logged in"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    let state = backend.session_state(&auth).await;
    let record = backend.actions(&state).record_out_time().await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Patch an attendance record by id
#[utoipa::path(
    put,
    path = "/api/attendance/{record_id}",
    params(
        ("record_id" = String, Path, description = "ID of the attendance record to edit")
    ),
    request_body(
        content = Object,
        description = "Any of `inTime` (HH:MM:SS), `outTime` (HH:MM:SS or null), `date` (YYYY-MM-DD)",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Record updated", body = Object, example = json!({
            "message": "Attendance updated"
        })),
        (status = 400, description = "Invalid patch"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "The new date already has a record for this user")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn edit_attendance(
    auth: AuthUser,
    backend: web::Data<Backend>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();
    let state = backend.session_state(&auth).await;

    backend
        .actions(&state)
        .edit_attendance(&record_id, &payload)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance updated"
    })))
}
