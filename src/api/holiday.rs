use crate::{auth::auth::AuthUser, backend::Backend, model::holiday::Holiday};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "2026-12-25", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Christmas Day")]
    pub description: String,
}

#[utoipa::path(
    get,
    path = "/api/holidays",
    responses(
        (status = 200, description = "All holidays", body = [Holiday]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn list_holidays(
    auth: AuthUser,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    let state = backend.session_state(&auth).await;
    backend.actions(&state).fetch_holidays().await;

    Ok(HttpResponse::Ok().json(state.snapshot().holidays))
}

#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday added", body = Holiday),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn create_holiday(
    auth: AuthUser,
    backend: web::Data<Backend>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    let state = backend.session_state(&auth).await;
    let holiday = backend
        .actions(&state)
        .add_holiday(payload.date, &payload.description)
        .await?;

    Ok(HttpResponse::Created().json(holiday))
}
