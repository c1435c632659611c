use crate::{auth::auth::AuthUser, backend::Backend, state::SessionState};
use actix_web::{HttpResponse, Responder, web};

/// Cached state of the caller's session
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Session state", body = SessionState),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Session"
)]
pub async fn me(auth: AuthUser, backend: web::Data<Backend>) -> actix_web::Result<impl Responder> {
    let state = backend.session_state(&auth).await;
    Ok(HttpResponse::Ok().json(state.snapshot()))
}
