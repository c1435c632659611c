use crate::{auth::auth::AuthUser, backend::Backend, model::user::User};
use actix_web::{HttpResponse, Responder, web};

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Every user document", body = [User]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn list_users(
    auth: AuthUser,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let state = backend.session_state(&auth).await;
    let users = backend.actions(&state).fetch_all_users().await;

    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{uid}",
    params(
        ("uid" = String, Path, description = "uid of the user to delete")
    ),
    responses(
        (status = 200, description = "User and attendance deleted", body = Object, example = json!({
            "message": "User deleted",
            "removed_records": 12
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn delete_user(
    auth: AuthUser,
    backend: web::Data<Backend>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let uid = path.into_inner();
    let state = backend.session_state(&auth).await;
    let removed = backend.actions(&state).delete_user(&uid).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User deleted",
        "removed_records": removed
    })))
}
