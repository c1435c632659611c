use crate::{
    auth::{
        auth::{SESSION_COOKIE, access_token},
        gateway::Session,
    },
    backend::Backend,
    error::AppError,
    model::user::User,
    models::{LoginReqDto, ResetConfirmDto, ResetRequestDto, SignupReq},
    state::{LoggedIn, StateContainer},
};
use actix_web::{
    HttpRequest, HttpResponse, Responder,
    cookie::{Cookie, SameSite},
    web,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

// auth end points

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub session: Session,
}

fn session_cookie(access_token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, access_token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Binds the state container that produced the login to its new session.
async fn start_session(
    backend: &Backend,
    state: Arc<StateContainer>,
    logged_in: LoggedIn,
    status: actix_web::http::StatusCode,
) -> HttpResponse {
    backend
        .auth
        .sessions()
        .attach(&logged_in.session.sid, state)
        .await;

    HttpResponse::build(status)
        .cookie(session_cookie(&logged_in.session.access_token))
        .json(AuthResponse {
            user: logged_in.user,
            session: logged_in.session,
        })
}

/// User signup handler
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupReq,
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Invalid email, weak password or missing fields"),
        (status = 409, description = "Email already in use")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_signup", skip(backend, payload), fields(email = %payload.email))]
pub async fn signup(
    payload: web::Json<SignupReq>,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    info!("Signup request received");

    let state = Arc::new(StateContainer::default());
    let logged_in = backend.actions(&state).signup(&payload).await?;

    Ok(start_session(&backend, state, logged_in, actix_web::http::StatusCode::CREATED).await)
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "Credentials valid but no user profile exists", body = Object, example = json!({
            "error": "User profile not found"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(backend, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Email and password required"
        })));
    }

    // 2️⃣ Authenticate and load the profile
    let state = Arc::new(StateContainer::default());
    let outcome = backend
        .actions(&state)
        .login(&user.email, &user.password)
        .await?;

    let Some(logged_in) = outcome else {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "User profile not found"
        })));
    };

    info!(uid = %logged_in.user.uid, "Login successful");

    Ok(start_session(&backend, state, logged_in, actix_web::http::StatusCode::OK).await)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair for the same session", body = Session),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    let token = match req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(t) => t,
        None => return Ok(HttpResponse::Unauthorized().json(json!({"error": "No token"}))),
    };

    let session = backend.auth.refresh(token).await.map_err(AppError::from)?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.access_token))
        .json(session))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out (also when no valid session was presented)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, backend: web::Data<Backend>) -> impl Responder {
    // 1️⃣ any token of the session will do, access or refresh
    let sid = access_token(&req).and_then(|token| backend.auth.session_id(&token));

    if let Some(sid) = sid {
        // 2️⃣ revoke and clear whatever the session had cached
        let state = backend
            .auth
            .sessions()
            .state(&sid)
            .await
            .unwrap_or_default();
        backend.actions(&state).logout(&sid).await;
    } else {
        debug!("Logout without a valid session");
    }

    // 3️⃣ success either way
    HttpResponse::NoContent().cookie(removal_cookie()).finish()
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetRequestDto,
    responses(
        (status = 202, description = "Reset code issued if the email is registered", body = Object, example = json!({
            "message": "If the email is registered, a reset code has been sent"
        }))
    ),
    tag = "Auth"
)]
pub async fn request_password_reset(
    payload: web::Json<ResetRequestDto>,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    backend
        .auth
        .provider()
        .send_password_reset(&payload.email)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Accepted().json(json!({
        "message": "If the email is registered, a reset code has been sent"
    })))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password/confirm",
    request_body = ResetConfirmDto,
    responses(
        (status = 200, description = "Password replaced", body = Object, example = json!({
            "message": "Password updated"
        })),
        (status = 400, description = "Invalid or expired reset code, or weak password")
    ),
    tag = "Auth"
)]
pub async fn confirm_password_reset(
    payload: web::Json<ResetConfirmDto>,
    backend: web::Data<Backend>,
) -> actix_web::Result<impl Responder> {
    backend
        .auth
        .provider()
        .confirm_password_reset(&payload.code, &payload.new_password)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password updated"
    })))
}
