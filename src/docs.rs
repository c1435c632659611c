use crate::api::holiday::CreateHoliday;
use crate::auth::gateway::Session;
use crate::auth::handlers::AuthResponse;
use crate::model::{
    attendance::AttendanceRecord,
    holiday::Holiday,
    role::Role,
    user::{InTime, User},
};
use crate::models::{LoginReqDto, ResetConfirmDto, ResetRequestDto, SignupReq};
use crate::state::SessionState;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Employees sign up, log in and clock in and out once per day. Admins see every
user and can remove them together with their attendance history.

### 🔹 Key Features
- **Accounts**
  - Sign up with name and department, log in, log out, reset a forgotten password
- **Attendance**
  - One record per user and day, clock-out closes it
  - Records can be corrected afterwards
- **Holidays**
  - Shared company calendar
- **Administration**
  - List and delete users (attendance is removed with them)

### 🔐 Security
Protected endpoints take a **JWT Bearer** access token or the `session` cookie
set at login. Logging out revokes every token of the session.

### 📦 Response Format
Errors are JSON objects of the form `{"error": "message"}`.
"#,
    ),
    paths(
        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::request_password_reset,
        crate::auth::handlers::confirm_password_reset,

        crate::api::profile::me,

        crate::api::attendance::list_attendance,
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::edit_attendance,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,

        crate::api::admin::list_users,
        crate::api::admin::delete_user
    ),
    components(
        schemas(
            SignupReq,
            LoginReqDto,
            ResetRequestDto,
            ResetConfirmDto,
            Session,
            AuthResponse,
            User,
            InTime,
            Role,
            AttendanceRecord,
            Holiday,
            CreateHoliday,
            SessionState
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Account and session APIs"),
        (name = "Session", description = "State of the signed-in session"),
        (name = "Attendance", description = "Clock in, clock out and attendance history"),
        (name = "Holiday", description = "Company holiday calendar"),
        (name = "Admin", description = "User administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_with_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/auth/signup",
            "/auth/login",
            "/api/attendance/in",
            "/api/attendance/out",
            "/api/holidays",
            "/api/admin/users/{uid}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{} missing", path);
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("AttendanceRecord"));
    }
}
