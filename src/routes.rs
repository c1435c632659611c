use crate::{
    api::{admin, attendance, holiday, profile},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    router,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("period and burst size are non-zero");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let signup_limiter = Arc::new(build_limiter(config.rate_signup_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/signup")
                    .wrap(signup_limiter.clone())
                    .route(web::post().to(handlers::signup)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/reset-password")
                    .wrap(signup_limiter.clone())
                    .route(web::post().to(handlers::request_password_reset)),
            )
            .service(
                web::resource("/reset-password/confirm")
                    .wrap(signup_limiter)
                    .route(web::post().to(handlers::confirm_password_reset)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(profile::me)))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    .service(web::resource("/in").route(web::post().to(attendance::clock_in)))
                    .service(web::resource("/out").route(web::post().to(attendance::clock_out)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}").route(web::put().to(attendance::edit_attendance)),
                    ),
            )
            .service(
                web::scope("/holidays").service(
                    web::resource("")
                        .route(web::get().to(holiday::list_holidays))
                        .route(web::post().to(holiday::create_holiday)),
                ),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/users").route(web::get().to(admin::list_users)))
                    .service(
                        web::resource("/users/{uid}").route(web::delete().to(admin::delete_user)),
                    ),
            ),
    );

    // Client pages behind the navigation guard
    router::configure(cfg);
}

// LOGIN
//  ├─ access_token (15 min), also set as the `session` cookie
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token   (or the session cookie)

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair for the same session

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::provider::StoreAuthProvider,
        backend::Backend,
        clock::FixedClock,
        store::{DocumentStore, MemoryStore},
    };
    use actix_web::{
        App,
        http::{StatusCode, header},
        test,
        web::Data,
    };
    use serde_json::{Value, json};
    use std::net::SocketAddr;

    fn backend() -> Data<Backend> {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let provider = Arc::new(StoreAuthProvider::new(store.clone()));
        let clock = Arc::new(FixedClock::at("2026-03-02T09:00:00+00:00"));
        Data::new(Backend::new(store, provider, clock, &Config::for_tests()))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    macro_rules! signup {
        ($app:expr, $email:expr) => {{
            let req = test::TestRequest::post()
                .uri("/auth/signup")
                .peer_addr(peer())
                .set_json(json!({
                    "name": "Ada Lovelace",
                    "department": "Engineering",
                    "email": $email,
                    "password": "hunter22"
                }))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            body
        }};
    }

    macro_rules! app {
        ($backend:expr) => {
            test::init_service(
                App::new()
                    .app_data($backend.clone())
                    .configure(|cfg| configure(cfg, Config::for_tests())),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn dashboard_redirects_to_login_when_signed_out() {
        let backend = backend();
        let app = app!(backend);

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[actix_web::test]
    async fn login_page_redirects_signed_in_user_to_dashboard() {
        let backend = backend();
        let app = app!(backend);
        let body = signup!(app, "ada@example.com");
        let token = body["access_token"].as_str().unwrap();

        let req = test::TestRequest::get()
            .uri("/login")
            .insert_header(bearer(token))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/dashboard");

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .cookie(actix_web::cookie::Cookie::new("session", token.to_string()))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = test::read_body_json(resp).await;
        assert_eq!(view["view"], "Dashboard");
    }

    #[actix_web::test]
    async fn clock_in_twice_conflicts_and_clock_out_closes() {
        let backend = backend();
        let app = app!(backend);
        let body = signup!(app, "ada@example.com");
        let token = body["access_token"].as_str().unwrap().to_string();

        let clock_in = || {
            test::TestRequest::post()
                .uri("/api/attendance/in")
                .insert_header(bearer(&token))
                .peer_addr(peer())
                .to_request()
        };

        let resp = test::call_service(&app, clock_in()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test::call_service(&app, clock_in()).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Attendance already recorded for today");

        let req = test::TestRequest::post()
            .uri("/api/attendance/out")
            .insert_header(bearer(&token))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/attendance")
            .insert_header(bearer(&token))
            .peer_addr(peer())
            .to_request();
        let records: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["outTime"], "09:00:00");
    }

    #[actix_web::test]
    async fn clock_out_without_clock_in_is_bad_request() {
        let backend = backend();
        let app = app!(backend);
        let body = signup!(app, "ada@example.com");
        let token = body["access_token"].as_str().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/attendance/out")
            .insert_header(bearer(token))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "No in-time recorded");
    }

    #[actix_web::test]
    async fn api_rejects_missing_token() {
        let backend = backend();
        let app = app!(backend);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn logout_revokes_the_session() {
        let backend = backend();
        let app = app!(backend);
        let body = signup!(app, "ada@example.com");
        let token = body["access_token"].as_str().unwrap();

        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .insert_header(bearer(token))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(bearer(token))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .insert_header(bearer(token))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[actix_web::test]
    async fn login_returns_the_signed_up_uid() {
        let backend = backend();
        let app = app!(backend);
        let signed = signup!(app, "ada@example.com");

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({"email": "ada@example.com", "password": "hunter22"}))
            .to_request();
        let logged: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(logged["user"]["uid"], signed["user"]["uid"]);
        assert!(logged["refresh_token"].is_string());
    }

    #[actix_web::test]
    async fn refresh_issues_a_working_access_token_once() {
        let backend = backend();
        let app = app!(backend);
        let body = signup!(app, "ada@example.com");
        let refresh = body["refresh_token"].as_str().unwrap();

        let refresh_req = || {
            test::TestRequest::post()
                .uri("/auth/refresh")
                .insert_header(bearer(refresh))
                .peer_addr(peer())
                .to_request()
        };

        let resp = test::call_service(&app, refresh_req()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let renewed: Value = test::read_body_json(resp).await;
        let access = renewed["access_token"].as_str().unwrap();

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(bearer(access))
            .peer_addr(peer())
            .to_request();
        let state: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(state["user"]["email"], "ada@example.com");

        // the old refresh token was rotated out
        let resp = test::call_service(&app, refresh_req()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn admin_routes_are_admin_only() {
        let backend = backend();
        let app = app!(backend);
        let admin = signup!(app, "admin@example.com");
        let ada = signup!(app, "ada@example.com");
        let ada_uid = ada["user"]["uid"].as_str().unwrap();

        let req = test::TestRequest::get()
            .uri("/api/admin/users")
            .insert_header(bearer(ada["access_token"].as_str().unwrap()))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/admin/users/{}", ada_uid))
            .insert_header(bearer(admin["access_token"].as_str().unwrap()))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/admin/users")
            .insert_header(bearer(admin["access_token"].as_str().unwrap()))
            .peer_addr(peer())
            .to_request();
        let users: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "admin@example.com");
    }
}
