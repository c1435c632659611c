//! Client page routes and the navigation guard in front of them.

use crate::{auth::auth::access_token, backend::Backend};
use actix_web::{
    Error, HttpRequest, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::{Next, from_fn},
    web::{self, Data},
};
use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

pub const LOGIN: &str = "/login";
pub const DASHBOARD: &str = "/dashboard";

#[derive(Debug, PartialEq, Eq)]
pub struct PageRoute {
    pub path: &'static str,
    pub name: &'static str,
    pub requires_auth: bool,
}

pub const PAGES: &[PageRoute] = &[
    PageRoute {
        path: "/",
        name: "Start",
        requires_auth: false,
    },
    PageRoute {
        path: LOGIN,
        name: "Login",
        requires_auth: false,
    },
    PageRoute {
        path: "/signup",
        name: "Signup",
        requires_auth: false,
    },
    PageRoute {
        path: DASHBOARD,
        name: "Dashboard",
        requires_auth: true,
    },
    PageRoute {
        path: "/reset-password",
        name: "ResetPassword",
        requires_auth: false,
    },
];

static BY_PATH: Lazy<HashMap<&'static str, &'static PageRoute>> =
    Lazy::new(|| PAGES.iter().map(|page| (page.path, page)).collect());

pub fn find(path: &str) -> Option<&'static PageRoute> {
    BY_PATH.get(path).copied()
}

#[derive(Debug, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(&'static str),
}

/// Protected pages need a user; public pages send a signed-in user to the dashboard.
pub fn resolve(route: &PageRoute, authenticated: bool) -> Navigation {
    if route.requires_auth && !authenticated {
        Navigation::Redirect(LOGIN)
    } else if !route.requires_auth && authenticated && route.path != DASHBOARD {
        Navigation::Redirect(DASHBOARD)
    } else {
        Navigation::Proceed
    }
}

/// Re-checks the auth state on every navigation; nothing is cached.
pub async fn route_guard(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(route) = find(req.path()) else {
        return next.call(req).await;
    };

    let authenticated = match (
        req.app_data::<Data<Backend>>(),
        access_token(req.request()),
    ) {
        (Some(backend), Some(token)) => backend.auth.current_user(&token).await.is_ok(),
        _ => false,
    };

    match resolve(route, authenticated) {
        Navigation::Proceed => next.call(req).await,
        Navigation::Redirect(to) => {
            debug!(from = route.path, to, "Navigation redirected");
            let resp = HttpResponse::Found()
                .insert_header((header::LOCATION, to))
                .finish();
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}

/// View descriptor for a page; rendering itself happens client-side.
pub async fn render_page(req: HttpRequest) -> HttpResponse {
    match find(req.path()) {
        Some(route) => HttpResponse::Ok().json(json!({
            "view": route.name,
            "path": route.path,
            "requiresAuth": route.requires_auth,
        })),
        None => HttpResponse::NotFound().finish(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    for page in PAGES {
        cfg.service(
            web::resource(page.path)
                .wrap(from_fn(route_guard))
                .route(web::get().to(render_page)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_requires_authentication() {
        let dashboard = find(DASHBOARD).unwrap();
        assert_eq!(resolve(dashboard, false), Navigation::Redirect(LOGIN));
        assert_eq!(resolve(dashboard, true), Navigation::Proceed);
    }

    #[test]
    fn public_pages_send_signed_in_users_to_dashboard() {
        for path in ["/", LOGIN, "/signup", "/reset-password"] {
            let route = find(path).unwrap();
            assert_eq!(resolve(route, true), Navigation::Redirect(DASHBOARD), "{}", path);
            assert_eq!(resolve(route, false), Navigation::Proceed, "{}", path);
        }
    }

    #[test]
    fn unknown_paths_are_not_pages() {
        assert!(find("/admin").is_none());
        assert_eq!(PAGES.len(), 5);
    }
}
