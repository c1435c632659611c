#[allow(clippy::module_inception)]
pub mod auth;
pub mod gateway;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod provider;
pub mod session;
