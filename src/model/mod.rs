pub mod attendance;
pub mod credential;
pub mod holiday;
pub mod role;
pub mod user;
