pub mod admin;
pub mod attendance;
pub mod holiday;
pub mod profile;
