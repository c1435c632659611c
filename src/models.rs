use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SignupReq {
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "ada@example.com", format = "email")]
    pub email: String,
    #[schema(example = "correct horse battery staple", format = "password")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "ada@example.com", format = "email")]
    pub email: String,
    #[schema(example = "correct horse battery staple", format = "password")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetRequestDto {
    #[schema(example = "ada@example.com", format = "email")]
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetConfirmDto {
    pub code: String,
    #[schema(format = "password")]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: String,
    pub email: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,
    /// Session id, shared by every token issued for one login
    pub sid: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
