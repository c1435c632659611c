use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

fn generate_token(
    uid: &str,
    email: &str,
    role: u8,
    sid: &str,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        sub: uid.to_string(),
        email: email.to_string(),
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        sid: sid.to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    uid: &str,
    email: &str,
    role: u8,
    sid: &str,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    generate_token(uid, email, role, sid, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    uid: &str,
    email: &str,
    role: u8,
    sid: &str,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    generate_token(uid, email, role, sid, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_and_refresh_tokens_share_the_session() {
        let access = generate_access_token("u1", "a@b.c", 2, "sid-1", "secret", 60).unwrap();
        let (refresh, refresh_claims) =
            generate_refresh_token("u1", "a@b.c", 2, "sid-1", "secret", 600).unwrap();

        let access_claims = verify_token(&access, "secret").unwrap();
        assert_eq!(access_claims.token_type, TokenType::Access);
        assert_eq!(access_claims.sid, "sid-1");
        assert_eq!(access_claims.sub, "u1");

        let decoded = verify_token(&refresh, "secret").unwrap();
        assert_eq!(decoded.token_type, TokenType::Refresh);
        assert_eq!(decoded.jti, refresh_claims.jti);
        assert_ne!(decoded.jti, access_claims.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token("u1", "a@b.c", 2, "sid-1", "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
