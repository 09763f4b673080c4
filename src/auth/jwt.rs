use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

impl UserClaims {
    pub fn new(user_id: uuid::Uuid, role: impl ToString, valid_for: chrono::Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now() + valid_for).timestamp(),
        }
    }
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_round_trip() {
        let id = uuid::Uuid::new_v4();
        let claims = UserClaims::new(id, "trainer", chrono::Duration::hours(1));
        let token = generate_token(claims, "secret").unwrap();

        let data = process_token(&token, "secret").unwrap();
        assert_eq!(data.claims.sub, id.to_string());
        assert_eq!(data.claims.role, "trainer");
    }

    #[test]
    fn wrong_key_rejected() {
        let claims = UserClaims::new(uuid::Uuid::new_v4(), "student", chrono::Duration::hours(1));
        let token = generate_token(claims, "secret").unwrap();
        assert!(process_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let claims = UserClaims::new(uuid::Uuid::new_v4(), "student", chrono::Duration::hours(-2));
        let token = generate_token(claims, "secret").unwrap();
        assert!(process_token(&token, "secret").is_err());
    }
}
