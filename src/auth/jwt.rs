use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token claims. The tenant scope travels inside the token and is trusted
/// verbatim once the signature verifies; handlers never re-derive it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// usuario_id
    pub sub: String,
    pub empresa_id: String,
    pub empresa_nome: String,
    pub exp: usize,
    pub jti: String,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

pub fn generate_token(
    usuario_id: String,
    empresa_id: String,
    empresa_nome: String,
    secret: &str,
    ttl: usize,
) -> String {
    let claims = Claims {
        sub: usuario_id,
        empresa_id,
        empresa_nome,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
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
