use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Face-recognition collaborator
    pub face_api_url: String,
    pub face_match_threshold: f32,

    // Photo store
    pub photo_dir: String,
    pub photo_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "3600".to_string()) // default 1 hour
                .parse()
                .unwrap(),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_register_per_min: env::var("RATE_REGISTER_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            face_api_url: env::var("FACE_API_URL").expect("FACE_API_URL must be set"),
            face_match_threshold: env::var("FACE_MATCH_THRESHOLD")
                .unwrap_or_else(|_| "85".to_string())
                .parse()
                .unwrap(),

            photo_dir: env::var("PHOTO_DIR").unwrap_or_else(|_| "fotos".to_string()),
            photo_base_url: env::var("PHOTO_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/fotos".to_string()),
        }
    }
}
