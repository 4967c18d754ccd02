use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;

#[derive(Deserialize, ToSchema)]
pub struct RegisterTenantReq {
    #[schema(example = "Acme Ltda")]
    pub empresa_nome: String,
    #[schema(example = "admin-acme")]
    pub usuario_id: String,
    pub senha: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    pub usuario_id: String,
    pub senha: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub empresa_id: String,
    pub empresa_nome: String,
}

#[derive(sqlx::FromRow)]
struct UsuarioSql {
    usuario_id: String,
    senha_hash: String,
    empresa_id: String,
    empresa_nome: String,
}

/// Register Tenant
///
/// Creates a company and its credential row. The generated empresa_id
/// partitions every employee and attendance record from this point on.
#[utoipa::path(
    post,
    path = "/auth/registrar",
    request_body = RegisterTenantReq,
    responses(
        (status = 201, description = "Tenant registered", body = Object, example = json!({
            "empresa_id": "e2b7c9d1-5a4f-4e8b-9c3a-1d6f8e0a2b4c"
        })),
        (status = 400, description = "Missing required field"),
        (status = 409, description = "usuario_id already taken")
    ),
    tag = "Auth"
)]
pub async fn register_tenant(
    payload: web::Json<RegisterTenantReq>,
    pool: web::Data<MySqlPool>,
) -> impl Responder {
    let usuario_id = payload.usuario_id.trim();
    let empresa_nome = payload.empresa_nome.trim();

    if usuario_id.is_empty() || empresa_nome.is_empty() || payload.senha.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "empresa_nome, usuario_id and senha must not be empty"
        }));
    }

    let empresa_id = Uuid::new_v4().to_string();
    let senha_hash = hash_password(&payload.senha);

    let result = sqlx::query(
        r#"
        INSERT INTO usuarios (usuario_id, senha_hash, empresa_id, empresa_nome)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(usuario_id)
    .bind(&senha_hash)
    .bind(&empresa_id)
    .bind(empresa_nome)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(empresa_id = %empresa_id, "Tenant registered");
            HttpResponse::Created().json(json!({ "empresa_id": empresa_id }))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return HttpResponse::Conflict().json(json!({
                        "error": "usuario_id already taken"
                    }));
                }
            }

            error!(error = %e, "Failed to register tenant");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register tenant"
            }))
        }
    }
}

/// Login
///
/// Issues the signed, time-limited token carrying the tenant scope.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload), fields(usuario_id = %payload.usuario_id))]
pub async fn login(
    payload: web::Json<LoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    if payload.usuario_id.trim().is_empty() || payload.senha.is_empty() {
        return HttpResponse::BadRequest().body("usuario_id and senha required");
    }

    debug!("Fetching credential row");

    let usuario = match sqlx::query_as::<_, UsuarioSql>(
        r#"
        SELECT usuario_id, senha_hash, empresa_id, empresa_nome
        FROM usuarios
        WHERE usuario_id = ?
        "#,
    )
    .bind(&payload.usuario_id)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!("Invalid credentials: usuario not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching usuario");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&payload.senha, &usuario.senha_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    let access_token = generate_token(
        usuario.usuario_id,
        usuario.empresa_id.clone(),
        usuario.empresa_nome.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        empresa_id: usuario.empresa_id,
        empresa_nome: usuario.empresa_nome,
    })
}
