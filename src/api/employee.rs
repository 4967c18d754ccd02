use actix_web::{HttpResponse, web};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::auth::auth::TenantContext;
use crate::collab::face::FaceIndex;
use crate::collab::photos::PhotoStore;
use crate::directory::TenantDirectory;
use crate::error::ApiError;
use crate::model::funcionario::{Employee, new_employee_id};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployeeReq {
    #[schema(example = "Maria Silva")]
    pub nome: String,
    #[schema(example = "Analista")]
    pub cargo: String,
    /// Base64-encoded JPEG used for face enrollment and as profile photo.
    pub foto: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployeeReq {
    pub nome: Option<String>,
    pub cargo: Option<String>,
    /// Replaces both the stored photo and the face enrollment.
    pub foto: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmployeeQuery {
    /// Substring match on the display name.
    pub nome: Option<String>,
}

fn decode_foto(foto: &str) -> Result<Vec<u8>, ApiError> {
    BASE64
        .decode(foto.as_bytes())
        .map_err(|_| ApiError::InvalidInput("foto must be base64".to_string()))
}

/// Create Employee
///
/// Registration requires a successful face enrollment; nothing is
/// persisted if the recognition service refuses the photo.
#[utoipa::path(
    post,
    path = "/api/funcionarios",
    request_body = CreateEmployeeReq,
    responses(
        (status = 201, description = "Employee registered", body = Employee),
        (status = 400, description = "Missing field or malformed photo"),
        (status = 502, description = "Recognition or photo service unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Funcionario"
)]
pub async fn create_employee(
    ctx: TenantContext,
    pool: web::Data<MySqlPool>,
    faces: web::Data<dyn FaceIndex>,
    photos: web::Data<dyn PhotoStore>,
    payload: web::Json<CreateEmployeeReq>,
) -> Result<HttpResponse, ApiError> {
    let nome = payload.nome.trim();
    let cargo = payload.cargo.trim();

    if nome.is_empty() || cargo.is_empty() {
        return Err(ApiError::InvalidInput(
            "nome and cargo must not be empty".to_string(),
        ));
    }

    let foto = decode_foto(&payload.foto)?;
    let id = new_employee_id(nome);

    // Enrollment first: a failure here leaves no partial state behind.
    let face_id = faces.enroll(&foto, &id).await?;
    let foto_url = photos.store(&foto, &format!("{}.jpg", id)).await?;

    let funcionario = Employee {
        id,
        nome: nome.to_string(),
        cargo: cargo.to_string(),
        foto_url,
        face_id,
        empresa_id: ctx.empresa_id.clone(),
        empresa_nome: ctx.empresa_nome.clone(),
        data_cadastro: Local::now().date_naive(),
    };

    sqlx::query(
        r#"
        INSERT INTO funcionarios
        (id, nome, cargo, foto_url, face_id, empresa_id, empresa_nome, data_cadastro)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&funcionario.id)
    .bind(&funcionario.nome)
    .bind(&funcionario.cargo)
    .bind(&funcionario.foto_url)
    .bind(&funcionario.face_id)
    .bind(&funcionario.empresa_id)
    .bind(&funcionario.empresa_nome)
    .bind(funcionario.data_cadastro)
    .execute(pool.get_ref())
    .await?;

    info!(funcionario_id = %funcionario.id, empresa_id = %ctx.empresa_id, "Employee registered");

    Ok(HttpResponse::Created().json(funcionario))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/funcionarios",
    params(("nome", Query, description = "Substring filter on name")),
    responses((status = 200, description = "Scoped employee list")),
    security(("bearer_auth" = [])),
    tag = "Funcionario"
)]
pub async fn list_employees(
    ctx: TenantContext,
    directory: web::Data<TenantDirectory>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    let funcionarios = directory
        .list_employees(&ctx.empresa_id, query.nome.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "total": funcionarios.len(),
        "data": funcionarios,
    })))
}

/// Get Employee
#[utoipa::path(
    get,
    path = "/api/funcionarios/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Absent or owned by another company")
    ),
    security(("bearer_auth" = [])),
    tag = "Funcionario"
)]
pub async fn get_employee(
    ctx: TenantContext,
    directory: web::Data<TenantDirectory>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let funcionario = directory
        .resolve_employee(&ctx.empresa_id, &path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(funcionario))
}

/// Update Employee
///
/// Profile/photo update. A new photo re-enrolls the face and replaces the
/// stored references; empresa_id never changes.
#[utoipa::path(
    put,
    path = "/api/funcionarios/{id}",
    params(("id", Path, description = "Employee ID")),
    request_body = UpdateEmployeeReq,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Absent or owned by another company"),
        (status = 502, description = "Recognition or photo service unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Funcionario"
)]
pub async fn update_employee(
    ctx: TenantContext,
    pool: web::Data<MySqlPool>,
    directory: web::Data<TenantDirectory>,
    faces: web::Data<dyn FaceIndex>,
    photos: web::Data<dyn PhotoStore>,
    path: web::Path<String>,
    payload: web::Json<UpdateEmployeeReq>,
) -> Result<HttpResponse, ApiError> {
    let funcionario_id = path.into_inner();
    let mut funcionario = directory
        .resolve_employee(&ctx.empresa_id, &funcionario_id)
        .await?;

    let mut sets: Vec<&str> = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(nome) = payload.nome.as_deref().map(str::trim) {
        if nome.is_empty() {
            return Err(ApiError::InvalidInput("nome must not be empty".to_string()));
        }
        sets.push("nome = ?");
        bindings.push(nome.to_string());
        funcionario.nome = nome.to_string();
    }

    if let Some(cargo) = payload.cargo.as_deref().map(str::trim) {
        if cargo.is_empty() {
            return Err(ApiError::InvalidInput("cargo must not be empty".to_string()));
        }
        sets.push("cargo = ?");
        bindings.push(cargo.to_string());
        funcionario.cargo = cargo.to_string();
    }

    if let Some(foto) = &payload.foto {
        let foto = decode_foto(foto)?;
        let old_face_id = funcionario.face_id.clone();

        let face_id = faces.enroll(&foto, &funcionario.id).await?;
        let foto_url = photos
            .store(&foto, &format!("{}.jpg", funcionario.id))
            .await?;

        // Best-effort: a leftover face is picked up by the startup sweep.
        if let Err(e) = faces.deindex(&old_face_id).await {
            warn!(error = %e, face_id = %old_face_id, "Failed to deindex replaced face");
        }

        sets.push("face_id = ?");
        bindings.push(face_id.clone());
        sets.push("foto_url = ?");
        bindings.push(foto_url.clone());
        funcionario.face_id = face_id;
        funcionario.foto_url = foto_url;
    }

    if sets.is_empty() {
        return Err(ApiError::InvalidInput(
            "no fields provided for update".to_string(),
        ));
    }

    let sql = format!(
        "UPDATE funcionarios SET {} WHERE id = ? AND empresa_id = ?",
        sets.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for b in &bindings {
        query = query.bind(b);
    }
    query = query.bind(&funcionario.id).bind(&ctx.empresa_id);

    query.execute(pool.get_ref()).await?;

    info!(funcionario_id = %funcionario.id, "Employee updated");

    Ok(HttpResponse::Ok().json(funcionario))
}

/// Delete Employee
///
/// Removes the row, then asks the face index to forget the enrollment;
/// the deindex is best-effort and never blocks the deletion.
#[utoipa::path(
    delete,
    path = "/api/funcionarios/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted"),
        (status = 404, description = "Absent or owned by another company")
    ),
    security(("bearer_auth" = [])),
    tag = "Funcionario"
)]
pub async fn delete_employee(
    ctx: TenantContext,
    pool: web::Data<MySqlPool>,
    directory: web::Data<TenantDirectory>,
    faces: web::Data<dyn FaceIndex>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let funcionario_id = path.into_inner();
    let funcionario = directory
        .resolve_employee(&ctx.empresa_id, &funcionario_id)
        .await?;

    let result = sqlx::query(r#"DELETE FROM funcionarios WHERE id = ? AND empresa_id = ?"#)
        .bind(&funcionario.id)
        .bind(&ctx.empresa_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, funcionario_id = %funcionario.id, "Failed to delete employee");
            ApiError::Internal
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    if let Err(e) = faces.deindex(&funcionario.face_id).await {
        warn!(
            error = %e,
            face_id = %funcionario.face_id,
            "Failed to deindex face of deleted employee"
        );
    }

    info!(funcionario_id = %funcionario.id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted" })))
}
