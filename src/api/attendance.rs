use actix_web::{HttpResponse, web};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::auth::TenantContext;
use crate::collab::face::FaceIndex;
use crate::directory::TenantDirectory;
use crate::error::ApiError;
use crate::ledger::EventLedger;

#[derive(Deserialize, ToSchema)]
pub struct RegistrarPontoReq {
    /// Base64-encoded JPEG of the employee at the clock terminal.
    pub foto: String,
}

/// Registrar Ponto
///
/// Automatic clock event: identifies the employee from the photo, checks
/// tenant ownership, derives entrada/saida from the day's history and
/// appends to the ledger.
#[utoipa::path(
    post,
    path = "/api/ponto",
    request_body = RegistrarPontoReq,
    responses(
        (status = 200, description = "Event recorded", body = Object, example = json!({
            "success": true,
            "funcionario": "Maria Silva",
            "hora": "2024-01-10 08:00:03",
            "tipo": "entrada"
        })),
        (status = 400, description = "Malformed photo payload"),
        (status = 404, description = "Employee not recognized or not in this company"),
        (status = 409, description = "Duplicate event for this employee and second"),
        (status = 502, description = "Recognition service unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Ponto"
)]
pub async fn registrar_ponto(
    ctx: TenantContext,
    faces: web::Data<dyn FaceIndex>,
    directory: web::Data<TenantDirectory>,
    ledger: web::Data<EventLedger>,
    payload: web::Json<RegistrarPontoReq>,
) -> Result<HttpResponse, ApiError> {
    let foto = BASE64
        .decode(payload.foto.as_bytes())
        .map_err(|_| ApiError::InvalidInput("foto must be base64".to_string()))?;

    let funcionario_id = match faces.identify(&foto).await? {
        Some(id) => id,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "error": "Employee not recognized"
            })));
        }
    };

    // The recognized id still has to belong to the acting tenant; a match
    // from another company answers exactly like no match in the database.
    let funcionario = directory
        .resolve_employee(&ctx.empresa_id, &funcionario_id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound => {
                tracing::warn!(
                    funcionario_id = %funcionario_id,
                    empresa_id = %ctx.empresa_id,
                    "Recognized employee not present in acting tenant"
                );
                ApiError::NotFound
            }
            other => other,
        })?;

    let agora = Local::now().naive_local();
    let registro = ledger.append_toggled(&funcionario, agora).await?;

    tracing::info!(
        funcionario_id = %funcionario.id,
        tipo = %registro.tipo,
        hora = %registro.data_hora,
        "Clock event recorded"
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "funcionario": funcionario.nome,
        "hora": registro.data_hora,
        "tipo": registro.tipo,
    })))
}
