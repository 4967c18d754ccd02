use std::collections::{BTreeMap, HashMap};

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::auth::TenantContext;
use crate::core::filter::RecordFilter;
use crate::core::reconcile::{format_duration, reconcile};
use crate::directory::TenantDirectory;
use crate::error::ApiError;
use crate::ledger::EventLedger;
use crate::model::registro::{EventType, parse_data, parse_data_hora};

#[derive(Deserialize, ToSchema)]
pub struct ManualRecordReq {
    pub funcionario_id: String,
    /// `YYYY-MM-DD HH:MM:SS` (the presentation variant is accepted too).
    #[schema(example = "2024-01-10 08:00:00")]
    pub data_hora: String,
    /// Omitted: derived from the day's history exactly like an automatic
    /// event.
    pub tipo: Option<EventType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordQuery {
    /// Lower date bound, inclusive.
    pub de: Option<String>,
    /// Upper date bound, inclusive.
    pub ate: Option<String>,
    /// Comma-separated employee ids; present-but-empty matches nothing.
    pub funcionario_ids: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkedHours {
    pub funcionario_id: String,
    pub nome: String,
    pub total_segundos: i64,
    #[schema(example = "07:30:00")]
    pub total: String,
}

/// Name shown when records outlive their employee; the raw id must not
/// leak into the name field.
const NOME_DESCONHECIDO: &str = "Desconhecido";

fn summarize_hours(
    totals: &BTreeMap<String, i64>,
    nomes: &HashMap<&str, &str>,
) -> Vec<WorkedHours> {
    totals
        .iter()
        .map(|(funcionario_id, total_segundos)| WorkedHours {
            funcionario_id: funcionario_id.clone(),
            nome: nomes
                .get(funcionario_id.as_str())
                .copied()
                .unwrap_or(NOME_DESCONHECIDO)
                .to_string(),
            total_segundos: *total_segundos,
            total: format_duration(*total_segundos),
        })
        .collect()
}

fn build_filter(empresa_id: &str, query: &RecordQuery) -> Result<RecordFilter, ApiError> {
    let mut filter = RecordFilter::for_company(empresa_id);

    if let Some(de) = &query.de {
        filter.de = Some(parse_data(de)?);
    }
    if let Some(ate) = &query.ate {
        filter.ate = Some(parse_data(ate)?);
    }
    if let Some(ids) = &query.funcionario_ids {
        filter.funcionario_ids = Some(
            ids.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        );
    }

    Ok(filter)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DayQuery {
    /// Calendar day; defaults to today.
    pub data: Option<String>,
}

/// Employee Day Records
///
/// The employee's shift day: same-day events, ascending.
#[utoipa::path(
    get,
    path = "/api/funcionarios/{id}/registros",
    params(
        ("id", Path, description = "Employee ID"),
        ("data", Query, description = "Calendar day, defaults to today")
    ),
    responses(
        (status = 200, description = "Same-day events, ascending"),
        (status = 404, description = "Employee not in this company")
    ),
    security(("bearer_auth" = [])),
    tag = "Registros"
)]
pub async fn employee_day_records(
    ctx: TenantContext,
    directory: web::Data<TenantDirectory>,
    ledger: web::Data<EventLedger>,
    path: web::Path<String>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, ApiError> {
    let funcionario = directory
        .resolve_employee(&ctx.empresa_id, &path.into_inner())
        .await?;

    let dia = match &query.data {
        Some(s) => parse_data(s)?,
        None => chrono::Local::now().date_naive(),
    };

    let registros = ledger
        .scan_by_employee_day(&ctx.empresa_id, &funcionario.id, dia)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "total": registros.len(),
        "data": registros,
    })))
}

/// Insert Manual Record
///
/// Administrative correction. Retroactive timestamps are fine: the type,
/// when omitted, is derived from the full same-day set, not from insertion
/// order.
#[utoipa::path(
    post,
    path = "/api/registros",
    request_body = ManualRecordReq,
    responses(
        (status = 201, description = "Record inserted"),
        (status = 400, description = "Malformed timestamp"),
        (status = 404, description = "Employee not in this company"),
        (status = 409, description = "An event already exists at this timestamp")
    ),
    security(("bearer_auth" = [])),
    tag = "Registros"
)]
pub async fn insert_manual(
    ctx: TenantContext,
    directory: web::Data<TenantDirectory>,
    ledger: web::Data<EventLedger>,
    payload: web::Json<ManualRecordReq>,
) -> Result<HttpResponse, ApiError> {
    let quando = parse_data_hora(&payload.data_hora)?;

    let funcionario = directory
        .resolve_employee(&ctx.empresa_id, &payload.funcionario_id)
        .await?;

    // A pinned type appends directly; an omitted one goes through the
    // toggle, exactly like an automatic event.
    let registro = match payload.tipo {
        Some(tipo) => ledger.append(&funcionario, quando, tipo).await?,
        None => ledger.append_toggled(&funcionario, quando).await?,
    };

    tracing::info!(
        registro_id = %registro.registro_id,
        funcionario_id = %funcionario.id,
        tipo = %registro.tipo,
        "Manual record inserted"
    );

    Ok(HttpResponse::Created().json(registro))
}

/// Delete Record
#[utoipa::path(
    delete,
    path = "/api/registros/{registro_id}",
    params(("registro_id", Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "No such record in this company")
    ),
    security(("bearer_auth" = [])),
    tag = "Registros"
)]
pub async fn delete_record(
    ctx: TenantContext,
    ledger: web::Data<EventLedger>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let registro_id = path.into_inner();

    ledger
        .delete_by_record_id(&ctx.empresa_id, &registro_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Record deleted" })))
}

/// List Records
#[utoipa::path(
    get,
    path = "/api/registros",
    params(
        ("de", Query, description = "Start date, inclusive"),
        ("ate", Query, description = "End date, inclusive"),
        ("funcionario_ids", Query, description = "Comma-separated employee ids")
    ),
    responses((status = 200, description = "Scoped record list")),
    security(("bearer_auth" = [])),
    tag = "Registros"
)]
pub async fn list_records(
    ctx: TenantContext,
    ledger: web::Data<EventLedger>,
    query: web::Query<RecordQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = build_filter(&ctx.empresa_id, &query)?;
    let registros = ledger.scan_by_company(&filter).await?;

    Ok(HttpResponse::Ok().json(json!({
        "total": registros.len(),
        "data": registros,
    })))
}

/// Worked Hours Report
///
/// Recomputed from raw records on every call; there is no persisted
/// aggregate to go stale after a manual insert or delete.
#[utoipa::path(
    get,
    path = "/api/relatorio/horas",
    params(
        ("de", Query, description = "Start date, inclusive"),
        ("ate", Query, description = "End date, inclusive"),
        ("funcionario_ids", Query, description = "Comma-separated employee ids")
    ),
    responses((status = 200, description = "Per-employee worked hours", body = [WorkedHours])),
    security(("bearer_auth" = [])),
    tag = "Registros"
)]
pub async fn worked_hours(
    ctx: TenantContext,
    ledger: web::Data<EventLedger>,
    directory: web::Data<TenantDirectory>,
    query: web::Query<RecordQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = build_filter(&ctx.empresa_id, &query)?;
    let registros = ledger.scan_by_company(&filter).await?;
    let totals = reconcile(&registros);

    let funcionarios = directory.list_employees(&ctx.empresa_id, None).await?;
    let nomes: HashMap<&str, &str> = funcionarios
        .iter()
        .map(|f| (f.id.as_str(), f.nome.as_str()))
        .collect();

    let data = summarize_hours(&totals, &nomes);

    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(
        de: Option<&str>,
        ate: Option<&str>,
        funcionario_ids: Option<&str>,
    ) -> RecordQuery {
        RecordQuery {
            de: de.map(str::to_string),
            ate: ate.map(str::to_string),
            funcionario_ids: funcionario_ids.map(str::to_string),
        }
    }

    #[test]
    fn filter_accepts_both_date_formats() {
        let f = build_filter("empresa-a", &query(Some("2024-01-10"), Some("31-01-2024"), None))
            .unwrap();
        assert_eq!(f.de.unwrap().to_string(), "2024-01-10");
        assert_eq!(f.ate.unwrap().to_string(), "2024-01-31");
    }

    #[test]
    fn filter_rejects_garbage_dates() {
        assert!(build_filter("empresa-a", &query(Some("soon"), None, None)).is_err());
    }

    #[test]
    fn employee_ids_are_split_and_trimmed() {
        let f = build_filter("empresa-a", &query(None, None, Some("e1, e2 ,e3"))).unwrap();
        assert_eq!(
            f.funcionario_ids.unwrap(),
            vec!["e1".to_string(), "e2".to_string(), "e3".to_string()]
        );
    }

    #[test]
    fn present_but_empty_id_list_stays_empty() {
        let f = build_filter("empresa-a", &query(None, None, Some(""))).unwrap();
        assert_eq!(f.funcionario_ids.unwrap().len(), 0);
    }

    #[test]
    fn absent_id_list_means_no_restriction() {
        let f = build_filter("empresa-a", &query(None, None, None)).unwrap();
        assert!(f.funcionario_ids.is_none());
    }

    #[test]
    fn report_uses_sentinel_for_deleted_employees() {
        let mut totals = BTreeMap::new();
        totals.insert("maria-1".to_string(), 3600_i64);
        totals.insert("apagado-9".to_string(), 1800_i64);

        let nomes = HashMap::from([("maria-1", "Maria Silva")]);

        let linhas = summarize_hours(&totals, &nomes);
        assert_eq!(linhas.len(), 2);

        assert_eq!(linhas[0].funcionario_id, "apagado-9");
        assert_eq!(linhas[0].nome, "Desconhecido");
        assert_eq!(linhas[0].total, "00:30:00");

        assert_eq!(linhas[1].nome, "Maria Silva");
        assert_eq!(linhas[1].total, "01:00:00");
    }
}
