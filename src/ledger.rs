use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Executor, MySql, MySqlPool};
use uuid::Uuid;

use crate::core::filter::RecordFilter;
use crate::core::toggle;
use crate::error::ApiError;
use crate::model::funcionario::Employee;
use crate::model::registro::{AttendanceRecord, EventType, format_data_hora};

const RECORD_COLUMNS: &str =
    "registro_id, funcionario_id, data_hora, tipo, empresa_id, empresa_nome";

/// Row-level operations behind the ledger. The MySQL implementation owns
/// the SQL; `Ledger` owns record construction, the toggle decision and
/// the two-step delete protocol.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts one row. A collision on the (funcionario_id, data_hora)
    /// composite key surfaces as `DuplicateKey`.
    async fn insert(&self, registro: &AttendanceRecord) -> Result<(), ApiError>;

    /// Inserts the record `build` derives from the employee's same-day
    /// rows, atomically with respect to concurrent callers for the same
    /// employee.
    async fn insert_for_day(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
        dia: NaiveDate,
        build: &(dyn for<'a> Fn(&'a [AttendanceRecord]) -> AttendanceRecord + Send + Sync),
    ) -> Result<AttendanceRecord, ApiError>;

    async fn by_employee_day(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
        dia: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, ApiError>;

    async fn by_filter(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, ApiError>;

    /// Storage key of the record carrying this registro_id, scoped to the
    /// tenant. A cross-tenant id answers `None`.
    async fn find_scoped(
        &self,
        empresa_id: &str,
        registro_id: &str,
    ) -> Result<Option<(String, String)>, ApiError>;

    async fn delete_by_key(&self, funcionario_id: &str, data_hora: &str)
    -> Result<u64, ApiError>;
}

/// Append-only store of attendance events. Records are immutable once
/// written; the only mutation is administrative deletion by registro_id.
#[derive(Clone)]
pub struct Ledger<S> {
    store: S,
}

pub type EventLedger = Ledger<MySqlRecordStore>;

impl EventLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Ledger {
            store: MySqlRecordStore { pool },
        }
    }
}

impl<S: RecordStore> Ledger<S> {
    fn make_record(
        funcionario: &Employee,
        quando: NaiveDateTime,
        tipo: EventType,
    ) -> AttendanceRecord {
        AttendanceRecord {
            registro_id: Uuid::new_v4().to_string(),
            funcionario_id: funcionario.id.clone(),
            data_hora: format_data_hora(quando),
            tipo,
            empresa_id: funcionario.empresa_id.clone(),
            empresa_nome: funcionario.empresa_nome.clone(),
        }
    }

    /// Appends one record with a caller-pinned type. A collision on the
    /// (funcionario_id, data_hora) composite key surfaces as
    /// `DuplicateKey`, giving callers a safe retry signal instead of a
    /// silent double write.
    pub async fn append(
        &self,
        funcionario: &Employee,
        quando: NaiveDateTime,
        tipo: EventType,
    ) -> Result<AttendanceRecord, ApiError> {
        let registro = Self::make_record(funcionario, quando, tipo);
        self.store.insert(&registro).await?;
        Ok(registro)
    }

    /// Appends a record whose type is decided by the shift toggle over
    /// the full same-day set. The store serializes concurrent submissions
    /// for the same employee, so two of them cannot both observe the same
    /// "last event" and write two consecutive entradas; the composite key
    /// remains the backstop for same-second duplicates.
    pub async fn append_toggled(
        &self,
        funcionario: &Employee,
        quando: NaiveDateTime,
    ) -> Result<AttendanceRecord, ApiError> {
        self.store
            .insert_for_day(
                &funcionario.empresa_id,
                &funcionario.id,
                quando.date(),
                &|registros_do_dia| {
                    Self::make_record(funcionario, quando, toggle::next_event_type(registros_do_dia))
                },
            )
            .await
    }

    /// All of the employee's events for one calendar day, ascending.
    pub async fn scan_by_employee_day(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
        dia: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        self.store.by_employee_day(empresa_id, funcionario_id, dia).await
    }

    /// Tenant-scoped scan with optional date bounds and employee set; the
    /// filter compiles to a conjunction, so the tenant predicate cannot
    /// be bypassed.
    pub async fn scan_by_company(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        self.store.by_filter(filter).await
    }

    /// Deletes one record by registro_id. The record is looked up first
    /// (registro_id is not the storage key) and removed through the
    /// composite key; a second deletion of the same id yields `NotFound`.
    pub async fn delete_by_record_id(
        &self,
        empresa_id: &str,
        registro_id: &str,
    ) -> Result<(), ApiError> {
        let found = self.store.find_scoped(empresa_id, registro_id).await?;
        let (funcionario_id, data_hora) = found.ok_or(ApiError::NotFound)?;

        let affected = self.store.delete_by_key(&funcionario_id, &data_hora).await?;
        if affected == 0 {
            // lost a race with a concurrent deletion
            return Err(ApiError::NotFound);
        }

        tracing::info!(registro_id, funcionario_id = %funcionario_id, "Attendance record deleted");
        Ok(())
    }
}

#[derive(Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

async fn insert_row<'e, E>(executor: E, registro: &AttendanceRecord) -> Result<(), ApiError>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO registros_ponto
        (registro_id, funcionario_id, data_hora, tipo, empresa_id, empresa_nome)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&registro.registro_id)
    .bind(&registro.funcionario_id)
    .bind(&registro.data_hora)
    .bind(registro.tipo.to_string())
    .bind(&registro.empresa_id)
    .bind(&registro.empresa_nome)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn insert(&self, registro: &AttendanceRecord) -> Result<(), ApiError> {
        insert_row(&self.pool, registro).await
    }

    /// Locks the employee's rows for the day (`SELECT ... FOR UPDATE`) in
    /// an InnoDB transaction, so the decision and the write happen under
    /// one per-employee lock.
    async fn insert_for_day(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
        dia: NaiveDate,
        build: &(dyn for<'a> Fn(&'a [AttendanceRecord]) -> AttendanceRecord + Send + Sync),
    ) -> Result<AttendanceRecord, ApiError> {
        let mut tx = self.pool.begin().await?;

        let registros_do_dia: Vec<AttendanceRecord> = sqlx::query_as(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM registros_ponto
            WHERE funcionario_id = ? AND empresa_id = ? AND data_hora LIKE ?
            ORDER BY data_hora ASC
            FOR UPDATE
            "#
        ))
        .bind(funcionario_id)
        .bind(empresa_id)
        .bind(day_prefix(dia))
        .fetch_all(&mut *tx)
        .await?;

        let registro = build(&registros_do_dia);
        insert_row(&mut *tx, &registro).await?;

        tx.commit().await?;

        Ok(registro)
    }

    async fn by_employee_day(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
        dia: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        let registros = sqlx::query_as(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM registros_ponto
            WHERE funcionario_id = ? AND empresa_id = ? AND data_hora LIKE ?
            ORDER BY data_hora ASC
            "#
        ))
        .bind(funcionario_id)
        .bind(empresa_id)
        .bind(day_prefix(dia))
        .fetch_all(&self.pool)
        .await?;

        Ok(registros)
    }

    async fn by_filter(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, ApiError> {
        let (where_clause, bindings) = filter.to_where();

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM registros_ponto {} ORDER BY funcionario_id, data_hora ASC",
            where_clause
        );
        tracing::debug!(sql = %sql, bindings = ?bindings, "Scanning attendance records");

        let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql);
        for b in bindings {
            query = query.bind(b);
        }

        let registros = query.fetch_all(&self.pool).await?;
        Ok(registros)
    }

    async fn find_scoped(
        &self,
        empresa_id: &str,
        registro_id: &str,
    ) -> Result<Option<(String, String)>, ApiError> {
        let found = sqlx::query_as(
            r#"
            SELECT funcionario_id, data_hora
            FROM registros_ponto
            WHERE registro_id = ? AND empresa_id = ?
            "#,
        )
        .bind(registro_id)
        .bind(empresa_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found)
    }

    async fn delete_by_key(
        &self,
        funcionario_id: &str,
        data_hora: &str,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"DELETE FROM registros_ponto WHERE funcionario_id = ? AND data_hora = ?"#,
        )
        .bind(funcionario_id)
        .bind(data_hora)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn day_prefix(dia: NaiveDate) -> String {
    format!("{}%", dia.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::registro::parse_data_hora;
    use std::sync::Mutex;

    /// Same contract as the MySQL store: composite-key uniqueness, tenant
    /// scoping, day windows. Lets the ledger protocol run without a
    /// database.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<AttendanceRecord>>,
    }

    impl MemoryStore {
        fn push_unique(
            rows: &mut Vec<AttendanceRecord>,
            registro: &AttendanceRecord,
        ) -> Result<(), ApiError> {
            let colide = rows.iter().any(|r| {
                r.funcionario_id == registro.funcionario_id && r.data_hora == registro.data_hora
            });
            if colide {
                return Err(ApiError::DuplicateKey);
            }
            rows.push(registro.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn insert(&self, registro: &AttendanceRecord) -> Result<(), ApiError> {
            Self::push_unique(&mut self.rows.lock().unwrap(), registro)
        }

        async fn insert_for_day(
            &self,
            empresa_id: &str,
            funcionario_id: &str,
            dia: NaiveDate,
            build: &(dyn for<'a> Fn(&'a [AttendanceRecord]) -> AttendanceRecord + Send + Sync),
        ) -> Result<AttendanceRecord, ApiError> {
            // one lock for the read and the write, like the transaction
            let mut rows = self.rows.lock().unwrap();
            let prefix = dia.format("%Y-%m-%d").to_string();

            let mut do_dia: Vec<AttendanceRecord> = rows
                .iter()
                .filter(|r| {
                    r.empresa_id == empresa_id
                        && r.funcionario_id == funcionario_id
                        && r.data_hora.starts_with(&prefix)
                })
                .cloned()
                .collect();
            do_dia.sort_by(|a, b| a.data_hora.cmp(&b.data_hora));

            let registro = build(&do_dia);
            Self::push_unique(&mut rows, &registro)?;
            Ok(registro)
        }

        async fn by_employee_day(
            &self,
            empresa_id: &str,
            funcionario_id: &str,
            dia: NaiveDate,
        ) -> Result<Vec<AttendanceRecord>, ApiError> {
            let prefix = dia.format("%Y-%m-%d").to_string();
            let mut registros: Vec<AttendanceRecord> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.empresa_id == empresa_id
                        && r.funcionario_id == funcionario_id
                        && r.data_hora.starts_with(&prefix)
                })
                .cloned()
                .collect();
            registros.sort_by(|a, b| a.data_hora.cmp(&b.data_hora));
            Ok(registros)
        }

        async fn by_filter(
            &self,
            filter: &RecordFilter,
        ) -> Result<Vec<AttendanceRecord>, ApiError> {
            let de = filter.de.map(|d| format!("{} 00:00:00", d.format("%Y-%m-%d")));
            let ate = filter.ate.map(|d| format!("{} 23:59:59", d.format("%Y-%m-%d")));

            let mut registros: Vec<AttendanceRecord> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.empresa_id == filter.empresa_id)
                .filter(|r| {
                    filter
                        .funcionario_ids
                        .as_ref()
                        .map_or(true, |ids| ids.contains(&r.funcionario_id))
                })
                .filter(|r| de.as_ref().map_or(true, |lo| r.data_hora >= *lo))
                .filter(|r| ate.as_ref().map_or(true, |hi| r.data_hora <= *hi))
                .cloned()
                .collect();
            registros.sort_by(|a, b| {
                (a.funcionario_id.as_str(), a.data_hora.as_str())
                    .cmp(&(b.funcionario_id.as_str(), b.data_hora.as_str()))
            });
            Ok(registros)
        }

        async fn find_scoped(
            &self,
            empresa_id: &str,
            registro_id: &str,
        ) -> Result<Option<(String, String)>, ApiError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.registro_id == registro_id && r.empresa_id == empresa_id)
                .map(|r| (r.funcionario_id.clone(), r.data_hora.clone())))
        }

        async fn delete_by_key(
            &self,
            funcionario_id: &str,
            data_hora: &str,
        ) -> Result<u64, ApiError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| !(r.funcionario_id == funcionario_id && r.data_hora == data_hora));
            Ok((before - rows.len()) as u64)
        }
    }

    fn employee(id: &str, empresa_id: &str) -> Employee {
        Employee {
            id: id.to_string(),
            nome: "Maria".to_string(),
            cargo: "Analista".to_string(),
            foto_url: "u".to_string(),
            face_id: "f".to_string(),
            empresa_id: empresa_id.to_string(),
            empresa_nome: "Empresa".to_string(),
            data_cadastro: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        }
    }

    fn ledger() -> Ledger<MemoryStore> {
        Ledger {
            store: MemoryStore::default(),
        }
    }

    #[test]
    fn day_prefix_matches_storage_format() {
        let dia = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(day_prefix(dia), "2024-01-10%");
    }

    #[test]
    fn records_are_built_in_storage_format() {
        let funcionario = employee("e1", "empresa-a");
        let quando = parse_data_hora("2024-01-10 08:00:00").unwrap();

        let registro =
            Ledger::<MemoryStore>::make_record(&funcionario, quando, EventType::Entrada);
        assert_eq!(registro.data_hora, "2024-01-10 08:00:00");
        assert_eq!(registro.empresa_id, "empresa-a");
        assert_eq!(registro.tipo, EventType::Entrada);
        assert!(!registro.registro_id.is_empty());
    }

    #[actix_web::test]
    async fn appended_event_comes_back_from_scans_exactly_once() {
        let ledger = ledger();
        let maria = employee("maria-1", "empresa-a");
        let quando = parse_data_hora("2024-01-10 08:00:00").unwrap();

        let registro = ledger
            .append(&maria, quando, EventType::Entrada)
            .await
            .unwrap();

        let encontrados = ledger
            .scan_by_company(&RecordFilter::for_company("empresa-a"))
            .await
            .unwrap();
        assert_eq!(encontrados.len(), 1);
        assert_eq!(encontrados[0].registro_id, registro.registro_id);

        let do_dia = ledger
            .scan_by_employee_day("empresa-a", "maria-1", quando.date())
            .await
            .unwrap();
        assert_eq!(do_dia.len(), 1);
        assert_eq!(do_dia[0].registro_id, registro.registro_id);
    }

    #[actix_web::test]
    async fn foreign_tenant_sees_and_touches_nothing() {
        let ledger = ledger();
        let maria = employee("maria-1", "empresa-a");
        let quando = parse_data_hora("2024-01-10 08:00:00").unwrap();
        let registro = ledger
            .append(&maria, quando, EventType::Entrada)
            .await
            .unwrap();

        let alheios = ledger
            .scan_by_company(&RecordFilter::for_company("empresa-b"))
            .await
            .unwrap();
        assert!(alheios.is_empty());

        let err = ledger
            .delete_by_record_id("empresa-b", &registro.registro_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        // untouched for the owner
        let proprios = ledger
            .scan_by_company(&RecordFilter::for_company("empresa-a"))
            .await
            .unwrap();
        assert_eq!(proprios.len(), 1);
    }

    #[actix_web::test]
    async fn deleting_the_same_record_twice_yields_not_found() {
        let ledger = ledger();
        let maria = employee("maria-1", "empresa-a");
        let quando = parse_data_hora("2024-01-10 08:00:00").unwrap();
        let registro = ledger
            .append(&maria, quando, EventType::Entrada)
            .await
            .unwrap();

        ledger
            .delete_by_record_id("empresa-a", &registro.registro_id)
            .await
            .unwrap();

        let err = ledger
            .delete_by_record_id("empresa-a", &registro.registro_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[actix_web::test]
    async fn same_second_double_write_collides() {
        let ledger = ledger();
        let maria = employee("maria-1", "empresa-a");
        let quando = parse_data_hora("2024-01-10 08:00:00").unwrap();

        ledger.append_toggled(&maria, quando).await.unwrap();
        let err = ledger.append_toggled(&maria, quando).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateKey));
    }

    #[actix_web::test]
    async fn toggled_appends_alternate_through_the_store() {
        let ledger = ledger();
        let maria = employee("maria-1", "empresa-a");

        let primeiro = ledger
            .append_toggled(&maria, parse_data_hora("2024-01-10 08:00:00").unwrap())
            .await
            .unwrap();
        let segundo = ledger
            .append_toggled(&maria, parse_data_hora("2024-01-10 12:00:00").unwrap())
            .await
            .unwrap();
        let terceiro = ledger
            .append_toggled(&maria, parse_data_hora("2024-01-10 13:00:00").unwrap())
            .await
            .unwrap();

        assert_eq!(primeiro.tipo, EventType::Entrada);
        assert_eq!(segundo.tipo, EventType::Saida);
        assert_eq!(terceiro.tipo, EventType::Entrada);

        // a new day starts the cycle over
        let quarto = ledger
            .append_toggled(&maria, parse_data_hora("2024-01-11 08:00:00").unwrap())
            .await
            .unwrap();
        assert_eq!(quarto.tipo, EventType::Entrada);
    }
}
