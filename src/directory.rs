use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::error::ApiError;
use crate::model::funcionario::Employee;

const EMPLOYEE_COLUMNS: &str =
    "id, nome, cargo, foto_url, face_id, empresa_id, empresa_nome, data_cadastro";

/// Lookups behind the directory. Every query takes the tenant id; rows
/// from other tenants must never come back.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn find(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
    ) -> Result<Option<Employee>, ApiError>;

    async fn list(
        &self,
        empresa_id: &str,
        nome: Option<&str>,
    ) -> Result<Vec<Employee>, ApiError>;
}

/// Read-only, tenant-scoped view over employees. A cross-tenant id
/// answers exactly like an absent one.
#[derive(Clone)]
pub struct Directory<S> {
    store: S,
}

pub type TenantDirectory = Directory<MySqlEmployeeStore>;

impl TenantDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Directory {
            store: MySqlEmployeeStore { pool },
        }
    }
}

impl<S: EmployeeStore> Directory<S> {
    pub async fn resolve_employee(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
    ) -> Result<Employee, ApiError> {
        self.store
            .find(empresa_id, funcionario_id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    pub async fn list_employees(
        &self,
        empresa_id: &str,
        nome: Option<&str>,
    ) -> Result<Vec<Employee>, ApiError> {
        self.store.list(empresa_id, nome).await
    }
}

#[derive(Clone)]
pub struct MySqlEmployeeStore {
    pool: MySqlPool,
}

#[async_trait]
impl EmployeeStore for MySqlEmployeeStore {
    async fn find(
        &self,
        empresa_id: &str,
        funcionario_id: &str,
    ) -> Result<Option<Employee>, ApiError> {
        let funcionario = sqlx::query_as::<_, Employee>(&format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS}
            FROM funcionarios
            WHERE id = ? AND empresa_id = ?
            "#
        ))
        .bind(funcionario_id)
        .bind(empresa_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(funcionario)
    }

    async fn list(
        &self,
        empresa_id: &str,
        nome: Option<&str>,
    ) -> Result<Vec<Employee>, ApiError> {
        let mut conditions = vec!["empresa_id = ?"];
        let mut bindings = vec![empresa_id.to_string()];

        if let Some(nome) = nome {
            conditions.push("nome LIKE ?");
            bindings.push(format!("%{}%", nome));
        }

        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM funcionarios WHERE {} ORDER BY nome ASC",
            conditions.join(" AND ")
        );

        let mut query = sqlx::query_as::<_, Employee>(&sql);
        for b in bindings {
            query = query.bind(b);
        }

        let funcionarios = query.fetch_all(&self.pool).await?;
        Ok(funcionarios)
    }
}
