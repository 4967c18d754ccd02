use crate::api::attendance::RegistrarPontoReq;
use crate::api::employee::{CreateEmployeeReq, EmployeeQuery, UpdateEmployeeReq};
use crate::api::records::{DayQuery, ManualRecordReq, RecordQuery, WorkedHours};
use crate::auth::handlers::{LoginReq, LoginResponse, RegisterTenantReq};
use crate::model::funcionario::Employee;
use crate::model::registro::{AttendanceRecord, EventType};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ponto Eletrônico API",
        version = "1.0.0",
        description = r#"
## Attendance Ledger & Shift Reconciliation

Multi-tenant time-clock service: photo-based clock events, an append-only
attendance ledger, and worked-hours reports derived fresh from raw
entrada/saida pairs.

### Key Features
- **Ponto** — automatic clock events via face recognition
- **Funcionários** — employee registration with face enrollment
- **Registros** — administrative corrections (insert/delete) under the
  same invariants as automatic events
- **Relatório** — per-employee worked-hours reconciliation

### Security
All tenant-scoped endpoints require a **JWT Bearer token** issued at
login; data never crosses company boundaries.
"#,
    ),
    paths(
        crate::auth::handlers::register_tenant,
        crate::auth::handlers::login,

        crate::api::attendance::registrar_ponto,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::records::employee_day_records,
        crate::api::records::insert_manual,
        crate::api::records::delete_record,
        crate::api::records::list_records,
        crate::api::records::worked_hours
    ),
    components(
        schemas(
            RegisterTenantReq,
            LoginReq,
            LoginResponse,
            RegistrarPontoReq,
            CreateEmployeeReq,
            UpdateEmployeeReq,
            EmployeeQuery,
            Employee,
            ManualRecordReq,
            DayQuery,
            RecordQuery,
            WorkedHours,
            AttendanceRecord,
            EventType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Tenant registration and login"),
        (name = "Ponto", description = "Automatic clock events"),
        (name = "Funcionario", description = "Employee management"),
        (name = "Registros", description = "Ledger corrections and reports"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
