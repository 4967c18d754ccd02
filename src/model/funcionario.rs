use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "mariasilva-9f3b21aa",
        "nome": "Maria Silva",
        "cargo": "Analista",
        "foto_url": "https://fotos.example.com/mariasilva-9f3b21aa.jpg",
        "face_id": "c4f7a2d0-1b9e-4f6c-8a3d-0e5b7c1f2a9d",
        "empresa_id": "e2b7c9d1-5a4f-4e8b-9c3a-1d6f8e0a2b4c",
        "empresa_nome": "Acme Ltda",
        "data_cadastro": "2024-01-05"
    })
)]
pub struct Employee {
    pub id: String,
    pub nome: String,
    pub cargo: String,
    /// Opaque pointer into the photo store.
    pub foto_url: String,
    /// Opaque pointer into the face index.
    pub face_id: String,
    pub empresa_id: String,
    pub empresa_nome: String,
    pub data_cadastro: NaiveDate,
}

/// Employee ids double as the external id in the face index, so they are
/// generated once at registration: name slug plus a random suffix.
pub fn new_employee_id(nome: &str) -> String {
    let slug: String = nome
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let slug = if slug.is_empty() {
        "funcionario"
    } else {
        slug.as_str()
    };

    let suffix = Uuid::new_v4().to_string();
    let suffix = suffix.split('-').next().unwrap_or("00000000");

    format!("{}-{}", slug, suffix)
}
