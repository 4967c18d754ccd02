use std::collections::HashSet;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;

use crate::config::Config;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct IndexedFace {
    pub face_id: String,
    /// The employee id the face was enrolled under.
    pub external_id: String,
}

/// Face-recognition collaborator. Trusted to answer an identity or
/// no-match; quality and liveness are its problem, not ours.
#[async_trait]
pub trait FaceIndex: Send + Sync {
    /// Maps a photo to the enrolled employee id, or `None` below the
    /// match threshold.
    async fn identify(&self, foto: &[u8]) -> Result<Option<String>, ApiError>;

    /// Enrolls a photo under an employee id and returns the face_id.
    async fn enroll(&self, foto: &[u8], funcionario_id: &str) -> Result<String, ApiError>;

    async fn deindex(&self, face_id: &str) -> Result<(), ApiError>;

    async fn list_faces(&self) -> Result<Vec<IndexedFace>, ApiError>;
}

/// JSON client for the recognition service.
pub struct HttpFaceIndex {
    client: reqwest::Client,
    base_url: String,
    threshold: f32,
}

#[derive(Deserialize)]
struct IdentifyResponse {
    funcionario_id: Option<String>,
}

#[derive(Deserialize)]
struct EnrollResponse {
    face_id: String,
}

#[derive(Deserialize)]
struct FaceEntry {
    face_id: String,
    external_id: String,
}

impl HttpFaceIndex {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.face_api_url.trim_end_matches('/').to_string(),
            threshold: config.face_match_threshold,
        }
    }

    fn upstream(e: reqwest::Error) -> ApiError {
        ApiError::Upstream(format!("face service: {}", e))
    }

    fn bad_status(status: reqwest::StatusCode) -> ApiError {
        ApiError::Upstream(format!("face service returned {}", status))
    }
}

#[async_trait]
impl FaceIndex for HttpFaceIndex {
    async fn identify(&self, foto: &[u8]) -> Result<Option<String>, ApiError> {
        let resp = self
            .client
            .post(format!("{}/identify", self.base_url))
            .json(&json!({
                "foto": BASE64.encode(foto),
                "threshold": self.threshold,
            }))
            .send()
            .await
            .map_err(Self::upstream)?;

        if !resp.status().is_success() {
            return Err(Self::bad_status(resp.status()));
        }

        let body: IdentifyResponse = resp.json().await.map_err(Self::upstream)?;
        Ok(body.funcionario_id)
    }

    async fn enroll(&self, foto: &[u8], funcionario_id: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .post(format!("{}/faces", self.base_url))
            .json(&json!({
                "foto": BASE64.encode(foto),
                "external_id": funcionario_id,
            }))
            .send()
            .await
            .map_err(Self::upstream)?;

        if !resp.status().is_success() {
            return Err(Self::bad_status(resp.status()));
        }

        let body: EnrollResponse = resp.json().await.map_err(Self::upstream)?;
        Ok(body.face_id)
    }

    async fn deindex(&self, face_id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(format!("{}/faces/{}", self.base_url, face_id))
            .send()
            .await
            .map_err(Self::upstream)?;

        if !resp.status().is_success() {
            return Err(Self::bad_status(resp.status()));
        }

        Ok(())
    }

    async fn list_faces(&self) -> Result<Vec<IndexedFace>, ApiError> {
        let resp = self
            .client
            .get(format!("{}/faces", self.base_url))
            .send()
            .await
            .map_err(Self::upstream)?;

        if !resp.status().is_success() {
            return Err(Self::bad_status(resp.status()));
        }

        let body: Vec<FaceEntry> = resp.json().await.map_err(Self::upstream)?;
        Ok(body
            .into_iter()
            .map(|f| IndexedFace {
                face_id: f.face_id,
                external_id: f.external_id,
            })
            .collect())
    }
}

/// Deindexes faces whose external id matches no known employee. Individual
/// deindex failures are logged and skipped. Returns how many were removed.
pub async fn deindex_orphans(
    known_ids: &HashSet<String>,
    faces: &dyn FaceIndex,
) -> Result<usize, ApiError> {
    let mut removed = 0usize;

    for face in faces.list_faces().await? {
        if known_ids.contains(&face.external_id) {
            continue;
        }

        match faces.deindex(&face.face_id).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    face_id = %face.face_id,
                    external_id = %face.external_id,
                    "Failed to deindex orphan face"
                );
            }
        }
    }

    Ok(removed)
}

/// Startup sweep: employees deleted while the recognition service was
/// unreachable leave faces behind; remove them here.
pub async fn sweep_orphan_faces(pool: &MySqlPool, faces: &dyn FaceIndex) -> anyhow::Result<usize> {
    let mut known_ids = HashSet::new();

    let mut stream = sqlx::query_as::<_, (String,)>("SELECT id FROM funcionarios").fetch(pool);
    while let Some(row) = stream.next().await {
        let (id,) = row?;
        known_ids.insert(id);
    }

    let removed = deindex_orphans(&known_ids, faces).await?;
    tracing::info!(removed, known = known_ids.len(), "Face sweep complete");
    Ok(removed)
}
