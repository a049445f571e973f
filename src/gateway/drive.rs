use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::gateway::DriveGateway;
use crate::models::drive_item::{DriveFile, ListFilters, FOLDER_MIME_TYPE};

const PROVIDER: &str = "drive";
const PAGE_SIZE: usize = 1000;
const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;
const FILE_FIELDS: &str = "id,name,mimeType,parents,createdTime,modifiedTime,size";

/// Google Drive v3 client. Token refresh is handled by the upstream auth
/// layer; this client only carries the current access token.
pub struct HttpDriveGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    created_time: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    files: Vec<ApiFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParentsResponse {
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFolder {
    id: String,
}

impl From<ApiFile> for DriveFile {
    fn from(f: ApiFile) -> Self {
        DriveFile {
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
            size_bytes: f.size.and_then(|s| s.parse::<i64>().ok()),
            parents: f.parents,
            created_time: f.created_time,
            modified_time: f.modified_time,
        }
    }
}

impl HttpDriveGateway {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Send a request, retrying rate-limit and server errors with
    /// exponential backoff.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let mut attempt = 0u32;
        loop {
            let response = build()
                .bearer_auth(&self.access_token)
                .send()
                .await
                .map_err(|e| AppError::external(PROVIDER, None, e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            attempt += 1;
            let retryable = status.as_u16() == 403 || status.as_u16() == 429 || status.is_server_error();
            if retryable && attempt < MAX_RETRIES {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt - 1));
                tracing::warn!(status = status.as_u16(), attempt, delay_ms = delay.as_millis() as u64, "drive request retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external(PROVIDER, Some(status.as_u16()), body));
        }
    }
}

#[async_trait]
impl DriveGateway for HttpDriveGateway {
    async fn list_files(&self, filters: &ListFilters) -> Result<Vec<DriveFile>, AppError> {
        let mut files: Vec<DriveFile> = Vec::new();
        let mut page_token: Option<String> = None;
        let url = format!("{}/files", self.base_url);
        let query = filters
            .mime_type
            .as_deref()
            .map(|mime| format!("mimeType = '{mime}' and trashed = false"))
            .unwrap_or_else(|| "trashed = false".to_string());

        loop {
            let response = self
                .send_with_retry(|| {
                    let mut req = self.client.get(&url).query(&[
                        ("pageSize", PAGE_SIZE.to_string()),
                        ("q", query.clone()),
                        ("fields", format!("nextPageToken, files({FILE_FIELDS})")),
                    ]);
                    if let Some(token) = &page_token {
                        req = req.query(&[("pageToken", token.clone())]);
                    }
                    req
                })
                .await?;

            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| AppError::external(PROVIDER, None, e.to_string()))?;

            files.extend(page.files.into_iter().map(DriveFile::from));

            if let Some(max) = filters.max_results {
                if files.len() >= max {
                    files.truncate(max);
                    break;
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!(count = files.len(), "drive listing complete");
        Ok(files)
    }

    async fn get_parents(&self, file_id: &str) -> Result<Vec<String>, AppError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .send_with_retry(|| self.client.get(&url).query(&[("fields", "parents")]))
            .await?;
        let parents: ParentsResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(PROVIDER, None, e.to_string()))?;
        Ok(parents.parents)
    }

    async fn move_file(
        &self,
        file_id: &str,
        remove_parents: &[String],
        add_parents: &[String],
    ) -> Result<(), AppError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        self.send_with_retry(|| {
            self.client
                .patch(&url)
                .query(&[
                    ("removeParents", remove_parents.join(",")),
                    ("addParents", add_parents.join(",")),
                    ("fields", "id,parents".to_string()),
                ])
                .json(&json!({}))
        })
        .await?;
        tracing::info!(file_id, "drive move complete");
        Ok(())
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, AppError> {
        let url = format!("{}/files", self.base_url);
        let mut body = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent {
            body["parents"] = json!([parent]);
        }
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .query(&[("fields", "id")])
                    .json(&body)
            })
            .await?;
        let folder: CreatedFolder = response
            .json()
            .await
            .map_err(|e| AppError::external(PROVIDER, None, e.to_string()))?;
        tracing::info!(folder_id = %folder.id, name, "drive folder created");
        Ok(folder.id)
    }
}
