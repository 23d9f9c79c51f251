//! HTTP implementation of the data service contract.

use crate::api::types::{
    ApiError, AuthStatus, CorrelationRequest, CorrelationResponse, ImportResponse,
    StatusResponse, WireRow,
};
use crate::api::Backend;
use crate::core::PairOutcome;
use reqwest::multipart;
use std::path::Path;
use tracing::debug;

/// Allowed import extensions, matched case-insensitively. Checked here and
/// again by the import dialog so a disallowed file never reaches the wire.
pub const IMPORT_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Is this a file the import endpoint accepts?
pub fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMPORT_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Backend reached over HTTP, relative to a base URL so sub-path
/// deployments (`https://host/epsilon/`) work unchanged.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trendtui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { client, base_url })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn post_for_status(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        debug!("POST {endpoint}");
        let mut request = self.client.post(self.url(endpoint));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        // The error envelope carries the useful message; read it before
        // turning a non-2xx status into a transport error.
        match response.json::<StatusResponse>().await {
            Ok(status) => status.into_result(),
            Err(e) => Err(ApiError::Http(e)),
        }
    }
}

impl Backend for HttpBackend {
    async fn fetch_rows(&self) -> Result<Vec<WireRow>, ApiError> {
        debug!("GET get_data");
        let rows = self
            .client
            .get(self.url("get_data"))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<WireRow>>()
            .await?;
        Ok(rows)
    }

    async fn add_row(&self, row: WireRow) -> Result<(), ApiError> {
        self.post_for_status("add_row", Some(serde_json::Value::Object(row)))
            .await
    }

    async fn replace_data(&self, rows: Vec<WireRow>) -> Result<(), ApiError> {
        let body = serde_json::Value::Array(
            rows.into_iter().map(serde_json::Value::Object).collect(),
        );
        self.post_for_status("replace_data", Some(body)).await
    }

    async fn clear_data(&self) -> Result<(), ApiError> {
        self.post_for_status("clear_data", None).await
    }

    async fn reset_table(&self) -> Result<(), ApiError> {
        self.post_for_status("reset_table", None).await
    }

    async fn import_datafile(&self, path: &Path) -> Result<ImportResponse, ApiError> {
        debug!("POST import_datafile: {}", path.display());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::Rejected(format!("could not read '{}': {e}", path.display()))
        })?;
        let part = multipart::Part::bytes(bytes).file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("import_datafile"))
            .multipart(form)
            .send()
            .await?
            .json::<ImportResponse>()
            .await?;
        Ok(response)
    }

    async fn correlation(
        &self,
        request: CorrelationRequest,
    ) -> Result<PairOutcome, ApiError> {
        debug!(
            "POST calculate_correlation: {} vs {}",
            request.x_axis, request.y_axis
        );
        let response = self
            .client
            .post(self.url("calculate_correlation"))
            .json(&request)
            .send()
            .await?
            .json::<CorrelationResponse>()
            .await?;

        if let Some(error) = response.error {
            return Ok(PairOutcome::Failed(error));
        }
        match (response.correlation, response.interpretation) {
            (Some(coefficient), Some(interpretation)) => Ok(PairOutcome::Computed {
                coefficient,
                p_value: response.p_value,
                interpretation,
            }),
            _ => Err(ApiError::Malformed(
                "correlation response carries neither a result nor an error".to_string(),
            )),
        }
    }

    async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        let status = self
            .client
            .get(self.url("auth-status"))
            .send()
            .await?
            .error_for_status()?
            .json::<AuthStatus>()
            .await?;
        Ok(status)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.client
            .post(self.url("logout"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
