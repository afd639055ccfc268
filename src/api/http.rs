//! Implements `ReconciliationApi` over HTTP with `reqwest`.

use crate::api::ReconciliationApi;
use crate::ingest::FileKind;
use crate::model::{
    ExportFormat, MatchesResponse, ReconcileResponse, RulesConfig, UploadResponse,
    ValidateAction, ValidateResponse,
};
use crate::{utils, Config, Result};
use anyhow::{bail, Context};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, trace, warn};
use url::Url;

const SESSION_EXPIRED: &str = "Session expirée. Veuillez vous reconnecter.";

/// A client for the reconciliation service. Built once from `Config` and reused for every call.
pub(crate) struct HttpApi {
    base_url: Url,
    http: reqwest::Client,
    token: Option<String>,
    token_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ReconcileRequest<'a> {
    bank_file: &'a str,
    accounting_file: &'a str,
    rules: &'a RulesConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest<'a> {
    action: ValidateAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_code: Option<&'a str>,
}

impl HttpApi {
    pub(crate) async fn new(config: &Config) -> Result<Self> {
        let mut base_url = config.api_base_url()?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Unable to build the HTTP client")?;
        let token = config.token().await?;
        if token.is_none() {
            debug!("No token found, requests will be sent without authorization");
        }
        Ok(Self {
            base_url,
            http,
            token,
            token_path: config.token_path(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Unable to build the URL for '{path}'"))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and decodes a successful JSON answer. `fallback` is the error message
    /// used when the service gives no `detail`.
    async fn send<T>(&mut self, builder: RequestBuilder, fallback: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = self
            .authorize(builder)
            .build()
            .context("Unable to build the request")?;
        trace!("{} {}", request.method(), request.url());
        let url = request.url().clone();
        let response = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("Unable to reach the reconciliation service at {url}"))?;
        self.handle(response, fallback).await
    }

    async fn handle<T>(&mut self, response: Response, fallback: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .context("Unable to decode the response of the reconciliation service");
        }

        if status == StatusCode::UNAUTHORIZED {
            self.forget_token().await?;
            bail!(SESSION_EXPIRED);
        }

        let body = response.json::<Value>().await.ok();
        let message = error_detail(body.as_ref(), fallback);
        bail!("{message} (HTTP {})", status.as_u16())
    }

    async fn forget_token(&mut self) -> Result<()> {
        self.token = None;
        if self.token_path.is_file() {
            warn!("Removing the expired token at {}", self.token_path.display());
            utils::remove(&self.token_path).await?;
        }
        Ok(())
    }
}

/// The `detail` field of an error body, or `fallback`.
fn error_detail(body: Option<&Value>, fallback: &str) -> String {
    match body.and_then(|b| b.get("detail")) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(Value::String(_)) => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

#[async_trait::async_trait]
impl ReconciliationApi for HttpApi {
    async fn upload(
        &mut self,
        kind: FileKind,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse> {
        let url = self.endpoint(&format!("api/upload/{kind}"))?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self.http.post(url).multipart(form);
        self.send(builder, "Upload failed").await
    }

    async fn start_reconciliation(
        &mut self,
        bank_upload_id: &str,
        accounting_upload_id: &str,
        rules: &RulesConfig,
    ) -> Result<ReconcileResponse> {
        let url = self.endpoint("api/reconcile")?;
        let body = ReconcileRequest {
            bank_file: bank_upload_id,
            accounting_file: accounting_upload_id,
            rules,
        };
        let builder = self.http.post(url).json(&body);
        self.send(builder, "Reconciliation failed").await
    }

    async fn get_matches(&mut self, job_id: &str, page: u32) -> Result<MatchesResponse> {
        let url = self.endpoint(&format!("api/reconcile/{job_id}/results"))?;
        let builder = self.http.get(url).query(&[("page", page)]);
        self.send(builder, "Failed to fetch matches").await
    }

    async fn validate_match(
        &mut self,
        job_id: &str,
        match_id: &str,
        action: ValidateAction,
        account_code: Option<&str>,
    ) -> Result<ValidateResponse> {
        let url = self.endpoint(&format!(
            "api/reconcile/{job_id}/matches/{match_id}/validate"
        ))?;
        let body = ValidateRequest {
            action,
            account_code,
        };
        let builder = self.http.post(url).json(&body);
        self.send(builder, "Validation failed").await
    }

    async fn export_results(&mut self, job_id: &str, format: ExportFormat) -> Result<Value> {
        let url = self.endpoint(&format!("api/reconcile/{job_id}/export"))?;
        let builder = self.http.get(url).query(&[("format", format.to_string())]);
        self.send(builder, "Export failed").await
    }

    async fn regularization_entries(&mut self, job_id: &str) -> Result<Value> {
        let url = self.endpoint(&format!("api/reconcile/{job_id}/regularization"))?;
        let builder = self.http.get(url);
        self.send(builder, "Failed to fetch regularization entries")
            .await
    }

    async fn list_reconciliations(&mut self) -> Result<Vec<Value>> {
        let url = self.endpoint("api/reconciliations")?;
        let builder = self.http.get(url);
        self.send(builder, "Failed to fetch reconciliations").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one HTTP response and returns the raw request it received.
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn request_body(request: &str) -> &str {
        request
            .split_once("\r\n\r\n")
            .map(|(_, body)| body)
            .unwrap_or("")
    }

    async fn api(dir: &TempDir, url: &str, token: Option<&str>) -> (Config, HttpApi) {
        let config = Config::create(dir.path(), url, token).await.unwrap();
        let api = HttpApi::new(&config).await.unwrap();
        (config, api)
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(Some(&json!({"detail": "Fichier invalide"})), "Upload failed"),
            "Fichier invalide"
        );
        assert_eq!(error_detail(Some(&json!({})), "Upload failed"), "Upload failed");
        assert_eq!(error_detail(None, "Export failed"), "Export failed");
        assert_eq!(
            error_detail(Some(&json!({"detail": ""})), "Export failed"),
            "Export failed"
        );
        assert_eq!(
            error_detail(Some(&json!({"detail": [{"msg": "bad"}]})), "x"),
            r#"[{"msg":"bad"}]"#
        );
    }

    #[test]
    fn test_request_bodies() {
        let validate = ValidateRequest {
            action: ValidateAction::Confirm,
            account_code: Some("627"),
        };
        assert_eq!(
            serde_json::to_value(&validate).unwrap(),
            json!({"action": "confirm", "accountCode": "627"})
        );
        let unmatch = ValidateRequest {
            action: ValidateAction::Unmatch,
            account_code: None,
        };
        assert_eq!(
            serde_json::to_value(&unmatch).unwrap(),
            json!({"action": "unmatch"})
        );

        let rules = RulesConfig::default();
        let reconcile = ReconcileRequest {
            bank_file: "b1",
            accounting_file: "a1",
            rules: &rules,
        };
        let value = serde_json::to_value(&reconcile).unwrap();
        assert_eq!(value["bank_file"], "b1");
        assert_eq!(value["accounting_file"], "a1");
        assert_eq!(value["rules"]["max_group_size"], 5);
    }

    #[tokio::test]
    async fn test_endpoint_keeps_base_path() {
        let dir = TempDir::new().unwrap();
        let (_, api) = api(&dir, "https://recon.example.com/v2", None).await;
        assert_eq!(
            api.endpoint("api/reconcile").unwrap().as_str(),
            "https://recon.example.com/v2/api/reconcile"
        );
    }

    #[tokio::test]
    async fn test_list_reconciliations_with_token() {
        let (url, server) = serve_once("200 OK", json!([{"jobId": "j1"}]).to_string()).await;
        let dir = TempDir::new().unwrap();
        let (_, mut api) = api(&dir, &url, Some("secret")).await;

        let list = api.list_reconciliations().await.unwrap();
        assert_eq!(list, vec![json!({"jobId": "j1"})]);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/reconciliations "));
        assert!(request
            .to_lowercase()
            .contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_validate_match_sends_body() {
        let (url, server) = serve_once("200 OK", json!({"ok": true}).to_string()).await;
        let dir = TempDir::new().unwrap();
        let (_, mut api) = api(&dir, &url, None).await;

        let response = api
            .validate_match("j1", "m1", ValidateAction::Confirm, Some("627"))
            .await
            .unwrap();
        assert!(response.ok);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/reconcile/j1/matches/m1/validate "));
        let body: Value = serde_json::from_str(request_body(&request)).unwrap();
        assert_eq!(body, json!({"action": "confirm", "accountCode": "627"}));
    }

    #[tokio::test]
    async fn test_get_matches_sends_page() {
        let body = json!({
            "jobId": "j1",
            "summary": {
                "bankTotal": 0.0, "accountingTotal": 0.0, "matchedCount": 0,
                "suspenseCount": 0, "initialGap": 0.0, "residualGap": 0.0,
                "coverageRatio": 0.0, "openingBalance": 0.0
            },
            "matches": []
        });
        let (url, server) = serve_once("200 OK", body.to_string()).await;
        let dir = TempDir::new().unwrap();
        let (_, mut api) = api(&dir, &url, None).await;

        let response = api.get_matches("j1", 3).await.unwrap();
        assert_eq!(response.job_id, "j1");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/reconcile/j1/results?page=3 "));
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let (url, server) = serve_once(
            "422 Unprocessable Entity",
            json!({"detail": "Colonnes manquantes"}).to_string(),
        )
        .await;
        let dir = TempDir::new().unwrap();
        let (_, mut api) = api(&dir, &url, None).await;

        let err = api
            .upload(FileKind::Bank, "releve.csv", b"date;libelle\n".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Colonnes manquantes (HTTP 422)");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/upload/bank "));
        assert!(request.contains("name=\"file\""));
        assert!(request.contains("filename=\"releve.csv\""));
    }

    #[tokio::test]
    async fn test_fallback_message_without_detail() {
        let (url, server) = serve_once("500 Internal Server Error", "oops".to_string()).await;
        let dir = TempDir::new().unwrap();
        let (_, mut api) = api(&dir, &url, None).await;

        let err = api.regularization_entries("j1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch regularization entries (HTTP 500)"
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_removes_token() {
        let (url, server) = serve_once("401 Unauthorized", "{}".to_string()).await;
        let dir = TempDir::new().unwrap();
        let (config, mut api) = api(&dir, &url, Some("expired")).await;
        assert!(config.token_path().is_file());

        let err = api.export_results("j1", ExportFormat::Pdf).await.unwrap_err();
        assert_eq!(err.to_string(), SESSION_EXPIRED);
        assert!(!config.token_path().exists());
        assert!(api.token.is_none());

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/reconcile/j1/export?format=pdf "));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let (_, mut api) = api(&dir, &format!("http://{addr}"), None).await;
        let err = api.list_reconciliations().await.unwrap_err();
        assert!(err.to_string().contains("Unable to reach"));
    }
}
