//! HTTP adapters for the field-service API.
//!
//! `RemoteActionClient` turns queued payloads into form posts against
//! `{api}/actions/{resource}/{operation}`; `RemotePhotoUploader` sends
//! offline photos as multipart to `{api}/photos`. Redirects are not followed:
//! the API answers a successful form action with a redirect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{normalize_http_url, ClientConfig};
use crate::dispatch::{
    ActionAdapter, ActionKey, ActionRegistry, AdapterError, AdapterResponse, PhotoUploader,
};
use crate::error::{Error, Result};
use crate::models::UnsyncedPhoto;
use crate::util::compact_text;

/// Shared HTTP plumbing for both adapters
#[derive(Clone)]
struct ApiTransport {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl ApiTransport {
    fn new(base_url: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_http_url(base_url, "api_base_url")?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            access_token,
            client,
        })
    }

    fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.require_api_base_url()?,
            config.access_token.clone(),
            config.request_timeout(),
        )
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<AdapterResponse, AdapterError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(normalize_response(status, &body))
    }
}

impl std::fmt::Debug for ApiTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiTransport")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

/// Form-posting client for queued mutations.
#[derive(Debug, Clone)]
pub struct RemoteActionClient {
    transport: ApiTransport,
}

impl RemoteActionClient {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            transport: ApiTransport::new(base_url, access_token, timeout)?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: ApiTransport::from_config(config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    /// Endpoint for an action, e.g. `{api}/actions/job/create`.
    pub fn action_url(&self, key: ActionKey) -> String {
        format!(
            "{}/actions/{}/{}",
            self.transport.base_url,
            urlencoding::encode(key.resource.as_str()),
            urlencoding::encode(&key.kind.as_str().to_ascii_lowercase()),
        )
    }

    /// Submit a payload to the action endpoint for `key`.
    pub async fn invoke(
        &self,
        key: ActionKey,
        payload: &Value,
    ) -> std::result::Result<AdapterResponse, AdapterError> {
        let fields = form_fields(payload)?;
        let url = self.action_url(key);
        tracing::debug!("POST {url} ({} fields)", fields.len());
        self.transport
            .send(self.transport.post(&url).form(&fields))
            .await
    }

    /// Registry with an adapter for every action key.
    pub fn registry(&self) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        for key in ActionKey::all() {
            registry.register(
                key,
                Arc::new(RemoteAction {
                    client: self.clone(),
                    key,
                }),
            );
        }
        registry
    }
}

/// One registry entry bound to its action key
struct RemoteAction {
    client: RemoteActionClient,
    key: ActionKey,
}

#[async_trait]
impl ActionAdapter for RemoteAction {
    async fn invoke(&self, payload: &Value) -> std::result::Result<AdapterResponse, AdapterError> {
        self.client.invoke(self.key, payload).await
    }
}

/// Multipart uploader for offline photos.
#[derive(Debug, Clone)]
pub struct RemotePhotoUploader {
    transport: ApiTransport,
}

impl RemotePhotoUploader {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            transport: ApiTransport::new(base_url, access_token, timeout)?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: ApiTransport::from_config(config)?,
        })
    }

    pub fn upload_url(&self) -> String {
        format!("{}/photos", self.transport.base_url)
    }
}

#[async_trait]
impl PhotoUploader for RemotePhotoUploader {
    async fn upload(
        &self,
        photo: &UnsyncedPhoto,
    ) -> std::result::Result<AdapterResponse, AdapterError> {
        let file = Part::bytes(photo.content.clone())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.mime_type)?;
        let form = Form::new()
            .part("file", file)
            .text("inspectionId", photo.inspection_id.clone())
            .text("caption", photo.caption.clone())
            .text("category", photo.category.clone());

        let url = self.upload_url();
        tracing::debug!("POST {url} ({} bytes)", photo.size_bytes());
        self.transport
            .send(self.transport.post(&url).multipart(form))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ActionResponseBody {
    success: Option<bool>,
    message: Option<String>,
    error: Option<String>,
}

/// Map an HTTP status and body onto the adapter outcome.
///
/// Any 3xx is a success signal. A 2xx body carrying `success` is honoured;
/// other 2xx bodies are success. Everything else is a remote failure.
fn normalize_response(status: StatusCode, body: &str) -> AdapterResponse {
    if status.is_redirection() {
        return AdapterResponse::ok();
    }

    let parsed = serde_json::from_str::<ActionResponseBody>(body).ok();
    if status.is_success() {
        return match parsed {
            Some(ActionResponseBody {
                success: Some(success),
                message,
                error,
            }) => AdapterResponse {
                success,
                message: message.or(error),
            },
            _ => AdapterResponse::ok(),
        };
    }

    let message = parsed
        .and_then(|payload| payload.message.or(payload.error))
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| compact_text(body));
    if message.is_empty() {
        AdapterResponse::failure(format!("HTTP {}", status.as_u16()))
    } else {
        AdapterResponse::failure(format!("{message} ({})", status.as_u16()))
    }
}

/// Flatten a JSON object into form fields.
///
/// Scalars are sent as text, nested values as JSON, and nulls are skipped.
fn form_fields(payload: &Value) -> std::result::Result<Vec<(String, String)>, AdapterError> {
    let object = match payload {
        Value::Object(object) => object,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(AdapterError::Invalid(format!(
                "expected a JSON object payload, got {}",
                json_kind(other)
            )))
        }
    };

    let mut fields = Vec::with_capacity(object.len());
    for (name, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            Value::Array(_) | Value::Object(_) => serde_json::to_string(value)
                .map_err(|error| AdapterError::Invalid(error.to_string()))?,
        };
        fields.push((name.clone(), text));
    }
    Ok(fields)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MutationKind, Resource};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client() -> RemoteActionClient {
        RemoteActionClient::new(
            "https://api.example.com/",
            Some("token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn action_url_uses_lowercase_operation() {
        let client = client();
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(
            client.action_url(ActionKey::new(Resource::Equipment, MutationKind::Update)),
            "https://api.example.com/actions/equipment/update"
        );
    }

    #[test]
    fn new_rejects_urls_without_scheme() {
        assert!(RemoteActionClient::new("api.example.com", None, Duration::from_secs(5)).is_err());
        assert!(RemotePhotoUploader::from_config(&ClientConfig::default()).is_err());
    }

    #[test]
    fn registry_covers_every_key() {
        assert!(client().registry().missing_keys().is_empty());
    }

    #[test]
    fn form_fields_flatten_payload() {
        let mut fields = form_fields(&json!({
            "jobId": "job-1",
            "count": 3,
            "paid": false,
            "skip": null,
            "tags": ["attic", "duct"]
        }))
        .unwrap();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("count".to_string(), "3".to_string()),
                ("jobId".to_string(), "job-1".to_string()),
                ("paid".to_string(), "false".to_string()),
                ("tags".to_string(), r#"["attic","duct"]"#.to_string()),
            ]
        );
        assert!(form_fields(&Value::Null).unwrap().is_empty());
        assert!(matches!(
            form_fields(&json!([1, 2])),
            Err(AdapterError::Invalid(_))
        ));
    }

    #[test]
    fn redirects_count_as_success() {
        assert_eq!(
            normalize_response(StatusCode::SEE_OTHER, ""),
            AdapterResponse::ok()
        );
        assert_eq!(
            normalize_response(StatusCode::FOUND, "<html>"),
            AdapterResponse::ok()
        );
    }

    #[test]
    fn success_body_is_honoured() {
        assert_eq!(
            normalize_response(
                StatusCode::OK,
                r#"{ "success": false, "message": "Invoice already paid" }"#
            ),
            AdapterResponse::failure("Invoice already paid")
        );
        assert_eq!(normalize_response(StatusCode::OK, "created"), AdapterResponse::ok());
        assert_eq!(
            normalize_response(StatusCode::NO_CONTENT, ""),
            AdapterResponse::ok()
        );
    }

    #[test]
    fn error_status_carries_server_message() {
        assert_eq!(
            normalize_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{ "error": "title required" }"#
            ),
            AdapterResponse::failure("title required (422)")
        );
        assert_eq!(
            normalize_response(StatusCode::BAD_GATEWAY, "  "),
            AdapterResponse::failure("HTTP 502")
        );
    }
}
