//! CKAN action API client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use migrator::ckan::{CatalogApi, CkanClient};
//! use migrator::models::EntityKind;
//!
//! let client = CkanClient::new("https://data.example.org", "api-key");
//! let orgs = client.list_entities(EntityKind::Organization).await?;
//! ```
//!
//! Every action is `POST {base}/api/3/action/{action}` and answers with the
//! envelope `{"success": bool, "result": ..., "error": {...}}`.

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::error::{CkanError, CkanResult};
use crate::models::{
    CatalogEntity, CreatedPackage, CreatedResource, EntityKind, License, PackagePayload,
    ResourceUpload,
};

#[cfg(test)]
pub(crate) mod fake;

/// Page size for `organization_list` / `group_list`.
const LIST_PAGE_SIZE: usize = 100;

/// Operations the migration needs from the target catalog.
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    /// Every organization or group, with id, name and title.
    async fn list_entities(&self, kind: EntityKind) -> CkanResult<Vec<CatalogEntity>>;

    /// Create an organization or group.
    async fn create_entity(
        &self,
        kind: EntityKind,
        name: &str,
        title: &str,
    ) -> CkanResult<CatalogEntity>;

    async fn list_licenses(&self) -> CkanResult<Vec<License>>;

    /// Create a dataset without resources.
    async fn create_package(&self, package: &PackagePayload) -> CkanResult<CreatedPackage>;

    /// Create a resource in `package_id`, streaming its file as the upload.
    async fn create_resource(
        &self,
        package_id: &str,
        resource: &ResourceUpload,
    ) -> CkanResult<CreatedResource>;
}

/// Action API response envelope
#[derive(Debug, Deserialize)]
struct ActionResponse {
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

/// HTTP client for one CKAN instance
#[derive(Clone)]
pub struct CkanClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl CkanClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{}", self.base_url, action)
    }

    /// Call an action with a JSON body
    async fn call<T: DeserializeOwned>(&self, action: &str, body: &Value) -> CkanResult<T> {
        let response = self
            .http
            .post(self.action_url(action))
            .header("Authorization", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CkanError::HttpError(e.to_string()))?;

        read_envelope(action, response).await
    }

    async fn list_page(
        &self,
        kind: EntityKind,
        offset: usize,
    ) -> CkanResult<Vec<CatalogEntity>> {
        let action = format!("{}_list", kind.as_str());
        let body = json!({
            "all_fields": true,
            "limit": LIST_PAGE_SIZE,
            "offset": offset,
        });
        self.call(&action, &body).await
    }
}

impl CatalogApi for CkanClient {
    async fn list_entities(&self, kind: EntityKind) -> CkanResult<Vec<CatalogEntity>> {
        let mut entities: Vec<CatalogEntity> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let page = self.list_page(kind, entities.len()).await?;
            let fresh: Vec<CatalogEntity> = page
                .into_iter()
                .filter(|e| seen.insert(e.id.clone()))
                .collect();
            // an empty page ends the listing; so does a server that ignores offset
            if fresh.is_empty() {
                break;
            }
            entities.extend(fresh);
        }
        Ok(entities)
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        name: &str,
        title: &str,
    ) -> CkanResult<CatalogEntity> {
        let action = format!("{}_create", kind.as_str());
        self.call(&action, &json!({ "name": name, "title": title })).await
    }

    async fn list_licenses(&self) -> CkanResult<Vec<License>> {
        self.call("license_list", &json!({})).await
    }

    async fn create_package(&self, package: &PackagePayload) -> CkanResult<CreatedPackage> {
        let body = serde_json::to_value(package).map_err(|e| CkanError::InvalidResponse {
            action: "package_create".into(),
            message: e.to_string(),
        })?;
        self.call("package_create", &body).await
    }

    async fn create_resource(
        &self,
        package_id: &str,
        resource: &ResourceUpload,
    ) -> CkanResult<CreatedResource> {
        let upload_err = |source| CkanError::Upload {
            path: resource.upload_path.clone(),
            source,
        };

        let file = tokio::fs::File::open(&resource.upload_path)
            .await
            .map_err(upload_err)?;
        let length = file.metadata().await.map_err(upload_err)?.len();
        let file_name = resource
            .upload_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| resource.name.clone());

        let part = Part::stream_with_length(file, length).file_name(file_name);

        let mut form = Form::new()
            .text("package_id", package_id.to_string())
            .text("name", resource.name.clone())
            .text("created", resource.created.clone())
            .text("last_modified", resource.last_modified.clone())
            .text("format", resource.format.clone());
        if let Some(ref description) = resource.description {
            form = form.text("description", description.clone());
        }
        let form = form.part("upload", part);

        let response = self
            .http
            .post(self.action_url("resource_create"))
            .header("Authorization", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CkanError::HttpError(e.to_string()))?;

        read_envelope("resource_create", response).await
    }
}

/// Unwrap the action envelope, mapping failures to [`CkanError`].
async fn read_envelope<T: DeserializeOwned>(
    action: &str,
    response: reqwest::Response,
) -> CkanResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CkanError::HttpError(e.to_string()))?;

    let envelope: ActionResponse = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            if !status.is_success() {
                return Err(CkanError::ActionFailed {
                    action: action.to_string(),
                    message: format!("HTTP {}: {}", status, truncate(&body, 300)),
                });
            }
            return Err(CkanError::InvalidResponse {
                action: action.to_string(),
                message: e.to_string(),
            });
        }
    };

    if !envelope.success || !status.is_success() {
        return Err(CkanError::ActionFailed {
            action: action.to_string(),
            message: envelope
                .error
                .as_ref()
                .map(error_message)
                .unwrap_or_else(|| format!("HTTP {}", status)),
        });
    }

    serde_json::from_value(envelope.result).map_err(|e| CkanError::InvalidResponse {
        action: action.to_string(),
        message: e.to_string(),
    })
}

/// Flatten CKAN's error object into one line.
///
/// Validation errors come as `{"__type": "Validation Error", "name": ["..."]}`.
fn error_message(error: &Value) -> String {
    let Some(obj) = error.as_object() else {
        return error.to_string();
    };

    let kind = obj.get("__type").and_then(Value::as_str).unwrap_or("Error");
    if let Some(message) = obj.get("message").and_then(Value::as_str) {
        return format!("{}: {}", kind, message);
    }

    let mut details: Vec<String> = obj
        .iter()
        .filter(|(k, _)| k.as_str() != "__type")
        .map(|(k, v)| match v {
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|i| i.as_str().map(String::from).unwrap_or_else(|| i.to_string()))
                    .collect();
                format!("{}: {}", k, parts.join(", "))
            }
            other => format!("{}: {}", k, other),
        })
        .collect();
    details.sort();

    if details.is_empty() {
        kind.to_string()
    } else {
        format!("{}: {}", kind, details.join("; "))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_url_trims_slash() {
        let client = CkanClient::new("https://data.example.org/", "key");
        assert_eq!(
            client.action_url("package_create"),
            "https://data.example.org/api/3/action/package_create"
        );
    }

    #[test]
    fn test_error_message_with_message() {
        let error = json!({ "__type": "Authorization Error", "message": "Access denied" });
        assert_eq!(error_message(&error), "Authorization Error: Access denied");
    }

    #[test]
    fn test_error_message_validation() {
        let error = json!({
            "__type": "Validation Error",
            "name": ["Group name already exists in database"]
        });
        assert_eq!(
            error_message(&error),
            "Validation Error: name: Group name already exists in database"
        );
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
