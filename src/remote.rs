use serde::Deserialize;
use tracing::debug;

use crate::{
    catalog::{Catalog, RetryPolicy},
    error::{PlinthError, PlinthResult},
    model::SubjectRecord,
};

pub const APP_KEY_VAR: &str = "PLINTH_APP_KEY";
pub const REFRESH_TOKEN_VAR: &str = "PLINTH_REFRESH_TOKEN";

const DEFAULT_AUTH_BASE: &str = "https://api.dropboxapi.com";
const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";
const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

/// Connection settings for the remote store. Credentials come from the
/// process environment; the bases are overridable so tests can point the
/// client at a local server.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub app_key: String,
    pub refresh_token: String,
    pub folder: String,
    pub auth_base: String,
    pub api_base: String,
    pub content_base: String,
}

impl RemoteConfig {
    pub fn new(app_key: String, refresh_token: String, folder: String) -> Self {
        Self {
            app_key,
            refresh_token,
            folder,
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            content_base: DEFAULT_CONTENT_BASE.to_string(),
        }
    }

    /// Read the required credentials from the environment. Absence of either
    /// variable is a fatal startup error.
    pub fn from_env(folder: String) -> PlinthResult<Self> {
        let app_key = std::env::var(APP_KEY_VAR)
            .map_err(|_| PlinthError::config(format!("{APP_KEY_VAR} is not set")))?;
        let refresh_token = std::env::var(REFRESH_TOKEN_VAR)
            .map_err(|_| PlinthError::config(format!("{REFRESH_TOKEN_VAR} is not set")))?;
        Ok(Self::new(app_key, refresh_token, folder))
    }
}

/// Blocking HTTP client for a Dropbox-style file store. Every operation
/// performs its own token-refresh handshake and runs under the constant-delay
/// retry policy; a rejected handshake is fatal and never retried.
pub struct RemoteCatalog {
    http: reqwest::blocking::Client,
    config: RemoteConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<FolderEntry>,
}

#[derive(Debug, Deserialize)]
struct FolderEntry {
    name: String,
}

impl RemoteCatalog {
    pub fn new(config: RemoteConfig, retry: RetryPolicy) -> PlinthResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("plinth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlinthError::transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            config,
            retry,
        })
    }

    /// Exchange the long-lived refresh secret for a short-lived bearer token.
    fn access_token(&self) -> PlinthResult<String> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.config.auth_base))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("client_id", self.config.app_key.as_str()),
            ])
            .send()
            .map_err(|e| PlinthError::transport(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PlinthError::auth(format!(
                "token refresh rejected ({status}): {}",
                body.trim()
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| PlinthError::auth(format!("token response malformed: {e}")))?;
        Ok(token.access_token)
    }

    fn list_entries(&self, token: &str) -> PlinthResult<Vec<FolderEntry>> {
        let response = self
            .http
            .post(format!("{}/2/files/list_folder", self.config.api_base))
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": self.config.folder }))
            .send()
            .map_err(|e| PlinthError::transport(format!("list_folder request failed: {e}")))?;

        let response = check_status(response, "list_folder")?;
        let listing: ListFolderResponse = response
            .json()
            .map_err(|e| PlinthError::transport(format!("list_folder response malformed: {e}")))?;
        debug!(
            folder = %self.config.folder,
            entries = listing.entries.len(),
            "listed catalog folder"
        );
        Ok(listing.entries)
    }

    fn download(&self, token: &str, path: &str) -> PlinthResult<Vec<u8>> {
        let arg = serde_json::json!({ "path": path }).to_string();
        let response = self
            .http
            .post(format!("{}/2/files/download", self.config.content_base))
            .bearer_auth(token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .map_err(|e| PlinthError::transport(format!("download of '{path}' failed: {e}")))?;

        let response = check_status(response, path)?;
        let bytes = response
            .bytes()
            .map_err(|e| PlinthError::transport(format!("download of '{path}' truncated: {e}")))?;
        debug!(path, len = bytes.len(), "downloaded file");
        Ok(bytes.to_vec())
    }
}

/// 401 means the freshly refreshed token was not accepted: fatal. Every
/// other non-success status is treated as transient.
fn check_status(
    response: reqwest::blocking::Response,
    what: &str,
) -> PlinthResult<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(PlinthError::auth(format!(
            "{what} rejected the access token ({status}): {}",
            body.trim()
        )));
    }
    Err(PlinthError::transport(format!(
        "{what} returned {status}: {}",
        body.trim()
    )))
}

impl Catalog for RemoteCatalog {
    fn count_records(&self) -> PlinthResult<usize> {
        self.retry.run("count records", || {
            let token = self.access_token()?;
            Ok(self.list_entries(&token)?.len())
        })
    }

    fn record_at(&self, index: usize) -> PlinthResult<SubjectRecord> {
        self.retry.run("fetch record", || {
            let token = self.access_token()?;
            let entries = self.list_entries(&token)?;
            let entry = index
                .checked_sub(1)
                .and_then(|i| entries.get(i))
                .ok_or_else(|| {
                    PlinthError::transport(format!(
                        "record index {index} out of range ({} entries)",
                        entries.len()
                    ))
                })?;
            let path = format!("{}/{}", self.config.folder, entry.name);
            let bytes = self.download(&token, &path)?;
            let record: SubjectRecord = serde_json::from_slice(&bytes).map_err(|e| {
                PlinthError::metadata(format!(
                    "subject record '{}' is not valid JSON: {e}",
                    entry.name
                ))
            })?;
            record.validate()?;
            Ok(record)
        })
    }

    fn fetch_bytes(&self, path: &str) -> PlinthResult<Vec<u8>> {
        self.retry.run("download file", || {
            let token = self.access_token()?;
            self.download(&token, path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_deserializes() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token": "sl.abc123", "token_type": "bearer", "expires_in": 14400}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "sl.abc123");
    }

    #[test]
    fn listing_response_preserves_order() {
        let listing: ListFolderResponse = serde_json::from_str(
            r#"{"entries": [
                {"name": "heron.json", ".tag": "file"},
                {"name": "otter.json", ".tag": "file"}
            ], "cursor": "x", "has_more": false}"#,
        )
        .unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["heron.json", "otter.json"]);
    }
}
