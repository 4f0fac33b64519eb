//! Hub client abstraction: resolve identifiers, fetch and publish files
//!
//! The core treats the hub as a key-value blob store keyed by repo id plus
//! filename. [`HfHub`] talks to a HuggingFace-compatible hub; [`LocalHub`]
//! serves a plain directory tree, which is what the tests run against.

use crate::cache;
use crate::error::{Error, Result};
use base64::Engine as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Interface the core consumes; identifiers are opaque strings
pub trait HubClient {
    /// Fetch `filename` from a repo into a local cache, returning the path
    fn download(&self, repo_id_or_path: &str, filename: &str) -> Result<PathBuf>;

    /// Publish every regular file in `local_dir` as one commit
    fn upload(&self, repo_id: &str, local_dir: &Path, commit_message: &str) -> Result<()>;

    fn exists_locally(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Create a remote repo; with `exist_ok` an existing repo is fine
    fn create_repo(&self, repo_id: &str, exist_ok: bool) -> Result<()>;
}

/// HuggingFace Hub client
///
/// Downloads go through the `hf-hub` crate and land in the standard hub
/// cache layout. Repo creation and uploads use the Hub HTTP API directly
/// and need a token (`HF_TOKEN` is picked up from the environment).
pub struct HfHub {
    endpoint: String,
    cache_dir: PathBuf,
    token: Option<String>,
}

impl HfHub {
    pub fn new() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            cache_dir: cache::tmp_cache_dir(),
            token: std::env::var("HF_TOKEN").ok(),
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn api(&self) -> Result<hf_hub::api::sync::Api> {
        hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_token(self.token.clone())
            .build()
            .map_err(|e| Error::HubNetwork(format!("failed to create hub API client: {e}")))
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| Error::HubAuth("no token configured (set HF_TOKEN)".to_string()))
    }

    fn classify_download_error(
        repo: &str,
        filename: &str,
        err: hf_hub::api::sync::ApiError,
    ) -> Error {
        let text = err.to_string();
        if text.contains("401") || text.contains("403") {
            Error::HubAuth(text)
        } else if text.contains("404") || text.contains("Not Found") {
            Error::NotFound(format!("`{filename}` in hub repo `{repo}`"))
        } else {
            Error::HubNetwork(text)
        }
    }

    fn check_status(
        response: reqwest::blocking::Response,
        what: &str,
    ) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(Error::HubAuth(format!("{what}: {status}: {body}"))),
            404 => Err(Error::NotFound(format!("{what}: {body}"))),
            _ => Err(Error::HubNetwork(format!("{what}: {status}: {body}"))),
        }
    }
}

impl Default for HfHub {
    fn default() -> Self {
        Self::new()
    }
}

impl HubClient for HfHub {
    fn download(&self, repo_id_or_path: &str, filename: &str) -> Result<PathBuf> {
        tracing::debug!(repo = %repo_id_or_path, file = %filename, "downloading from hub");
        let api = self.api()?;
        api.model(repo_id_or_path.to_string())
            .get(filename)
            .map_err(|e| Self::classify_download_error(repo_id_or_path, filename, e))
    }

    fn upload(&self, repo_id: &str, local_dir: &Path, commit_message: &str) -> Result<()> {
        let token = self.token()?;

        // ndjson commit payload: a header line, then one line per file
        let mut lines = vec![serde_json::to_string(&serde_json::json!({
            "key": "header",
            "value": { "summary": commit_message },
        }))?];
        let mut staged = 0usize;
        for entry in fs::read_dir(local_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let content = base64::engine::general_purpose::STANDARD.encode(fs::read(&path)?);
            lines.push(serde_json::to_string(&serde_json::json!({
                "key": "file",
                "value": { "path": name, "content": content, "encoding": "base64" },
            }))?);
            staged += 1;
        }

        let url = format!("{}/api/models/{}/commit/main", self.endpoint, repo_id);
        let response = reqwest::blocking::Client::new()
            .post(&url)
            .bearer_auth(token)
            .header("content-type", "application/x-ndjson")
            .body(lines.join("\n"))
            .send()
            .map_err(|e| Error::HubNetwork(format!("commit to `{repo_id}`: {e}")))?;
        Self::check_status(response, &format!("commit to `{repo_id}`"))?;

        tracing::info!(repo = %repo_id, files = staged, "uploaded files in one commit");
        Ok(())
    }

    fn create_repo(&self, repo_id: &str, exist_ok: bool) -> Result<()> {
        let token = self.token()?;
        let url = format!("{}/api/repos/create", self.endpoint);
        let response = reqwest::blocking::Client::new()
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "type": "model", "name": repo_id }))
            .send()
            .map_err(|e| Error::HubNetwork(format!("create repo `{repo_id}`: {e}")))?;

        if exist_ok && response.status().as_u16() == 409 {
            return Ok(());
        }
        Self::check_status(response, &format!("create repo `{repo_id}`"))?;
        tracing::info!(repo = %repo_id, "created hub repo");
        Ok(())
    }
}

/// Directory-backed hub: the "remote" store is `root/{repo_id}/{filename}`
pub struct LocalHub {
    root: PathBuf,
}

impl LocalHub {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl HubClient for LocalHub {
    fn download(&self, repo_id_or_path: &str, filename: &str) -> Result<PathBuf> {
        let path = self.root.join(repo_id_or_path).join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(format!(
                "`{filename}` in repo `{repo_id_or_path}`"
            )))
        }
    }

    fn upload(&self, repo_id: &str, local_dir: &Path, _commit_message: &str) -> Result<()> {
        let dest = self.root.join(repo_id);
        fs::create_dir_all(&dest)?;
        for entry in fs::read_dir(local_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                fs::copy(entry.path(), dest.join(entry.file_name()))?;
            }
        }
        Ok(())
    }

    fn create_repo(&self, repo_id: &str, exist_ok: bool) -> Result<()> {
        let dir = self.root.join(repo_id);
        if dir.exists() && !exist_ok {
            return Err(Error::HubNetwork(format!(
                "repo `{repo_id}` already exists"
            )));
        }
        fs::create_dir_all(dir)?;
        Ok(())
    }
}
