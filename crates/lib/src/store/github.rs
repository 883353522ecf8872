//! GitHub contents API client (https://api.github.com by default).
//! `GET/PUT /repos/{owner}/{repo}/contents/{path}` for read and write, raw host for plain reads.

use crate::config::GitHubSettings;
use crate::store::{decode_content, encode_content, FileStore, PutResult, RemoteFileState, StoreError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const READ_TIMEOUT: Duration = Duration::from_secs(20);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

fn user_agent() -> String {
    format!("mail2git/{}", env!("CARGO_PKG_VERSION"))
}

/// Client for one repository. Cheap to clone.
#[derive(Clone)]
pub struct GitHubStore {
    api_base: String,
    raw_base: String,
    owner: String,
    repo: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: Option<String>,
    #[serde(default)]
    content: String,
    /// "base64" for inline content; "none" when the file is too large to inline.
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    #[serde(default)]
    commit: Option<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    #[serde(default)]
    sha: Option<String>,
}

/// Percent-encode each segment of a `/`-separated path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl GitHubStore {
    pub fn new(settings: &GitHubSettings) -> Self {
        Self {
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            raw_base: settings.raw_base.trim_end_matches('/').to_string(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            token: settings.token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            encode_path(path)
        )
    }

    fn raw_url(&self, path: &str, branch: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base,
            self.owner,
            self.repo,
            encode_path(branch),
            encode_path(path)
        )
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(AUTHORIZATION, format!("token {}", self.token))
            .header(USER_AGENT, user_agent())
    }
}

#[async_trait]
impl FileStore for GitHubStore {
    /// GET /repos/{owner}/{repo}/contents/{path}?ref={branch}
    async fn get_file(&self, path: &str, branch: &str) -> Result<RemoteFileState, StoreError> {
        let res = self
            .authorized(self.client.get(self.contents_url(path)))
            .header(ACCEPT, GITHUB_ACCEPT)
            .query(&[("ref", branch)])
            .timeout(READ_TIMEOUT)
            .send()
            .await?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            log::debug!("github: {}@{} not found", path, branch);
            return Ok(RemoteFileState::default());
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }
        let data: ContentsResponse = res
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("contents of {}: {}", path, e)))?;
        if let Some(encoding) = data.encoding.as_deref().filter(|e| *e != "base64") {
            return Err(StoreError::InvalidResponse(format!(
                "contents of {}@{} have encoding {:?}, not base64 (file too large to inline?)",
                path, branch, encoding
            )));
        }
        Ok(RemoteFileState {
            revision: data.sha.filter(|s| !s.is_empty()),
            text: decode_content(&data.content),
        })
    }

    /// PUT /repos/{owner}/{repo}/contents/{path} with `sha` only when updating.
    async fn put_file(
        &self,
        path: &str,
        text: &str,
        message: &str,
        branch: &str,
        revision: Option<&str>,
    ) -> Result<PutResult, StoreError> {
        let body = PutRequest {
            message,
            content: encode_content(text),
            branch,
            sha: revision,
        };
        let res = self
            .authorized(self.client.put(self.contents_url(path)))
            .header(ACCEPT, GITHUB_ACCEPT)
            .json(&body)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }
        let data: PutResponse = res
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("put {}: {}", path, e)))?;
        Ok(PutResult {
            commit: data.commit.and_then(|c| c.sha),
        })
    }

    /// GET {raw_base}/{owner}/{repo}/{branch}/{path}; any non-success status reads as empty.
    async fn read_raw(&self, path: &str, branch: &str) -> Result<String, StoreError> {
        let res = self
            .authorized(self.client.get(self.raw_url(path, branch)))
            .timeout(READ_TIMEOUT)
            .send()
            .await?;
        if !res.status().is_success() {
            log::debug!("github raw: {}@{} returned {}", path, branch, res.status());
            return Ok(String::new());
        }
        Ok(res.text().await?)
    }
}
