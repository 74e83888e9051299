//! Minimal GitHub releases client: the source of upstream tarballs and the destination
//! of republished binaries.

use std::fmt;
use std::fs::File;
use std::io;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use llvm_mirror_publish::{AssetSink, UploadError};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio_util::io::ReaderStream;

const DEFAULT_API: &str = "https://api.github.com";
const JSON: &str = "application/vnd.github+json";
const OCTET_STREAM: &str = "application/octet-stream";
const API_VERSION: &str = "2022-11-28";

/// Streamed response body of a downloaded asset.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        codes: Vec<String>,
    },
}

impl GithubError {
    /// Whether the API rejected a create because the object is already there.
    ///
    /// Decided from the structured `errors[].code` list, never from message text.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Api { status, codes, .. } => {
                *status == StatusCode::UNPROCESSABLE_ENTITY.as_u16()
                    && codes.iter().any(|c| c == "already_exists")
            }
            Self::Http(_) => false,
        }
    }
}

/// `owner/repo` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub upload_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    code: String,
}

#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Result<Self, GithubError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_base: DEFAULT_API.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: Method, url: &str, accept: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, accept)
            .header(USER_AGENT, concat!("llvm-mirror/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        request
    }

    pub async fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Result<Release, GithubError> {
        let url = format!("{}/repos/{repo}/releases/tags/{tag}", self.api_base);
        let response = self.request(Method::GET, &url, JSON).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn create_release(
        &self,
        repo: &RepoRef,
        release: &NewRelease,
    ) -> Result<Release, GithubError> {
        let url = format!("{}/repos/{repo}/releases", self.api_base);
        let response = self
            .request(Method::POST, &url, JSON)
            .json(release)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Create `release`, or reuse the existing release with the same tag.
    ///
    /// Reruns therefore append to the mirror release as upstream adds assets.
    pub async fn ensure_release(
        &self,
        repo: &RepoRef,
        release: &NewRelease,
    ) -> Result<Release, GithubError> {
        match self.create_release(repo, release).await {
            Ok(created) => {
                tracing::info!(%repo, tag = %release.tag_name, "created mirror release");
                Ok(created)
            }
            Err(e) if e.is_already_exists() => {
                tracing::info!(%repo, tag = %release.tag_name, "mirror release exists, appending");
                self.release_by_tag(repo, &release.tag_name).await
            }
            Err(e) => Err(e),
        }
    }

    /// Stream the raw bytes of a release asset.
    pub async fn download_asset(&self, repo: &RepoRef, asset_id: u64) -> Result<ByteStream, GithubError> {
        let url = format!("{}/repos/{repo}/releases/assets/{asset_id}", self.api_base);
        let response = self.request(Method::GET, &url, OCTET_STREAM).send().await?;
        let response = check(response).await?;
        Ok(response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other)).boxed())
    }

    /// Upload `size` bytes from `file` as asset `name` of the release behind `upload_url`.
    pub async fn upload_asset(
        &self,
        upload_url: &str,
        name: &str,
        size: u64,
        file: tokio::fs::File,
    ) -> Result<(), UploadError> {
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .request(Method::POST, upload_url, JSON)
            .query(&[("name", name)])
            .header(CONTENT_TYPE, OCTET_STREAM)
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(UploadError::Rejected {
                    message: e.to_string(),
                });
            }
            Err(e) => {
                return Err(UploadError::Transient {
                    message: e.to_string(),
                });
            }
        };

        match check(response).await {
            Ok(_) => Ok(()),
            Err(e) => Err(classify_upload_error(e)),
        }
    }
}

fn classify_upload_error(error: GithubError) -> UploadError {
    if error.is_already_exists() {
        return UploadError::AlreadyExists;
    }
    match &error {
        GithubError::Api { status, .. }
            if *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500 =>
        {
            UploadError::Transient {
                message: error.to_string(),
            }
        }
        GithubError::Http(_) => UploadError::Transient {
            message: error.to_string(),
        },
        GithubError::Api { .. } => UploadError::Rejected {
            message: error.to_string(),
        },
    }
}

/// Turn a non-success response into [`GithubError::Api`].
async fn check(response: Response) -> Result<Response, GithubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = if body.message.is_empty() {
        status.to_string()
    } else {
        body.message
    };
    Err(GithubError::Api {
        status: status.as_u16(),
        message,
        codes: body.errors.into_iter().map(|e| e.code).collect(),
    })
}

/// Strip the RFC 6570 suffix (`{?name,label}`) GitHub appends to `upload_url`.
pub fn upload_endpoint(upload_url: &str) -> &str {
    upload_url
        .split_once('{')
        .map_or(upload_url, |(endpoint, _)| endpoint)
}

/// [`AssetSink`] that uploads into one GitHub release.
///
/// Uploads block on `runtime`, so `upload` must be called from a blocking thread and
/// never from inside an async task.
#[derive(Clone, Debug)]
pub struct ReleaseUploader {
    client: GithubClient,
    upload_url: String,
    runtime: Handle,
}

impl ReleaseUploader {
    pub fn new(client: GithubClient, release: &Release, runtime: Handle) -> Self {
        Self {
            client,
            upload_url: upload_endpoint(&release.upload_url).to_string(),
            runtime,
        }
    }
}

impl AssetSink for ReleaseUploader {
    fn upload(&self, name: &str, size: u64, content: File) -> Result<(), UploadError> {
        let file = tokio::fs::File::from_std(content);
        self.runtime
            .block_on(self.client.upload_asset(&self.upload_url, name, size, file))
    }
}
