//! GitHub Releases publisher.

use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::json;
use tracing::{debug, info};

use super::{PublishError, Publisher, Release, asset_name};
use crate::ci::CiContext;
use crate::consts::APP_NAME;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Publishes archives as assets of a GitHub release.
#[derive(Debug, Clone)]
pub struct GitHubPublisher {
  client: reqwest::Client,
  api_url: String,
  owner: String,
  repo: String,
  token: String,
}

impl GitHubPublisher {
  /// Create a publisher for `repository` (`owner/repo`).
  pub fn new(token: impl Into<String>, repository: &str) -> Result<Self, PublishError> {
    let (owner, repo) = repository
      .split_once('/')
      .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
      .ok_or_else(|| PublishError::InvalidRepository(repository.to_string()))?;

    let client = reqwest::Client::builder()
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(PublishError::Client)?;

    Ok(Self {
      client,
      api_url: DEFAULT_API_URL.to_string(),
      owner: owner.to_string(),
      repo: repo.to_string(),
      token: token.into(),
    })
  }

  /// Create a publisher from CI metadata.
  ///
  /// Returns `Ok(None)` unless both the token and the repository are set.
  pub fn from_ci(ci: &CiContext) -> Result<Option<Self>, PublishError> {
    let (Some(token), Some(repository)) = (ci.token.as_deref(), ci.repository.as_deref()) else {
      debug!("no publishing credentials in CI environment");
      return Ok(None);
    };

    let mut publisher = Self::new(token, repository)?;
    if let Some(api_url) = &ci.api_url {
      publisher = publisher.with_api_url(api_url);
    }
    Ok(Some(publisher))
  }

  /// Use a different API base URL (GitHub Enterprise, tests).
  pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
    self.api_url = api_url.into().trim_end_matches('/').to_string();
    self
  }

  fn releases_url(&self) -> String {
    format!("{}/repos/{}/{}/releases", self.api_url, self.owner, self.repo)
  }

  /// `{releases}/tags/{tag}` with `tag` encoded as a single path segment.
  fn release_by_tag_url(&self, tag: &str) -> Result<reqwest::Url, PublishError> {
    let base = self.releases_url();
    let invalid = |reason: String| PublishError::InvalidUrl {
      url: base.clone(),
      reason,
    };

    let mut url = reqwest::Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|()| invalid("cannot be a base URL".to_string()))?
      .pop_if_empty()
      .push("tags")
      .push(tag);
    Ok(url)
  }

  /// Look up the release for `tag`, returning `None` when it does not exist.
  async fn find_release(&self, tag: &str) -> Result<Option<Release>, PublishError> {
    let endpoint = self.release_by_tag_url(tag)?;
    let url = endpoint.to_string();
    let response = self
      .client
      .get(endpoint)
      .bearer_auth(&self.token)
      .header(ACCEPT, GITHUB_JSON)
      .send()
      .await
      .map_err(|source| PublishError::Request {
        url: url.clone(),
        source,
      })?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    json_response(url, response).await.map(Some)
  }

  async fn create_release(&self, tag: &str) -> Result<Release, PublishError> {
    let url = self.releases_url();
    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.token)
      .header(ACCEPT, GITHUB_JSON)
      .json(&json!({
        "tag_name": tag,
        "name": tag,
        "generate_release_notes": true,
      }))
      .send()
      .await
      .map_err(|source| PublishError::Request {
        url: url.clone(),
        source,
      })?;

    json_response(url, response).await
  }

  async fn upload_asset(&self, release: &Release, path: &Path) -> Result<(), PublishError> {
    let name = asset_name(path);
    let content = tokio::fs::read(path).await.map_err(|source| PublishError::ReadAsset {
      path: path.to_path_buf(),
      source,
    })?;

    // upload_url is an RFC 6570 template: ".../assets{?name,label}"
    let url = release.upload_url.split('{').next().unwrap_or(&release.upload_url).to_string();
    debug!(asset = %name, url = %url, size = content.len(), "uploading asset");

    let response = self
      .client
      .post(&url)
      .query(&[("name", name.as_str())])
      .bearer_auth(&self.token)
      .header(ACCEPT, GITHUB_JSON)
      .header(CONTENT_TYPE, "application/octet-stream")
      .body(content)
      .send()
      .await
      .map_err(|source| PublishError::Request {
        url: url.clone(),
        source,
      })?;

    check_status(url, response).await?;
    info!(asset = %name, "asset uploaded");
    Ok(())
  }
}

impl Publisher for GitHubPublisher {
  async fn publish(&self, archives: &[PathBuf], tag: &str) -> Result<Release, PublishError> {
    let release = match self.find_release(tag).await? {
      Some(release) => {
        info!(tag, id = release.id, "using existing release");
        release
      }
      None => {
        let release = self.create_release(tag).await?;
        info!(tag, id = release.id, "created release");
        release
      }
    };

    for archive in archives {
      self.upload_asset(&release, archive).await?;
    }

    Ok(release)
  }
}

async fn check_status(url: String, response: reqwest::Response) -> Result<reqwest::Response, PublishError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(PublishError::Status {
    url,
    status: status.as_u16(),
    body,
  })
}

async fn json_response(url: String, response: reqwest::Response) -> Result<Release, PublishError> {
  let response = check_status(url.clone(), response).await?;
  response
    .json::<Release>()
    .await
    .map_err(|source| PublishError::Request { url, source })
}
