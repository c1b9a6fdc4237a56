//! Release publishing.
//!
//! A [`Publisher`] takes the archives of a run and attaches them to a release
//! named after the run's version tag, creating the release if needed. Uploads
//! run one after another; the first failure aborts the rest.

mod github;

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use github::{DEFAULT_API_URL, GitHubPublisher};

/// Errors that can occur while publishing a release.
#[derive(Debug, Error)]
pub enum PublishError {
  /// The repository is not of the form `owner/repo`.
  #[error("invalid repository '{0}': expected OWNER/REPO")]
  InvalidRepository(String),

  /// The API base URL cannot be extended with a release path.
  #[error("invalid API URL '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("failed to create HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("request to '{url}' failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The API answered with an unexpected status.
  #[error("request to '{url}' returned HTTP {status}: {body}")]
  Status { url: String, status: u16, body: String },

  #[error("failed to read asset '{path}': {source}")]
  ReadAsset {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A release as reported by the hosting service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
  pub id: u64,
  pub tag_name: String,
  /// Upload endpoint, possibly carrying a `{?name,label}` URI template.
  pub upload_url: String,
  #[serde(default)]
  pub html_url: String,
}

/// Attaches release archives to a tagged release.
pub trait Publisher: Send + Sync {
  fn publish(&self, archives: &[PathBuf], tag: &str) -> impl Future<Output = Result<Release, PublishError>> + Send;
}

/// Asset name for an archive: its file name.
pub(crate) fn asset_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| path.display().to_string())
}
