//! Version derivation.
//!
//! A version is resolved once per run by the first applicable strategy:
//!
//! 1. [`CiVersioning`] when the CI environment names the ref being built
//! 2. [`GitVersioning`] walking the repository history relative to the
//!    nearest tag, in the style of `git describe`
//!
//! The raw version is used for release tag lookups; [`normalize`] strips a
//! leading `v` for archive filenames and embedding into binaries.

mod ci;
mod git;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

pub use ci::CiVersioning;
pub use git::GitVersioning;

use crate::ci::CiContext;
use crate::consts::SHORT_SHA_LEN;

/// Errors that can occur while deriving a version.
#[derive(Debug, Error)]
pub enum VersionError {
  /// CI metadata names a ref type other than `tag` or `branch`.
  #[error("unsupported ref type: {0}")]
  UnsupportedRefType(String),

  /// The repository exists but could not be opened.
  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: String,
    #[source]
    source: Box<gix::open::Error>,
  },

  /// Tag references could not be listed or peeled.
  #[error("failed to read tags: {0}")]
  Tags(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// HEAD could not be resolved to a commit.
  #[error("failed to resolve HEAD: {0}")]
  Head(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The commit history could not be traversed.
  #[error("failed to walk commit history: {0}")]
  History(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Neither CI metadata nor a repository was available.
  #[error("no versioning strategy available: no CI ref metadata and no repository at '{0}'")]
  NoStrategy(String),
}

/// A source of the run's version string.
pub trait Versioning {
  fn version(&self) -> Result<String, VersionError>;
}

/// Strip a leading `v` when it is immediately followed by a digit.
///
/// `v2.1.0` becomes `2.1.0`; `2.1.0` and `version-1` are returned unchanged.
pub fn normalize(version: &str) -> &str {
  match version.strip_prefix('v') {
    Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
    _ => version,
  }
}

/// First seven characters of a full commit hash.
///
/// Hashes are assumed to be at least seven characters long; shorter input is
/// returned whole.
pub fn shorten_sha(sha: &str) -> &str {
  sha.get(..SHORT_SHA_LEN).unwrap_or(sha)
}

/// Determine the run's version.
///
/// CI ref metadata wins when complete. Otherwise the repository at `repo_path`
/// is consulted; a missing repository is reported as
/// [`VersionError::NoStrategy`], any other repository failure is returned as is.
pub fn determine_version(ci: &CiContext, repo_path: &Path) -> Result<String, VersionError> {
  if let Some(ci_versioning) = CiVersioning::from_context(ci) {
    debug!("using CI ref metadata for versioning");
    let version = ci_versioning.version()?;
    info!(version = %version, source = "ci", "determined version");
    return Ok(version);
  }

  match GitVersioning::open(repo_path)? {
    Some(git) => {
      debug!(path = %repo_path.display(), "using repository history for versioning");
      let version = git.version()?;
      info!(version = %version, source = "git", "determined version");
      Ok(version)
    }
    None => Err(VersionError::NoStrategy(repo_path.display().to_string())),
  }
}
