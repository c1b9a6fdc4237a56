//! CI-provided metadata.
//!
//! GitHub Actions exposes the ref being built and publishing credentials via
//! environment variables. Empty variables are treated as absent so that a
//! partially configured environment falls back to VCS-derived versioning.

/// Environment variable holding the short ref name (branch or tag).
pub const ENV_REF_NAME: &str = "GITHUB_REF_NAME";
/// Environment variable holding the ref type (`branch` or `tag`).
pub const ENV_REF_TYPE: &str = "GITHUB_REF_TYPE";
/// Environment variable holding the full commit SHA.
pub const ENV_SHA: &str = "GITHUB_SHA";
/// Environment variable holding the API token used for publishing.
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
/// Environment variable holding `owner/repo`.
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
/// Environment variable holding the REST API base URL.
pub const ENV_API_URL: &str = "GITHUB_API_URL";

/// Metadata loaded from the CI environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
  pub ref_name: Option<String>,
  pub ref_type: Option<String>,
  pub sha: Option<String>,
  pub token: Option<String>,
  pub repository: Option<String>,
  pub api_url: Option<String>,
}

impl CiContext {
  /// Load the context from the process environment.
  ///
  /// This never fails; the presence of values does not imply that all fields
  /// needed for versioning or publishing are available.
  pub fn from_env() -> Self {
    Self {
      ref_name: var(ENV_REF_NAME),
      ref_type: var(ENV_REF_TYPE),
      sha: var(ENV_SHA),
      token: var(ENV_TOKEN),
      repository: var(ENV_REPOSITORY),
      api_url: var(ENV_API_URL),
    }
  }

  /// The `{ref_type, ref_name, sha}` triple, if all three are present.
  pub fn ref_info(&self) -> Option<(&str, &str, &str)> {
    Some((
      self.ref_type.as_deref()?,
      self.ref_name.as_deref()?,
      self.sha.as_deref()?,
    ))
  }
}

fn var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}
