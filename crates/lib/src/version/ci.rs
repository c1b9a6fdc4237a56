use super::{Versioning, VersionError, shorten_sha};
use crate::ci::CiContext;

/// Versioning from the ref metadata supplied by CI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiVersioning {
  ref_type: String,
  ref_name: String,
  sha: String,
}

impl CiVersioning {
  /// Returns `None` unless ref type, ref name and SHA are all present.
  pub fn from_context(ctx: &CiContext) -> Option<Self> {
    let (ref_type, ref_name, sha) = ctx.ref_info()?;
    Some(Self {
      ref_type: ref_type.to_string(),
      ref_name: ref_name.to_string(),
      sha: sha.to_string(),
    })
  }
}

impl Versioning for CiVersioning {
  fn version(&self) -> Result<String, VersionError> {
    match self.ref_type.as_str() {
      "tag" => Ok(self.ref_name.clone()),
      "branch" => Ok(format!("{}-{}", self.ref_name, shorten_sha(&self.sha))),
      other => Err(VersionError::UnsupportedRefType(other.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn context(ref_type: &str, ref_name: &str) -> CiContext {
    CiContext {
      ref_type: Some(ref_type.to_string()),
      ref_name: Some(ref_name.to_string()),
      sha: Some("4b95fac1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn tag_ref_is_used_verbatim() {
    let v = CiVersioning::from_context(&context("tag", "v1.4.0")).unwrap();
    assert_eq!(v.version().unwrap(), "v1.4.0");
  }

  #[test]
  fn branch_ref_appends_short_sha() {
    let v = CiVersioning::from_context(&context("branch", "main")).unwrap();
    assert_eq!(v.version().unwrap(), "main-4b95fac");
  }

  #[test]
  fn other_ref_types_are_unsupported() {
    let v = CiVersioning::from_context(&context("pull_request", "42/merge")).unwrap();
    let err = v.version().unwrap_err();
    assert_eq!(err.to_string(), "unsupported ref type: pull_request");
  }

  #[test]
  fn incomplete_context_is_not_a_strategy() {
    let ctx = CiContext {
      ref_type: Some("tag".to_string()),
      ref_name: Some("v1".to_string()),
      ..Default::default()
    };
    assert!(CiVersioning::from_context(&ctx).is_none());
  }
}
